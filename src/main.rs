use std::fs::File;
use std::io;
use std::path::PathBuf;

use anyhow::Context;
use structopt::StructOpt;

use irgate_shared::link::{DEFAULT_BAUD_RATE, DEFAULT_DEVICE};
use irgate_shared::{encode, Decoder, LinkSettings, SerialLink};

mod capture;
mod irsend;
mod playback;
mod vcdutils;

use crate::capture::CaptureOptions;

#[derive(Debug, StructOpt)]
#[structopt(name = "irgate", about = "irgate infrared gateway tool")]
struct Opt {
    /// Serial Device. Defaults to /dev/ttyAMA0
    #[structopt(long = "device", parse(from_os_str))]
    serial: Option<PathBuf>,
    /// Line rate
    #[structopt(long, default_value = "100000")]
    baud: u32,
    #[structopt(short, long)]
    debug: bool,
    #[structopt(subcommand)]
    cmd: CliCommand,
}

#[derive(StructOpt, Debug)]
enum CliCommand {
    /// List serial ports
    List,
    /// Print received pulses and spaces. Optionaly record them to a vcd file
    Receive {
        /// Deadline per event in microseconds, 0 waits forever
        #[structopt(long, default_value = "200000")]
        timeout_us: u32,
        /// Print lirc mode2 words
        #[structopt(long)]
        raw: bool,
        /// Stop after this many events
        #[structopt(long)]
        count: Option<usize>,
        #[structopt(long, parse(from_os_str))]
        vcd: Option<PathBuf>,
    },
    /// Transmit a code given as pulse/space durations in microseconds
    Send {
        /// Replay the ir wire of a vcd file
        #[structopt(long, parse(from_os_str), conflicts_with = "mode2")]
        vcd: Option<PathBuf>,
        /// Replay a mode2 text capture
        #[structopt(long, parse(from_os_str))]
        mode2: Option<PathBuf>,
        durations: Vec<u32>,
    },
    /// Show the wire bytes for a code
    Encode { durations: Vec<u32> },
    /// Decode wire bytes given in hex
    Decode { bytes: Vec<String> },
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::from_args();

    let loglevel = if opt.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(loglevel)).init();

    let device = opt.serial.unwrap_or_else(|| PathBuf::from(DEFAULT_DEVICE));
    let settings = LinkSettings {
        baud_rate: opt.baud,
    };

    if settings.baud_rate != DEFAULT_BAUD_RATE {
        log::warn!("The gateway expects {} baud", DEFAULT_BAUD_RATE);
    }

    let open_link = || {
        SerialLink::open(&device, &settings)
            .with_context(|| format!("Failed to open {}", device.display()))
    };

    match opt.cmd {
        CliCommand::List => {
            for port in SerialLink::list_ports()? {
                println!("{}", port.port_name);
            }
            Ok(())
        }
        CliCommand::Receive {
            timeout_us,
            raw,
            count,
            vcd,
        } => {
            let capture_file = vcd
                .map(|path| {
                    File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))
                })
                .transpose()?;

            let mut decoder = Decoder::new(open_link()?);
            let opts = CaptureOptions {
                timeout_us,
                raw,
                count,
            };
            capture::command_capture(&mut decoder, &opts, capture_file, &mut io::stdout().lock())
        }
        CliCommand::Send {
            vcd,
            mode2,
            durations,
        } => {
            let durations = match (vcd, mode2) {
                (Some(path), _) => vcdutils::vcdfile_to_durations(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, Some(path)) => playback::mode2file_to_durations(&path)?,
                (None, None) => durations,
            };
            irsend::transmit(open_link()?, &durations)
        }
        CliCommand::Encode { durations } => {
            println!("{}", playback::format_bytes(&encode(&durations)));
            Ok(())
        }
        CliCommand::Decode { bytes } => {
            let bytes = playback::parse_hex_bytes(&bytes[..])?;
            let (events, pending) = playback::decode_bytes(&bytes)?;
            for event in events {
                println!("{}", event);
            }
            if let Some((polarity, duration)) = pending {
                println!("pending {:?} {}", polarity, duration);
            }
            Ok(())
        }
    }
}
