use std::fs::File;
use std::io::Write;

use anyhow::Context;
use irgate_shared::{Channel, Decoder};

use crate::vcdutils::VcdWriter;

pub struct CaptureOptions {
    /// Deadline for each event, 0 waits forever
    pub timeout_us: u32,
    /// Print packed mode2 words instead of text
    pub raw: bool,
    /// Stop after this many events
    pub count: Option<usize>,
}

pub fn command_capture<C: Channel, W: Write>(
    decoder: &mut Decoder<C>,
    opts: &CaptureOptions,
    mut capture_file: Option<File>,
    out: &mut W,
) -> anyhow::Result<()> {
    log::info!("Capturing");

    let mut vcd = capture_file.as_mut().map(VcdWriter::new);

    if let Some(vcd) = vcd.as_mut() {
        vcd.init()?;
    }

    let mut received = 0;
    while opts.count.map_or(true, |count| received < count) {
        let event = decoder
            .decode_next(opts.timeout_us)
            .context("Receive stopped")?;

        log::debug!("Got event: {:?}", event);

        if opts.raw {
            writeln!(out, "{:08x}", event.to_mode2())?;
        } else {
            writeln!(out, "{}", event)?;
        }

        // Write vcd data
        if let Some(vcd) = vcd.as_mut() {
            vcd.write_event(event)?;
        }

        received += 1;
    }

    if let Some(vcd) = vcd.as_mut() {
        vcd.finish()?;
    }

    Ok(())
}
