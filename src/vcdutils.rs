use std::fs::File;
use std::io::{self, BufReader, ErrorKind::InvalidInput};
use std::path::Path;

use irgate_shared::Event;
use vcd::{self, SimulationCommand, TimescaleUnit, Value};

/// Gap inserted in the recording for each timeout
pub const TIMEOUT_GAP_US: u64 = 2_000;

/// Records decoded events as a single `ir` wire, high while pulsing
pub struct VcdWriter<W: io::Write> {
    vcd: vcd::Writer<W>,
    timestamp: u64,
    high: bool,
    wire_id: vcd::IdCode,
}

impl<W: io::Write> VcdWriter<W> {
    /// Create a new vcd writer
    pub fn new(w: W) -> Self {
        let vcd = vcd::Writer::new(w);

        Self {
            vcd,
            timestamp: 0,
            high: false,
            wire_id: vcd::IdCode::FIRST,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        let writer = &mut self.vcd;

        // Write the header, durations are in microseconds
        writer.timescale(1, TimescaleUnit::US)?;
        writer.add_module("top")?;

        // Add the wire
        let id = writer.add_wire(1, "ir")?;
        self.wire_id = id;

        writer.upscope()?;
        writer.enddefinitions()?;

        // Write the initial values
        writer.begin(SimulationCommand::Dumpvars)?;
        writer.change_scalar(id, Value::V0)?;
        writer.end()?;

        Ok(())
    }

    pub fn write_event(&mut self, event: Event) -> io::Result<()> {
        let (high, duration) = match event {
            Event::Pulse(d) => (true, u64::from(d)),
            Event::Space(d) => (false, u64::from(d)),
            Event::Timeout => (false, TIMEOUT_GAP_US),
        };

        if event != Event::Timeout || self.high {
            self.write_value(self.timestamp, high)?;
        }
        self.add_offset(duration);

        Ok(())
    }

    fn write_value(&mut self, ts: u64, high: bool) -> io::Result<()> {
        self.vcd.timestamp(ts)?;
        let value = if high { Value::V1 } else { Value::V0 };
        self.vcd.change_scalar(self.wire_id, value)?;
        self.high = high;

        Ok(())
    }

    pub fn add_offset(&mut self, offset: u64) {
        self.timestamp += offset;
    }

    /// Close the last run so its length shows up in the file
    pub fn finish(&mut self) -> io::Result<()> {
        self.write_value(self.timestamp, false)
    }
}

/// Read the `top.ir` wire of a vcd file back as pulse/space durations in microseconds
pub fn vcdfile_to_durations(path: &Path) -> io::Result<Vec<u32>> {
    let file = File::open(path)?;
    let mut parser = vcd::Parser::new(BufReader::new(file));

    // Parse the header and find the wire
    let header = parser.parse_header()?;
    let data = header
        .find_var(&["top", "ir"])
        .ok_or_else(|| io::Error::new(InvalidInput, "no wire top.ir"))?
        .code;

    let (scale, unit) = header.timescale.unwrap_or((1, TimescaleUnit::US));
    let ns_per_tick = match unit {
        TimescaleUnit::S => 1_000_000_000,
        TimescaleUnit::MS => 1_000_000,
        TimescaleUnit::US => 1_000,
        TimescaleUnit::NS => 1,
        _ => return Err(io::Error::new(InvalidInput, "unsupported timescale")),
    } * u64::from(scale);

    // Iterate through the remainder of the file and collect the edges
    let mut current_ts = 0;
    let mut changes: Vec<(u64, bool)> = Vec::new();

    for command_result in parser {
        use vcd::Command::*;
        let command = command_result?;
        match command {
            ChangeScalar(i, v) if i == data => changes.push((current_ts, v == Value::V1)),
            Timestamp(ts) => current_ts = ts,
            _ => (),
        }
    }

    changes_to_durations(&changes, ns_per_tick)
}

/// Durations between level changes, starting at the first rising edge.
/// The final low level has no end and is dropped.
fn changes_to_durations(changes: &[(u64, bool)], ns_per_tick: u64) -> io::Result<Vec<u32>> {
    let mut edges = changes.iter().skip_while(|(_, high)| !high);
    let mut res = Vec::new();

    let (mut last_ts, mut level) = match edges.next() {
        Some(&edge) => edge,
        None => return Ok(res),
    };

    for &(ts, high) in edges {
        if high == level {
            continue;
        }

        let ns = ts
            .checked_sub(last_ts)
            .ok_or_else(|| io::Error::new(InvalidInput, format!("timestamp {} goes backwards", ts)))?
            .checked_mul(ns_per_tick)
            .ok_or_else(|| io::Error::new(InvalidInput, format!("duration at {} too long", ts)))?;
        res.push(u32::try_from(ns / 1_000).unwrap_or(u32::MAX));
        last_ts = ts;
        level = high;
    }

    // Keep codes ending with a pulse
    if res.len() % 2 == 0 {
        res.pop();
    }

    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn edges_to_durations() {
        let changes = [
            (0, false),
            (100, true),
            (700, false),
            (1_900, true),
            (2_500, false),
        ];
        assert_eq!(changes_to_durations(&changes, 1_000).unwrap(), vec![600, 1_200, 600]);
    }

    #[test]
    fn repeated_levels_and_scaling() {
        let changes = [(10, true), (15, true), (16, false), (20, false), (25, true), (26, false)];
        // 25us per tick
        assert_eq!(changes_to_durations(&changes, 25_000).unwrap(), vec![150, 225, 25]);
    }

    #[test]
    fn trailing_pulse_without_end_is_dropped() {
        let changes = [(0, true), (10, false), (20, true)];
        assert_eq!(changes_to_durations(&changes, 1_000).unwrap(), vec![10]);
        assert!(changes_to_durations(&[(0, false)], 1_000).unwrap().is_empty());
    }

    #[test]
    fn backwards_timestamps_are_rejected() {
        let changes = [(100, true), (50, false), (200, true)];
        let err = changes_to_durations(&changes, 1_000).unwrap_err();
        assert_eq!(err.kind(), InvalidInput);
    }

    #[test]
    fn oversized_durations_are_rejected() {
        let changes = [(0, true), (u64::MAX / 2, false)];
        let err = changes_to_durations(&changes, 1_000_000_000).unwrap_err();
        assert_eq!(err.kind(), InvalidInput);
    }

    #[test]
    fn recorded_events_read_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        {
            let mut vcd = VcdWriter::new(file.as_file_mut());
            vcd.init().unwrap();
            for ev in [
                Event::Pulse(9_000),
                Event::Space(4_500),
                Event::Timeout,
                Event::Pulse(560),
                Event::Space(40_000),
            ] {
                vcd.write_event(ev).unwrap();
            }
            vcd.finish().unwrap();
        }
        file.as_file_mut().flush().unwrap();

        // The timeout shows up as a longer space
        assert_eq!(vcdfile_to_durations(file.path()).unwrap(), vec![9_000, 6_500, 560]);
    }

    #[test]
    fn timeout_ends_an_open_pulse() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        {
            let mut vcd = VcdWriter::new(file.as_file_mut());
            vcd.init().unwrap();
            for ev in [Event::Pulse(600), Event::Timeout, Event::Pulse(300)] {
                vcd.write_event(ev).unwrap();
            }
            vcd.finish().unwrap();
        }
        file.as_file_mut().flush().unwrap();

        assert_eq!(vcdfile_to_durations(file.path()).unwrap(), vec![600, 2_000, 300]);
    }

    #[test]
    fn missing_wire() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.vcd");
        let mut file = File::create(&path).unwrap();
        write!(
            file,
            "$timescale 1 us $end\n$scope module top $end\n$var wire 1 ! data $end\n$upscope $end\n$enddefinitions $end\n"
        )
        .unwrap();

        let err = vcdfile_to_durations(&path).unwrap_err();
        assert_eq!(err.kind(), InvalidInput);
    }
}
