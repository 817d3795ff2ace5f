use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context};
use irgate_shared::{Decoder, Event, LoopbackChannel, Polarity};

/// Parse wire bytes given as hex, either one per argument ("0x4c") or
/// several per argument ("4c99fe")
pub fn parse_hex_bytes<S: AsRef<str>>(args: &[S]) -> anyhow::Result<Vec<u8>> {
    let mut bytes = Vec::new();

    for arg in args {
        let arg = arg.as_ref();
        let digits = arg
            .strip_prefix("0x")
            .or_else(|| arg.strip_prefix("0X"))
            .unwrap_or(arg);

        if digits.is_empty() || !digits.is_ascii() {
            return Err(anyhow!("Not a hex byte: {:?}", arg));
        }

        let digits = if digits.len() % 2 == 1 {
            format!("0{}", digits)
        } else {
            digits.to_string()
        };

        for i in (0..digits.len()).step_by(2) {
            let byte = u8::from_str_radix(&digits[i..i + 2], 16)
                .with_context(|| format!("Not a hex byte: {:?}", arg))?;
            bytes.push(byte);
        }
    }

    Ok(bytes)
}

pub fn format_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Play wire bytes through the decoder. Returns the closed runs and the run
/// still open at the end of the input.
pub fn decode_bytes(bytes: &[u8]) -> anyhow::Result<(Vec<Event>, Option<(Polarity, u32)>)> {
    let mut decoder = Decoder::new(LoopbackChannel::with_input(bytes));
    let mut events = Vec::new();

    for event in decoder.events(1_000) {
        match event? {
            // Input exhausted
            Event::Timeout => break,
            event => events.push(event),
        }
    }

    Ok((events, decoder.accumulator().pending()))
}

/// Read a code from a text file in `mode2` format
pub fn mode2file_to_durations(path: &Path) -> anyhow::Result<Vec<u32>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut events = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let event = Event::try_from(line)
            .map_err(|_| anyhow!("{}:{}: not a mode2 line: {:?}", path.display(), n + 1, line))?;
        events.push(event);
    }

    Ok(events_to_durations(&events))
}

/// Turn received events into a transmittable code: leading spaces and
/// timeouts are dropped, adjacent runs of one polarity merged, and a
/// trailing space removed.
pub fn events_to_durations(events: &[Event]) -> Vec<u32> {
    let mut durations: Vec<u32> = Vec::new();

    for event in events {
        let (polarity, duration) = match (event.polarity(), event.duration()) {
            (Some(p), Some(d)) => (p, d),
            _ => continue,
        };

        if durations.is_empty() && polarity == Polarity::Space {
            continue;
        }

        if Polarity::from_index(durations.len()) == polarity {
            durations.push(duration);
        } else if let Some(last) = durations.last_mut() {
            *last = last.saturating_add(duration);
        }
    }

    if durations.len() % 2 == 0 {
        durations.pop();
    }

    durations
}
