use std::io;
use std::iter;

use crate::channel::{is_transient, Channel, Interest};
use crate::protocol::{Polarity, WireByte, MAX_BATCH, MAX_QUANTUM, MODE2_VALUE_MASK, RESOLUTION_US};
use crate::{Error, Result};

/// Convert a duration to transmit ticks, rounding to nearest.
///
/// Only the 24 bit lirc value field is used, flag bits above it are ignored.
pub fn ticks(duration: u32) -> u32 {
    ((duration & MODE2_VALUE_MASK) + RESOLUTION_US / 2) / RESOLUTION_US
}

/// Append the wire bytes for one run of `ticks` at `polarity`
pub fn encode_run(polarity: Polarity, ticks: u32, out: &mut Vec<u8>) {
    let full = ticks / MAX_QUANTUM;
    let remainder = ticks % MAX_QUANTUM;

    out.extend(iter::repeat(polarity.full_byte()).take(full as usize));

    if remainder > 0 {
        out.push(WireByte::new(polarity, remainder as u8).0);
    }
}

/// Wire bytes for a whole code. Durations alternate pulse, space, pulse..
pub fn encode(durations: &[u32]) -> Vec<u8> {
    let mut out = Vec::new();
    for (i, duration) in durations.iter().enumerate() {
        encode_run(Polarity::from_index(i), ticks(*duration), &mut out);
    }
    out
}

/// Writes codes to a channel
pub struct Encoder<C> {
    channel: C,
}

impl<C: Channel> Encoder<C> {
    pub fn new(channel: C) -> Self {
        Encoder { channel }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn into_inner(self) -> C {
        self.channel
    }

    /// Transmit one code. Returns once every byte is written.
    ///
    /// On error the bytes written so far have already gone out on the line.
    pub fn send(&mut self, durations: &[u32]) -> Result<()> {
        for (i, duration) in durations.iter().enumerate() {
            self.send_run(Polarity::from_index(i), ticks(*duration))?;
        }
        Ok(())
    }

    fn send_run(&mut self, polarity: Polarity, ticks: u32) -> Result<()> {
        let batch_buf = [polarity.full_byte(); MAX_BATCH];
        let mut full = (ticks / MAX_QUANTUM) as usize;

        while full > 0 {
            let batch = full.min(MAX_BATCH);
            log::debug!("send {} times {:#04x}", batch, batch_buf[0]);
            write_all_blocking(&mut self.channel, &batch_buf[..batch])?;
            full -= batch;
        }

        let remainder = ticks % MAX_QUANTUM;
        if remainder > 0 {
            let code = WireByte::new(polarity, remainder as u8).0;
            log::debug!("send {:#04x}", code);
            write_all_blocking(&mut self.channel, &[code])?;
        }

        Ok(())
    }
}

/// Write all of `buf`, waiting for the channel to drain when it pushes back
fn write_all_blocking<C: Channel>(channel: &mut C, buf: &[u8]) -> Result<()> {
    let mut offset = 0;

    while offset < buf.len() {
        match channel.write(&buf[offset..]) {
            Ok(written) => offset += written,
            Err(ref err) if is_transient(err) => (),
            Err(err) => return Err(Error::ChannelWrite(err)),
        }

        if offset >= buf.len() {
            break;
        }

        loop {
            match channel.wait_ready(Interest::Write, None) {
                Ok(_) => break,
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(Error::ChannelWrite(err)),
            }
        }
    }

    Ok(())
}
