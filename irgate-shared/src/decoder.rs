use std::io;
use std::time::Duration;

use crate::channel::{is_transient, Channel, Interest, Readiness};
use crate::protocol::{
    Event, Polarity, WireByte, QUIRK_SPACE_OVERRIDE_US, QUIRK_SPACE_THRESHOLD_US,
};
use crate::{Error, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum State {
    /// No byte seen since startup
    Empty,
    /// A run is open. It is closed by the first byte of the other polarity.
    Accumulating { polarity: Polarity, duration_us: u32 },
}

/// Run length accumulator.
///
/// A run can only be known to have ended once a byte of the other polarity
/// arrives, so every event is emitted one run late. The state survives
/// across codes, it is never reset.
#[derive(Debug, Clone)]
pub struct Accumulator {
    state: State,
}

impl Default for Accumulator {
    fn default() -> Self {
        Accumulator {
            state: State::Empty,
        }
    }
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// The run currently being accumulated, if any
    pub fn pending(&self) -> Option<(Polarity, u32)> {
        match self.state {
            State::Empty => None,
            State::Accumulating {
                polarity,
                duration_us,
            } => Some((polarity, duration_us)),
        }
    }

    /// Feed one wire byte. Returns the run it closed, if it closed one.
    pub fn on_byte(&mut self, byte: WireByte) -> Option<Event> {
        let polarity = byte.polarity();
        let duration = byte.duration_us();

        match &mut self.state {
            State::Accumulating {
                polarity: current,
                duration_us,
            } if *current == polarity => {
                *duration_us = duration_us.saturating_add(duration);
                None
            }
            state => {
                let closed = std::mem::replace(
                    state,
                    State::Accumulating {
                        polarity,
                        duration_us: duration,
                    },
                );

                match closed {
                    State::Empty => None,
                    State::Accumulating {
                        polarity: closed,
                        duration_us,
                    } => {
                        let duration_us =
                            end_of_code_override(closed, duration_us, byte).unwrap_or(duration_us);
                        // Zero length events can't be represented downstream
                        Some(Event::new(closed, duration_us.max(1)))
                    }
                }
            }
        }
    }

    /// No byte arrived in time. The open run stays open.
    pub fn on_timeout(&self) -> Event {
        Event::Timeout
    }
}

/// Hardware quirk: the gateway ends a code with a long space followed by a
/// zero length pulse byte instead of reporting the real inter-code gap.
/// Such a space is reported as exactly 100 ms.
///
/// Returns the duration to report for the closed run, when the rule applies.
pub fn end_of_code_override(closed: Polarity, closed_duration_us: u32, next: WireByte) -> Option<u32> {
    let applies = closed == Polarity::Space
        && next.duration_us() == 0
        && closed_duration_us > QUIRK_SPACE_THRESHOLD_US;

    if applies {
        Some(QUIRK_SPACE_OVERRIDE_US)
    } else {
        None
    }
}

/// Wait granularity is milliseconds, a zero deadline waits forever
fn wait_timeout(deadline_us: u32) -> Option<Duration> {
    match deadline_us {
        0 => None,
        us => Some(Duration::from_millis(u64::from(us / 1000))),
    }
}

/// Pulls wire bytes from a channel and turns them into events
pub struct Decoder<C> {
    channel: C,
    accumulator: Accumulator,
}

impl<C: Channel> Decoder<C> {
    pub fn new(channel: C) -> Self {
        Decoder {
            channel,
            accumulator: Accumulator::new(),
        }
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

    pub fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    /// Block until one event is complete or `deadline_us` passes without input.
    ///
    /// Any number of bytes may be consumed before an event is ready. A deadline
    /// of 0 waits forever. On timeout the open run is kept, the next call
    /// continues it.
    pub fn decode_next(&mut self, deadline_us: u32) -> Result<Event> {
        let timeout = wait_timeout(deadline_us);

        loop {
            match self.channel.try_read_byte() {
                Ok(Some(byte)) => {
                    if let Some(event) = self.accumulator.on_byte(WireByte(byte)) {
                        log::trace!("{:#04x} closed run: {}", byte, event);
                        return Ok(event);
                    }
                    continue;
                }
                Ok(None) => (),
                Err(ref err) if is_transient(err) => (),
                Err(err) => return Err(Error::ChannelRead(err)),
            }

            loop {
                match self.channel.wait_ready(Interest::Read, timeout) {
                    Ok(Readiness::Ready) => break,
                    Ok(Readiness::TimedOut) => return Ok(self.accumulator.on_timeout()),
                    Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => return Err(Error::ChannelRead(err)),
                }
            }
        }
    }

    /// Unbounded stream of events, each waited for with `deadline_us`.
    /// Ends after yielding the first error.
    pub fn events(&mut self, deadline_us: u32) -> Events<'_, C> {
        Events {
            decoder: self,
            deadline_us,
            failed: false,
        }
    }
}

pub struct Events<'a, C> {
    decoder: &'a mut Decoder<C>,
    deadline_us: u32,
    failed: bool,
}

impl<'a, C: Channel> Iterator for Events<'a, C> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let res = self.decoder.decode_next(self.deadline_us);
        self.failed = res.is_err();
        Some(res)
    }
}
