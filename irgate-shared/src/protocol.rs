use std::fmt;

/// Microseconds per unit of the wire byte magnitude field, receive direction
pub const QUANTUM_US: u32 = 8;
/// Transmit tick, the resolution the gateway advertises
pub const RESOLUTION_US: u32 = 16;
/// Largest magnitude a single wire byte can carry, in transmit ticks
pub const MAX_QUANTUM: u32 = 127;

pub const FULL_PULSE: u8 = 0xfe;
pub const FULL_SPACE: u8 = 0xff;

/// Max number of identical bytes handed to the channel in one write
pub const MAX_BATCH: usize = 16;

/// Space runs longer than this, closed by a zero length pulse byte, are end of code gaps
pub const QUIRK_SPACE_THRESHOLD_US: u32 = 10_000;
pub const QUIRK_SPACE_OVERRIDE_US: u32 = 100_000;

pub const MODE2_SPACE: u32 = 0x0000_0000;
pub const MODE2_PULSE: u32 = 0x0100_0000;
pub const MODE2_TIMEOUT: u32 = 0x0300_0000;
pub const MODE2_VALUE_MASK: u32 = 0x00ff_ffff;
pub const MODE2_MASK: u32 = 0xff00_0000;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Polarity {
    /// Emitter modulated
    Pulse,
    /// Emitter silent
    Space,
}

impl Polarity {
    /// Polarity of the `index`th duration in a code. Codes always start with a pulse.
    pub fn from_index(index: usize) -> Self {
        if index % 2 == 0 {
            Polarity::Pulse
        } else {
            Polarity::Space
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Polarity::Pulse => Polarity::Space,
            Polarity::Space => Polarity::Pulse,
        }
    }

    /// Value of bit 0 in a wire byte
    pub fn bit(self) -> u8 {
        match self {
            Polarity::Pulse => 0,
            Polarity::Space => 1,
        }
    }

    /// The wire byte carrying the largest magnitude for this polarity
    pub fn full_byte(self) -> u8 {
        match self {
            Polarity::Pulse => FULL_PULSE,
            Polarity::Space => FULL_SPACE,
        }
    }
}

/// One octet as sent by the gateway.
///
/// Bit 0 holds the polarity, bits 1-7 the magnitude. Masking off the polarity bit
/// leaves the magnitude in place, so a byte lasts `(byte & 0xfe) * 8` microseconds.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct WireByte(pub u8);

impl WireByte {
    /// Pack a magnitude field (0..=127) and a polarity into a wire byte
    pub fn new(polarity: Polarity, field: u8) -> Self {
        debug_assert!(u32::from(field) <= MAX_QUANTUM);
        WireByte((field << 1) | polarity.bit())
    }

    pub fn polarity(self) -> Polarity {
        if self.0 & 1 == 0 {
            Polarity::Pulse
        } else {
            Polarity::Space
        }
    }

    pub fn quantum(self) -> u32 {
        u32::from(self.0 & 0xfe)
    }

    pub fn duration_us(self) -> u32 {
        self.quantum() * QUANTUM_US
    }
}

impl From<u8> for WireByte {
    fn from(byte: u8) -> Self {
        WireByte(byte)
    }
}

impl fmt::Debug for WireByte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WireByte({:#04x})", self.0)
    }
}

/// A decoded span of one polarity, or the absence of data before a deadline
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Event {
    Pulse(u32),
    Space(u32),
    Timeout,
}

impl Event {
    pub fn new(polarity: Polarity, duration: u32) -> Self {
        match polarity {
            Polarity::Pulse => Event::Pulse(duration),
            Polarity::Space => Event::Space(duration),
        }
    }

    pub fn duration(&self) -> Option<u32> {
        match *self {
            Event::Pulse(d) | Event::Space(d) => Some(d),
            Event::Timeout => None,
        }
    }

    pub fn polarity(&self) -> Option<Polarity> {
        match self {
            Event::Pulse(_) => Some(Polarity::Pulse),
            Event::Space(_) => Some(Polarity::Space),
            Event::Timeout => None,
        }
    }

    /// Pack into a lirc mode2 word. Durations are truncated to the 24 bit value field.
    pub fn to_mode2(&self) -> u32 {
        match *self {
            Event::Pulse(d) => MODE2_PULSE | (d & MODE2_VALUE_MASK),
            Event::Space(d) => MODE2_SPACE | (d & MODE2_VALUE_MASK),
            Event::Timeout => MODE2_TIMEOUT,
        }
    }

    pub fn from_mode2(word: u32) -> Option<Self> {
        let value = word & MODE2_VALUE_MASK;
        match word & MODE2_MASK {
            MODE2_PULSE => Some(Event::Pulse(value)),
            MODE2_SPACE => Some(Event::Space(value)),
            MODE2_TIMEOUT => Some(Event::Timeout),
            _ => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Pulse(d) => write!(f, "pulse {}", d),
            Event::Space(d) => write!(f, "space {}", d),
            Event::Timeout => f.write_str("timeout"),
        }
    }
}

/// Parse a line as printed by `mode2`, e.g. "pulse 600"
impl TryFrom<&str> for Event {
    type Error = ();

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let mut parts = s.split_whitespace();
        let kind = parts.next().ok_or(())?;
        let value = parts.next().map(str::parse::<u32>);

        if parts.next().is_some() {
            return Err(());
        }

        match (kind, value) {
            ("pulse", Some(Ok(d))) => Ok(Event::Pulse(d)),
            ("space", Some(Ok(d))) => Ok(Event::Space(d)),
            ("timeout", None) => Ok(Event::Timeout),
            // mode2 -d prints timeouts with their length
            ("timeout", Some(Ok(_))) => Ok(Event::Timeout),
            _ => Err(()),
        }
    }
}
