//! Codec for the irgate infrared gateway.
//!
//! The gateway reports IR activity over a serial line as run length bytes:
//! bit 0 is the polarity (0 pulse, 1 space), and the byte with bit 0 cleared,
//! times 8us, is the duration. The [`Decoder`] turns that stream into pulse/space
//! [`Event`]s, the [`Encoder`] turns pulse/space durations back into bytes.

pub mod channel;
pub mod decoder;
pub mod encoder;
pub mod error;
#[cfg(all(unix, feature = "utils"))]
pub mod link;
pub mod protocol;

pub use channel::{Channel, Interest, LoopbackChannel, Readiness};
pub use decoder::{Accumulator, Decoder};
pub use encoder::{encode, Encoder};
pub use error::{Error, Result};
#[cfg(all(unix, feature = "utils"))]
pub use link::{LinkSettings, SerialLink};
pub use protocol::{Event, Polarity, WireByte};
