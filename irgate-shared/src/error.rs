use std::io;
#[cfg(feature = "utils")]
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading from, or waiting on, the channel failed. Abandon the current receive.
    #[error("channel read failed: {0}")]
    ChannelRead(#[source] io::Error),
    /// Writing to, or waiting on, the channel failed. Bytes already written stay written.
    #[error("channel write failed: {0}")]
    ChannelWrite(#[source] io::Error),
    #[cfg(feature = "utils")]
    #[error("serial port: {0}")]
    Serial(#[from] serialport::Error),
    #[cfg(feature = "utils")]
    #[error("{} is not a character device", .0.display())]
    NotACharDevice(PathBuf),
    #[cfg(feature = "utils")]
    #[error("device {}: {source}", .path.display())]
    Device {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
