use std::fs;
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPortInfo, StopBits, TTYPort};

use crate::channel::{Channel, Interest, Readiness};
use crate::{Error, Result};

pub const DEFAULT_DEVICE: &str = "/dev/ttyAMA0";
/// The gateway talks at a non standard rate
pub const DEFAULT_BAUD_RATE: u32 = 100_000;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LinkSettings {
    pub baud_rate: u32,
}

impl Default for LinkSettings {
    fn default() -> Self {
        LinkSettings {
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// Raw, non-blocking serial connection to the gateway
pub struct SerialLink {
    port: TTYPort,
    path: PathBuf,
}

impl SerialLink {
    pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
        Ok(serialport::available_ports()?)
    }

    pub fn open<P: AsRef<Path>>(path: P, settings: &LinkSettings) -> Result<Self> {
        let path = path.as_ref();

        let meta = fs::metadata(path).map_err(|source| Error::Device {
            path: path.to_owned(),
            source,
        })?;

        if !meta.file_type().is_char_device() {
            return Err(Error::NotACharDevice(path.to_owned()));
        }

        let port = serialport::new(path.to_string_lossy(), settings.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open_native()?;

        ignore_breaks(port.as_raw_fd())
            .and_then(|_| set_nonblocking(port.as_raw_fd()))
            .map_err(|source| Error::Device {
                path: path.to_owned(),
                source,
            })?;

        log::debug!("Opened {} at {} baud", path.display(), settings.baud_rate);

        Ok(SerialLink {
            port,
            path: path.to_owned(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A break would otherwise arrive as a 0x00 byte, which is a valid pulse byte
/// on this wire. termios2 keeps the custom rate set when the port was opened.
#[cfg(target_os = "linux")]
fn ignore_breaks(fd: RawFd) -> io::Result<()> {
    let mut tio: libc::termios2 = unsafe { std::mem::zeroed() };

    if unsafe { libc::ioctl(fd, libc::TCGETS2 as _, &mut tio) } < 0 {
        return Err(io::Error::last_os_error());
    }

    tio.c_iflag |= libc::IGNBRK | libc::IGNPAR;

    if unsafe { libc::ioctl(fd, libc::TCSETS2 as _, &tio) } < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn ignore_breaks(fd: RawFd) -> io::Result<()> {
    let mut tio: libc::termios = unsafe { std::mem::zeroed() };

    if unsafe { libc::tcgetattr(fd, &mut tio) } < 0 {
        return Err(io::Error::last_os_error());
    }

    tio.c_iflag |= libc::IGNBRK | libc::IGNPAR;

    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tio) } < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }

    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

impl Channel for SerialLink {
    fn try_read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = 0u8;
        let n = unsafe {
            libc::read(
                self.port.as_raw_fd(),
                &mut byte as *mut u8 as *mut libc::c_void,
                1,
            )
        };

        match n {
            1 => Ok(Some(byte)),
            // A non-blocking tty only reads 0 bytes once it is hung up
            0 => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("{} hung up", self.path.display()),
            )),
            _ => {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::WouldBlock {
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = unsafe {
            libc::write(
                self.port.as_raw_fd(),
                buf.as_ptr() as *const libc::c_void,
                buf.len(),
            )
        };

        if n < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(n as usize)
        }
    }

    fn wait_ready(&mut self, interest: Interest, timeout: Option<Duration>) -> io::Result<Readiness> {
        let wanted = match interest {
            Interest::Read => libc::POLLIN,
            Interest::Write => libc::POLLOUT,
        };

        let mut pfd = libc::pollfd {
            fd: self.port.as_raw_fd(),
            events: wanted | libc::POLLERR | libc::POLLHUP,
            revents: 0,
        };

        let timeout_ms = match timeout {
            None => -1,
            Some(t) => t.as_millis().min(libc::c_int::MAX as u128) as libc::c_int,
        };

        let r = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };

        if r < 0 {
            return Err(io::Error::last_os_error());
        }

        if r == 0 {
            return Ok(Readiness::TimedOut);
        }

        let failed = pfd.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0;
        if failed && pfd.revents & wanted == 0 {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("{} hung up", self.path.display()),
            ));
        }

        Ok(Readiness::Ready)
    }
}
