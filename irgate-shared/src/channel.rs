use std::collections::VecDeque;
use std::io;
use std::time::Duration;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Interest {
    Read,
    Write,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Readiness {
    Ready,
    TimedOut,
}

/// `WouldBlock` and `Interrupted` are retried, everything else is fatal
pub(crate) fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

/// Non-blocking duplex byte stream to the gateway.
///
/// Transient conditions are reported the way the OS reports them: `WouldBlock` and
/// `Interrupted` errors, or `Ok(None)` from [`Channel::try_read_byte`]. Callers in
/// this crate absorb them.
pub trait Channel {
    /// Read a single byte without blocking. `Ok(None)` when nothing is available.
    fn try_read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Write as much of `buf` as the channel accepts without blocking
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Block until the channel is ready for `interest` or `timeout` elapses.
    /// A `timeout` of `None` waits forever.
    fn wait_ready(&mut self, interest: Interest, timeout: Option<Duration>) -> io::Result<Readiness>;
}

impl<C: Channel + ?Sized> Channel for &mut C {
    fn try_read_byte(&mut self) -> io::Result<Option<u8>> {
        (**self).try_read_byte()
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn wait_ready(&mut self, interest: Interest, timeout: Option<Duration>) -> io::Result<Readiness> {
        (**self).wait_ready(interest, timeout)
    }
}

impl<C: Channel + ?Sized> Channel for Box<C> {
    fn try_read_byte(&mut self) -> io::Result<Option<u8>> {
        (**self).try_read_byte()
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn wait_ready(&mut self, interest: Interest, timeout: Option<Duration>) -> io::Result<Readiness> {
        (**self).wait_ready(interest, timeout)
    }
}

/// In-memory channel. Fed bytes are read back, written bytes are kept.
///
/// Nothing can arrive on its own, so waiting for input on an empty channel
/// reports a timeout even when asked to wait forever.
#[derive(Debug, Default)]
pub struct LoopbackChannel {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
}

impl LoopbackChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(bytes: &[u8]) -> Self {
        let mut channel = Self::new();
        channel.feed(bytes);
        channel
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    /// Bytes not read yet
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    pub fn written(&self) -> &[u8] {
        &self.tx
    }

    pub fn take_written(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.tx)
    }
}

impl Channel for LoopbackChannel {
    fn try_read_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.rx.pop_front())
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn wait_ready(&mut self, interest: Interest, _timeout: Option<Duration>) -> io::Result<Readiness> {
        match interest {
            Interest::Read if self.rx.is_empty() => Ok(Readiness::TimedOut),
            _ => Ok(Readiness::Ready),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_reads_back_fed_bytes() {
        let mut ch = LoopbackChannel::with_input(&[0x4c, 0x99]);
        assert_eq!(ch.pending(), 2);
        assert_eq!(ch.wait_ready(Interest::Read, None).unwrap(), Readiness::Ready);
        assert_eq!(ch.try_read_byte().unwrap(), Some(0x4c));
        assert_eq!(ch.try_read_byte().unwrap(), Some(0x99));
        assert_eq!(ch.try_read_byte().unwrap(), None);
        assert_eq!(ch.wait_ready(Interest::Read, None).unwrap(), Readiness::TimedOut);
    }

    #[test]
    fn loopback_collects_writes() {
        let mut ch = LoopbackChannel::new();
        assert_eq!(ch.wait_ready(Interest::Write, None).unwrap(), Readiness::Ready);
        assert_eq!(ch.write(&[1, 2, 3]).unwrap(), 3);
        assert_eq!(ch.write(&[4]).unwrap(), 1);
        assert_eq!(ch.written(), &[1, 2, 3, 4]);
        assert_eq!(ch.take_written(), vec![1, 2, 3, 4]);
        assert!(ch.written().is_empty());
    }

    #[test]
    fn works_through_references() {
        fn read_one<C: Channel>(mut ch: C) -> Option<u8> {
            ch.try_read_byte().unwrap()
        }

        let mut ch = LoopbackChannel::with_input(&[7, 8]);
        assert_eq!(read_one(&mut ch), Some(7));
        let boxed: Box<dyn Channel> = Box::new(ch);
        assert_eq!(read_one(boxed), Some(8));
    }
}
