use std::collections::VecDeque;
use std::error::Error as _;
use std::io;
use std::time::Duration;

use irgate_shared::protocol::{FULL_PULSE, FULL_SPACE};
use irgate_shared::{Channel, Decoder, Encoder, Error, Event, Interest, Polarity, Readiness};

enum WriteStep {
    Accept(usize),
    Fail(io::ErrorKind),
}

/// Channel that plays back scripted results
#[derive(Default)]
struct Scripted {
    reads: VecDeque<io::Result<Option<u8>>>,
    waits: VecDeque<io::Result<Readiness>>,
    writes: VecDeque<WriteStep>,
    written: Vec<u8>,
    wait_calls: Vec<(Interest, Option<Duration>)>,
}

impl Scripted {
    fn read_byte(mut self, b: u8) -> Self {
        self.reads.push_back(Ok(Some(b)));
        self
    }

    fn read_none(mut self) -> Self {
        self.reads.push_back(Ok(None));
        self
    }

    fn read_err(mut self, kind: io::ErrorKind) -> Self {
        self.reads.push_back(Err(kind.into()));
        self
    }

    fn wait(mut self, res: io::Result<Readiness>) -> Self {
        self.waits.push_back(res);
        self
    }

    fn write_step(mut self, step: WriteStep) -> Self {
        self.writes.push_back(step);
        self
    }
}

impl Channel for Scripted {
    fn try_read_byte(&mut self) -> io::Result<Option<u8>> {
        self.reads.pop_front().unwrap_or(Ok(None))
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = match self.writes.pop_front() {
            Some(WriteStep::Accept(n)) => n.min(buf.len()),
            Some(WriteStep::Fail(kind)) => return Err(kind.into()),
            None => buf.len(),
        };
        self.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn wait_ready(&mut self, interest: Interest, timeout: Option<Duration>) -> io::Result<Readiness> {
        self.wait_calls.push((interest, timeout));
        self.waits.pop_front().unwrap_or(match interest {
            Interest::Read => Ok(Readiness::TimedOut),
            Interest::Write => Ok(Readiness::Ready),
        })
    }
}

#[test]
fn transient_read_conditions_are_absorbed() {
    let script = Scripted::default()
        .read_byte(0x4c)
        .read_err(io::ErrorKind::Interrupted)
        .read_none()
        .read_err(io::ErrorKind::WouldBlock)
        .read_byte(0x99)
        .wait(Err(io::ErrorKind::Interrupted.into()))
        .wait(Ok(Readiness::Ready))
        .wait(Ok(Readiness::Ready))
        .wait(Ok(Readiness::Ready));

    let mut decoder = Decoder::new(script);
    assert_eq!(decoder.decode_next(0).unwrap(), Event::Pulse(608));

    let calls = &decoder.channel().wait_calls;
    assert_eq!(calls.len(), 4);
    assert!(calls.iter().all(|c| *c == (Interest::Read, None)));
}

#[test]
fn deadline_is_passed_in_milliseconds() {
    let mut decoder = Decoder::new(Scripted::default());
    assert_eq!(decoder.decode_next(250_700).unwrap(), Event::Timeout);
    assert_eq!(
        decoder.channel().wait_calls,
        vec![(Interest::Read, Some(Duration::from_millis(250)))]
    );
}

#[test]
fn timeout_leaves_accumulator_untouched() {
    let script = Scripted::default().read_byte(FULL_SPACE).read_byte(0x03);
    let mut decoder = Decoder::new(script);

    assert_eq!(decoder.decode_next(10_000).unwrap(), Event::Timeout);
    let before = decoder.accumulator().state();
    assert_eq!(decoder.accumulator().pending(), Some((Polarity::Space, 2048)));

    assert_eq!(decoder.decode_next(10_000).unwrap(), Event::Timeout);
    assert_eq!(decoder.accumulator().state(), before);

    decoder.channel_mut().reads.push_back(Ok(Some(0x00)));
    assert_eq!(decoder.decode_next(10_000).unwrap(), Event::Space(2048));
}

#[test]
fn read_failure_is_fatal() {
    let script = Scripted::default()
        .read_byte(0x4c)
        .read_err(io::ErrorKind::Other);
    let mut decoder = Decoder::new(script);

    match decoder.decode_next(0) {
        Err(Error::ChannelRead(err)) => assert_eq!(err.kind(), io::ErrorKind::Other),
        other => panic!("unexpected result: {:?}", other),
    }
    // Nothing is rolled back
    assert_eq!(decoder.accumulator().pending(), Some((Polarity::Pulse, 608)));
}

#[test]
fn wait_failure_is_fatal() {
    let script = Scripted::default().wait(Err(io::ErrorKind::BrokenPipe.into()));
    let mut decoder = Decoder::new(script);

    match decoder.decode_next(100_000) {
        Err(Error::ChannelRead(err)) => assert_eq!(err.kind(), io::ErrorKind::BrokenPipe),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn events_stop_after_error() {
    let script = Scripted::default()
        .read_byte(0x4c)
        .read_byte(0x99)
        .read_err(io::ErrorKind::Other);
    let mut decoder = Decoder::new(script);
    let mut events = decoder.events(0);

    assert_eq!(events.next().unwrap().unwrap(), Event::Pulse(608));
    assert!(events.next().unwrap().is_err());
    assert!(events.next().is_none());
}

#[test]
fn backpressure_and_partial_writes() {
    let script = Scripted::default()
        .write_step(WriteStep::Accept(5))
        .write_step(WriteStep::Fail(io::ErrorKind::WouldBlock))
        .write_step(WriteStep::Fail(io::ErrorKind::Interrupted))
        .write_step(WriteStep::Accept(100))
        .wait(Err(io::ErrorKind::Interrupted.into()))
        .wait(Ok(Readiness::Ready));

    let mut encoder = Encoder::new(script);
    encoder.send(&[20 * 127 * 16]).unwrap();

    let channel = encoder.channel();
    assert_eq!(channel.written, vec![FULL_PULSE; 20]);
    assert!(channel
        .wait_calls
        .iter()
        .all(|c| *c == (Interest::Write, None)));
    assert_eq!(channel.wait_calls.len(), 4);
}

#[test]
fn write_failure_keeps_sent_bytes() {
    let script = Scripted::default()
        .write_step(WriteStep::Accept(16))
        .write_step(WriteStep::Fail(io::ErrorKind::BrokenPipe));

    let mut encoder = Encoder::new(script);
    match encoder.send(&[40 * 127 * 16, 600]) {
        Err(Error::ChannelWrite(err)) => assert_eq!(err.kind(), io::ErrorKind::BrokenPipe),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(encoder.channel().written, vec![FULL_PULSE; 16]);
}

#[test]
fn write_wait_failure_is_fatal() {
    let script = Scripted::default()
        .write_step(WriteStep::Accept(0))
        .wait(Err(io::ErrorKind::Other.into()));

    let mut encoder = Encoder::new(script);
    assert!(matches!(
        encoder.send(&[600, 1200]),
        Err(Error::ChannelWrite(_))
    ));
}

#[test]
fn errors_carry_their_source() {
    let err = Error::ChannelRead(io::Error::new(io::ErrorKind::Other, "line noise"));
    assert!(err.to_string().contains("line noise"));
    assert!(err.source().is_some());
}
