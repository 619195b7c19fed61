use std::io::{ErrorKind, Write};
use std::net::TcpStream;

use bytes::BytesMut;
use tracing::{debug, trace};

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Running counters for the transmit side of a link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Frames written out in full.
    pub frames_sent: u64,
    /// Bytes handed to the stream, including those of cut-off frames.
    pub bytes_sent: u64,
    /// Writes that hit the stream's timeout.
    pub stalls: u64,
}

/// Writes complete frames to any `Write` stream.
///
/// Each frame is encoded in full before the first byte goes out, so a
/// rejected frame never leaves a partial header on the line. A stream that
/// stalls past its write timeout fails the send with `FrameError::Io` and may
/// leave a cut-off frame behind; the receiver drops it at the next SOF.
pub struct FrameWriter<T> {
    inner: T,
    wire: BytesMut,
    config: FrameConfig,
    stats: WriterStats,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            wire: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            stats: WriterStats::default(),
        }
    }

    /// Encode and send a payload under the given frame ID, then flush.
    ///
    /// Returns the number of bytes the frame took on the wire.
    pub fn send(&mut self, id: u16, payload: &[u8]) -> Result<usize> {
        let max = self.config.max_payload_size;
        if payload.len() > max {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max,
            });
        }

        self.wire.clear();
        encode_frame(id, payload, &mut self.wire)?;
        let wire_size = self.wire.len();

        self.put_wire(id)?;
        self.stats.frames_sent += 1;
        trace!(id, wire_size, "frame sent");

        self.flush()?;
        Ok(wire_size)
    }

    /// Send an already built frame. Returns its wire size.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<usize> {
        self.send(frame.id, frame.payload.as_ref())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    if is_stall(&err) {
                        self.stats.stalls += 1;
                        debug!(error = %err, "line stalled on flush");
                    }
                    return Err(FrameError::Io(err));
                }
            }
        }
    }

    /// Transmit counters since the writer was created.
    pub fn stats(&self) -> WriterStats {
        self.stats
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum payload size for subsequent sends.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    // Push the encoded frame out, completing short writes.
    fn put_wire(&mut self, id: u16) -> Result<()> {
        let mut written = 0usize;
        while written < self.wire.len() {
            match self.inner.write(&self.wire[written..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => {
                    written += n;
                    self.stats.bytes_sent += n as u64;
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    if is_stall(&err) {
                        self.stats.stalls += 1;
                        debug!(
                            id,
                            written,
                            wire_size = self.wire.len(),
                            "line stalled mid-frame"
                        );
                    }
                    return Err(FrameError::Io(err));
                }
            }
        }
        Ok(())
    }
}

impl FrameWriter<TcpStream> {
    /// Create a frame writer for a TCP serial bridge and apply the write timeout.
    pub fn with_config_tcp(inner: TcpStream, config: FrameConfig) -> Result<Self> {
        inner.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}

// An expired SO_SNDTIMEO shows up as WouldBlock on Unix and TimedOut on Windows.
fn is_stall(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::decoder::{DecodeEvent, StreamDecoder};
    use crate::header::MAX_PAYLOAD;

    fn decode_all(wire: &[u8]) -> Vec<Frame> {
        let mut decoder = StreamDecoder::new();
        let events = decoder.feed(wire);
        assert!(events.iter().all(|event| !event.is_error()), "{events:?}");
        events.into_iter().filter_map(DecodeEvent::into_frame).collect()
    }

    #[test]
    fn write_single_frame() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut writer = FrameWriter::new(cursor);

        writer.send(1, b"hello").unwrap();

        let wire = writer.into_inner().into_inner();
        let frames = decode_all(&wire);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].id, 1);
        assert_eq!(frames[0].payload.as_ref(), b"hello");
    }

    #[test]
    fn write_check_vector() {
        let mut writer = FrameWriter::new(Vec::new());
        let wire_size = writer.send(0, b"123456789").unwrap();
        assert_eq!(wire_size, 21);
        assert_eq!(
            writer.stats(),
            WriterStats {
                frames_sent: 1,
                bytes_sent: 21,
                stalls: 0,
            }
        );

        let wire = writer.into_inner();
        assert_eq!(&wire[..6], &[0xF1, 0x00, 0x00, 0x0F, 0x00, 0xFF]);
        assert_eq!(&wire[6..], b"MTIzNDU2Nzg5yLQ");
    }

    #[test]
    fn write_multiple_frames() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut writer = FrameWriter::new(cursor);

        writer.send(1, b"one").unwrap();
        writer.send(2, b"two").unwrap();
        writer.send(3, b"three").unwrap();

        let wire = writer.into_inner().into_inner();
        let frames = decode_all(&wire);

        assert_eq!(frames.len(), 3);
        assert_eq!((frames[0].id, frames[0].payload.as_ref()), (1, b"one".as_ref()));
        assert_eq!((frames[1].id, frames[1].payload.as_ref()), (2, b"two".as_ref()));
        assert_eq!((frames[2].id, frames[2].payload.as_ref()), (3, b"three".as_ref()));
    }

    #[test]
    fn payload_too_large_rejected() {
        let cfg = FrameConfig {
            max_payload_size: 4,
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(Vec::new(), cfg);

        let err = writer.send(1, b"oversized").unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 9, max: 4 }));
        assert!(writer.get_ref().is_empty());
    }

    #[test]
    fn protocol_limit_applies_above_config() {
        let cfg = FrameConfig {
            max_payload_size: usize::MAX,
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(Vec::new(), cfg);

        let err = writer.send(1, &vec![0; MAX_PAYLOAD + 1]).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { max: 46269, .. }));
        assert!(writer.get_ref().is_empty());
    }

    #[test]
    fn invalid_id_writes_nothing() {
        let mut writer = FrameWriter::new(Vec::new());
        let err = writer.send(0xF100, b"x").unwrap_err();
        assert!(matches!(err, FrameError::InvalidId { id: 0xF100 }));
        assert!(writer.into_inner().is_empty());
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = FrameWriter::new(sink);

        writer.send(1, b"x").unwrap();

        assert!(flag.load(Ordering::SeqCst));
        assert!(!writer.get_ref().data.is_empty());
    }

    #[test]
    fn write_frame_method() {
        let mut writer = FrameWriter::new(Vec::new());
        let frame = Frame::new(2, "abc");

        assert_eq!(writer.write_frame(&frame).unwrap(), frame.wire_size());

        let frames = decode_all(&writer.into_inner());
        assert_eq!(frames, vec![frame]);
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut writer = FrameWriter::new(cursor);

        let _ = writer.get_ref();
        let _ = writer.get_mut();
        writer.set_max_payload_size(10);
        assert_eq!(writer.config().max_payload_size, 10);
        let _inner = writer.into_inner();
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let writer_impl = InterruptedWriteThenFlush {
            wrote_once: false,
            flush_interrupted: false,
            data: Vec::new(),
        };

        let mut writer = FrameWriter::new(writer_impl);
        writer.send(5, b"retry").unwrap();

        let inner = writer.into_inner();
        assert_eq!(decode_all(&inner.data).len(), 1);
    }

    #[test]
    fn stalled_write_surfaces_and_receiver_resyncs() {
        let mut writer = FrameWriter::new(StallAfter {
            budget: 5,
            data: Vec::new(),
        });

        let err = writer.send(6, b"cut off").unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
        assert_eq!(writer.stats().stalls, 1);
        assert_eq!(writer.stats().bytes_sent, 5);
        assert_eq!(writer.stats().frames_sent, 0);

        writer.get_mut().budget = usize::MAX;
        writer.send(6, b"whole").unwrap();

        let mut decoder = StreamDecoder::new();
        let events = decoder.feed(&writer.into_inner().data);
        let frames: Vec<Frame> = events.into_iter().filter_map(DecodeEvent::into_frame).collect();
        assert_eq!(frames, vec![Frame::new(6, &b"whole"[..])]);
    }

    #[test]
    fn stalled_flush_surfaces() {
        let mut writer = FrameWriter::new(StallingFlush);
        let err = writer.send(1, b"x").unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::TimedOut));
        assert_eq!(writer.stats().frames_sent, 1);
        assert_eq!(writer.stats().stalls, 1);
    }

    #[test]
    fn short_writes_are_completed() {
        let mut writer = FrameWriter::new(TrickleWriter { data: Vec::new() });
        writer.send(7, b"one byte at a time").unwrap();

        let frames = decode_all(&writer.into_inner().data);
        assert_eq!(frames[0].payload.as_ref(), b"one byte at a time");
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer.send(1, b"x").unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn written_bytes_read_back() {
        let mut writer = FrameWriter::new(Vec::new());
        writer.send(3, b"z").unwrap();

        let wire = writer.into_inner();
        let mut reader = crate::reader::FrameReader::new(Cursor::new(wire));
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.id, 3);
        assert_eq!(frame.payload.as_ref(), b"z");
    }

    #[test]
    fn applies_write_timeout_for_tcp_stream() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();

        let cfg = FrameConfig {
            write_timeout: Some(std::time::Duration::from_millis(10)),
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config_tcp(client, cfg).unwrap();
        // The kernel rounds socket timeouts up to its tick.
        let applied = writer.get_ref().write_timeout().unwrap().unwrap();
        assert!(applied >= std::time::Duration::from_millis(10), "{applied:?}");
        assert!(applied < std::time::Duration::from_secs(1), "{applied:?}");

        writer.send(11, b"over tcp").unwrap();
        let mut reader = crate::reader::FrameReader::new(server);
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.id, 11);
        assert_eq!(frame.payload.as_ref(), b"over tcp");
    }

    #[test]
    fn write_timeout_ends_send_when_peer_stops_reading() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (_idle_peer, _) = listener.accept().unwrap();

        let cfg = FrameConfig {
            write_timeout: Some(std::time::Duration::from_millis(50)),
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config_tcp(client, cfg).unwrap();

        let payload = vec![0x55; 40_000];
        let mut failure = None;
        for _ in 0..2_000 {
            if let Err(err) = writer.send(1, &payload) {
                failure = Some(err);
                break;
            }
        }

        let err = failure.expect("kernel buffers should fill up");
        assert!(matches!(
            err,
            FrameError::Io(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
        ));
        assert_eq!(writer.stats().stalls, 1);
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct InterruptedWriteThenFlush {
        wrote_once: bool,
        flush_interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedWriteThenFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_interrupted {
                self.flush_interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            Ok(())
        }
    }

    // Accepts `budget` bytes, then behaves like a send buffer that never drains.
    struct StallAfter {
        budget: usize,
        data: Vec<u8>,
    }

    impl Write for StallAfter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let room = self.budget - self.data.len().min(self.budget);
            if room == 0 {
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            let n = room.min(buf.len());
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct StallingFlush;

    impl Write for StallingFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::from(ErrorKind::TimedOut))
        }
    }

    struct TrickleWriter {
        data: Vec<u8>,
    }

    impl Write for TrickleWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            match buf.first() {
                Some(&b) => {
                    self.data.push(b);
                    Ok(1)
                }
                None => Ok(0),
            }
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
