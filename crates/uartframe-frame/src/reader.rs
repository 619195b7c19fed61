use std::io::{ErrorKind, Read};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::codec::{Frame, FrameConfig};
use crate::decoder::{DecodeEvent, StreamDecoder};
use crate::error::{DecodeError, FrameError, Result};

const READ_CHUNK_SIZE: usize = 8 * 1024;
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Reads frames from any `Read` byte source.
///
/// Handles partial reads, garbage and resynchronization internally. Callers
/// get either complete frames or the decode errors seen along the way.
pub struct FrameReader<T> {
    inner: T,
    decoder: StreamDecoder,
    // Unconsumed tail of the last read, when the decoder had no room for it.
    pending: Vec<u8>,
    frame_started: Option<Instant>,
    // The socket timeout was shortened to `frame_timeout`; an expired read
    // is a poll tick, not silence, until `read_timeout` has really passed.
    polling: bool,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            decoder: StreamDecoder::with_config(config),
            pending: Vec::new(),
            frame_started: None,
            polling: false,
        }
    }

    /// Read the next event: a frame, or a decode error (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_event(&mut self) -> Result<DecodeEvent> {
        let mut silent_since = Instant::now();
        loop {
            if let Some(event) = self.poll_decoder() {
                return Ok(event);
            }
            if let Some(err) = self.check_deadline() {
                return Ok(DecodeEvent::Error(err));
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    if let Some(timeout) = self.check_deadline() {
                        return Ok(DecodeEvent::Error(timeout));
                    }
                    if self.polling && !self.silence_expired(silent_since) {
                        continue;
                    }
                    return Err(FrameError::Io(err));
                }
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                if self.decoder.in_frame() {
                    debug!(
                        buffered = self.decoder.buffered(),
                        "stream closed inside a frame"
                    );
                }
                return Err(FrameError::ConnectionClosed);
            }

            silent_since = Instant::now();
            self.pending.extend_from_slice(&chunk[..read]);
        }
    }

    /// Read the next complete frame (blocking), skipping decode errors.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            match self.read_event()? {
                DecodeEvent::Frame(frame) => return Ok(frame),
                DecodeEvent::Error(err) => warn!(error = %err, "discarding corrupt frame"),
            }
        }
    }

    /// Drop any partial frame, e.g. after the line was re-plugged.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.decoder.reset();
        self.frame_started = None;
    }

    /// The underlying stream decoder.
    pub fn decoder(&self) -> &StreamDecoder {
        &self.decoder
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum payload size for subsequent frame decoding.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.decoder.set_max_payload_size(max_payload_size);
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        self.decoder.config()
    }

    fn poll_decoder(&mut self) -> Option<DecodeEvent> {
        loop {
            if let Some(event) = self.decoder.next_event() {
                self.track_frame_start();
                return Some(event);
            }
            if self.pending.is_empty() {
                self.track_frame_start();
                return None;
            }
            let accepted = self.decoder.push(&self.pending);
            self.pending.drain(..accepted);
        }
    }

    fn track_frame_start(&mut self) {
        if !self.decoder.in_frame() {
            self.frame_started = None;
        } else if self.frame_started.is_none() {
            self.frame_started = Some(Instant::now());
        }
    }

    fn check_deadline(&mut self) -> Option<DecodeError> {
        let timeout = self.decoder.config().frame_timeout?;
        let started = self.frame_started?;
        if started.elapsed() < timeout {
            return None;
        }
        self.frame_started = None;
        self.decoder.expire()
    }

    fn silence_expired(&self, since: Instant) -> bool {
        self.decoder
            .config()
            .read_timeout
            .is_some_and(|limit| since.elapsed() >= limit)
    }
}

impl FrameReader<TcpStream> {
    /// Create a frame reader for a TCP serial bridge and apply the read timeout.
    ///
    /// With a `frame_timeout` shorter than the read timeout (or no read
    /// timeout at all), the socket wakes up every `frame_timeout` so a bridge
    /// that stalls mid-frame still yields `DecodeError::Timeout`. A silent
    /// link only fails once the full `read_timeout` has passed.
    pub fn with_config_tcp(inner: TcpStream, config: FrameConfig) -> Result<Self> {
        let poll = config
            .frame_timeout
            .map(|frame| frame.max(MIN_POLL_INTERVAL))
            .filter(|frame| config.read_timeout.is_none_or(|read| *frame < read));
        inner.set_read_timeout(poll.or(config.read_timeout))?;
        let mut reader = Self::with_config(inner, config);
        reader.polling = poll.is_some();
        Ok(reader)
    }
}
