//! Synchronizing stream decoder.
//!
//! [`StreamDecoder`] consumes an unbounded byte stream in arbitrary chunks and
//! produces [`DecodeEvent`]s: complete frames, or structured errors for
//! candidates that turned out not to be frames.
//!
//! All bytes of the current candidate are kept in a bounded arena starting at
//! its `0xF1`. When a candidate is rejected only that `0xF1` is dropped and
//! scanning restarts at the very next byte, so a genuine frame start hidden
//! inside a bogus header or data section is never skipped.
//!
//! ```
//! use uartframe_frame::{encode, DecodeEvent, StreamDecoder};
//!
//! let mut stream = vec![0x00, 0xF1, 0xFF];
//! stream.extend_from_slice(&encode(7, b"hello").unwrap());
//!
//! let mut decoder = StreamDecoder::new();
//! let frames: Vec<_> = decoder
//!     .feed(&stream)
//!     .into_iter()
//!     .filter_map(|event| match event {
//!         DecodeEvent::Frame(frame) => Some(frame),
//!         DecodeEvent::Error(_) => None,
//!     })
//!     .collect();
//!
//! assert_eq!(frames.len(), 1);
//! assert_eq!(frames[0].id, 7);
//! assert_eq!(frames[0].payload.as_ref(), b"hello");
//! ```

use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::b64;
use crate::checksum::checksum;
use crate::codec::{Frame, FrameConfig};
use crate::error::{Base64Error, DecodeError};
use crate::header::{CHECKSUM_SIZE, END_OF_HEADER, HEADER_SIZE, ID_MAX, LENGTH_MAX, START_OF_FRAME};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Something the decoder found in the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeEvent {
    /// A complete frame with a verified checksum.
    Frame(Frame),
    /// A rejected candidate. The decoder has already resynchronized.
    Error(DecodeError),
}

impl DecodeEvent {
    pub fn into_frame(self) -> Option<Frame> {
        match self {
            DecodeEvent::Frame(frame) => Some(frame),
            DecodeEvent::Error(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, DecodeEvent::Error(_))
    }
}

/// Running counters, useful as a link-quality signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Bytes discarded while scanning, resynchronizing or resetting.
    pub bytes_skipped: u64,
    /// Frames emitted.
    pub frames_decoded: u64,
    /// Error events emitted.
    pub errors: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Scanning,
    ReadId,
    ReadLength { id: u16 },
    ExpectEoh { id: u16, length: u16 },
    // `checked` data bytes have already passed the alphabet test.
    Collecting { id: u16, length: u16, checked: usize },
}

enum Step {
    Pending,
    Continue,
    Event(DecodeEvent),
}

/// Byte-stream state machine that recovers frames from a noisy link.
///
/// Drive it with [`feed`](Self::feed), or with [`push`](Self::push) and
/// [`next_event`](Self::next_event) when events should be produced lazily.
#[derive(Debug)]
pub struct StreamDecoder {
    buf: BytesMut,
    state: State,
    config: FrameConfig,
    capacity: usize,
    stats: DecoderStats,
}

impl StreamDecoder {
    /// Create a decoder accepting every valid frame size.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a decoder with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        let capacity = config.data_capacity();
        Self {
            buf: BytesMut::with_capacity((HEADER_SIZE + capacity).min(INITIAL_BUFFER_CAPACITY)),
            state: State::Scanning,
            config,
            capacity,
            stats: DecoderStats::default(),
        }
    }

    /// Feed a chunk of the stream and collect every event it completes.
    pub fn feed(&mut self, mut bytes: &[u8]) -> Vec<DecodeEvent> {
        let mut events = Vec::new();
        loop {
            while let Some(event) = self.next_event() {
                events.push(event);
            }
            if bytes.is_empty() {
                return events;
            }
            let accepted = self.push(bytes);
            if accepted == 0 {
                events.push(DecodeEvent::Error(self.overflow()));
                continue;
            }
            bytes = &bytes[accepted..];
        }
    }

    /// Buffer as much of `bytes` as fits and return how many were taken.
    ///
    /// Once [`next_event`](Self::next_event) has returned `None` there is
    /// always room for at least one more byte.
    pub fn push(&mut self, bytes: &[u8]) -> usize {
        let room = self.max_buffered().saturating_sub(self.buf.len());
        let take = room.min(bytes.len());
        self.buf.extend_from_slice(&bytes[..take]);
        take
    }

    /// Advance over buffered bytes until an event is produced.
    ///
    /// Returns `None` when more input is needed.
    pub fn next_event(&mut self) -> Option<DecodeEvent> {
        loop {
            match self.step() {
                Step::Pending => return None,
                Step::Continue => continue,
                Step::Event(event) => return Some(event),
            }
        }
    }

    /// Drop any partial frame and return to scanning.
    ///
    /// Safe to call in any state, any number of times.
    pub fn reset(&mut self) {
        if !self.buf.is_empty() || self.state != State::Scanning {
            debug!(discarded = self.buf.len(), "decoder reset");
        }
        self.stats.bytes_skipped += self.buf.len() as u64;
        self.buf.clear();
        self.state = State::Scanning;
    }

    /// Abandon a frame whose deadline passed.
    ///
    /// Returns `Timeout` if a frame was in progress; otherwise nothing changes.
    pub fn expire(&mut self) -> Option<DecodeError> {
        if !self.in_frame() {
            return None;
        }
        let err = DecodeError::Timeout {
            discarded: self.buf.len(),
        };
        self.stats.errors += 1;
        self.reset();
        Some(err)
    }

    /// True when a frame candidate has been started but not finished.
    pub fn in_frame(&self) -> bool {
        self.state != State::Scanning
    }

    /// True when nothing is buffered.
    pub fn is_idle(&self) -> bool {
        self.state == State::Scanning && self.buf.is_empty()
    }

    /// Number of bytes currently held.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Update the maximum payload size. Applies to the current candidate too.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
        self.capacity = self.config.data_capacity();
    }

    fn max_buffered(&self) -> usize {
        HEADER_SIZE + self.capacity
    }

    fn step(&mut self) -> Step {
        match self.state {
            State::Scanning => {
                match self.buf.iter().position(|&b| b == START_OF_FRAME) {
                    Some(start) => {
                        self.skip(start);
                        self.state = State::ReadId;
                        Step::Continue
                    }
                    None => {
                        self.skip(self.buf.len());
                        Step::Pending
                    }
                }
            }
            State::ReadId => {
                let Some(&[lo, hi]) = self.buf.get(1..3) else {
                    return Step::Pending;
                };
                let id = u16::from_le_bytes([lo, hi]);
                if id > ID_MAX {
                    return self.reject(DecodeError::InvalidId { id });
                }
                self.state = State::ReadLength { id };
                Step::Continue
            }
            State::ReadLength { id } => {
                let Some(&[lo, hi]) = self.buf.get(3..5) else {
                    return Step::Pending;
                };
                let length = u16::from_le_bytes([lo, hi]);
                if length > LENGTH_MAX {
                    return self.reject(DecodeError::LengthOverflow { length });
                }
                if usize::from(length) > self.capacity {
                    return self.reject(DecodeError::CapacityExceeded {
                        length: usize::from(length),
                        capacity: self.capacity,
                    });
                }
                self.state = State::ExpectEoh { id, length };
                Step::Continue
            }
            State::ExpectEoh { id, length } => {
                let Some(&found) = self.buf.get(5) else {
                    return Step::Pending;
                };
                if found != END_OF_HEADER {
                    return self.reject(DecodeError::UnexpectedEndOfHeader { found });
                }
                self.state = State::Collecting {
                    id,
                    length,
                    checked: 0,
                };
                Step::Continue
            }
            State::Collecting {
                id,
                length,
                checked,
            } => self.collect(id, length, checked),
        }
    }

    fn collect(&mut self, id: u16, length: u16, checked: usize) -> Step {
        let data_len = usize::from(length);
        if data_len > self.capacity {
            return self.reject(DecodeError::CapacityExceeded {
                length: data_len,
                capacity: self.capacity,
            });
        }

        let end = HEADER_SIZE + data_len;
        let available = self.buf.len().min(end);
        let invalid = self
            .buf
            .get(HEADER_SIZE + checked..available)
            .unwrap_or_default()
            .iter()
            .copied()
            .enumerate()
            .find(|&(_, b)| !b64::is_alphabet(b));
        if let Some((pos, byte)) = invalid {
            return self.reject(DecodeError::InvalidCharacter {
                offset: checked + pos,
                byte,
            });
        }

        if available < end {
            self.state = State::Collecting {
                id,
                length,
                checked: available - HEADER_SIZE,
            };
            return Step::Pending;
        }
        self.finish(id, end)
    }

    fn finish(&mut self, id: u16, end: usize) -> Step {
        let data = self.buf.get(HEADER_SIZE..end).unwrap_or_default();
        let mut raw = match b64::decode(data) {
            Ok(raw) => raw,
            Err(Base64Error::InvalidCharacter { offset, byte })
            | Err(Base64Error::TrailingBits { offset, byte }) => {
                return self.reject(DecodeError::InvalidCharacter { offset, byte });
            }
            Err(Base64Error::InvalidLength { .. }) => {
                return self.reject(DecodeError::CrcMismatch { id });
            }
        };

        let Some((payload, stored)) = raw.split_last_chunk::<CHECKSUM_SIZE>() else {
            return self.reject(DecodeError::CrcMismatch { id });
        };
        if checksum(payload) != u16::from_le_bytes(*stored) {
            return self.reject(DecodeError::CrcMismatch { id });
        }

        let payload_len = payload.len();
        raw.truncate(payload_len);
        self.buf.advance(end);
        self.state = State::Scanning;
        self.stats.frames_decoded += 1;
        trace!(id, payload_len, "frame decoded");

        Step::Event(DecodeEvent::Frame(Frame {
            id,
            payload: Bytes::from(raw),
        }))
    }

    fn reject(&mut self, err: DecodeError) -> Step {
        debug!(error = %err, "frame candidate rejected");
        self.stats.errors += 1;
        // Only the tentative start-of-frame is dropped; the rest is rescanned.
        self.skip(1);
        self.state = State::Scanning;
        Step::Event(DecodeEvent::Error(err))
    }

    pub(crate) fn overflow(&mut self) -> DecodeError {
        let err = DecodeError::CapacityExceeded {
            length: self.buf.len(),
            capacity: self.max_buffered(),
        };
        debug!(error = %err, "decoder buffer full");
        self.stats.errors += 1;
        self.reset();
        err
    }

    fn skip(&mut self, n: usize) {
        self.buf.advance(n);
        self.stats.bytes_skipped += n as u64;
    }
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}
