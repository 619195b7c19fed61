use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

use crate::b64;
use crate::checksum::checksum;
use crate::error::Result;
use crate::header::{data_len_for, FrameHeader, CHECKSUM_SIZE, HEADER_SIZE, MAX_PAYLOAD};

/// A decoded or to-be-encoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame ID, `0x0000..=0xF0FF`.
    pub id: u16,
    /// The message payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(id: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (header + data section).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + data_len_for(self.payload.len())
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────┬──────────┬──────────┬──────┬────────────────────────────────┐
/// │ 0xF1 │ ID       │ Length   │ 0xFF │ base64(payload ‖ crc16 LE)     │
/// │      │ (2B LE)  │ (2B LE)  │      │ (Length characters, unpadded)  │
/// └──────┴──────────┴──────────┴──────┴────────────────────────────────┘
/// ```
///
/// Nothing is written to `dst` if the frame is rejected.
pub fn encode_frame(id: u16, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let header = FrameHeader::new(id, payload.len())?;

    let mut raw = Vec::with_capacity(payload.len() + CHECKSUM_SIZE);
    raw.extend_from_slice(payload);
    raw.extend_from_slice(&checksum(payload).to_le_bytes());

    dst.reserve(header.wire_size());
    dst.put_slice(&header.as_bytes());
    b64::encode_into(&raw, dst);
    Ok(())
}

/// Encode a frame into a freshly allocated buffer.
pub fn encode(id: u16, payload: &[u8]) -> Result<Bytes> {
    let mut dst = BytesMut::new();
    encode_frame(id, payload, &mut dst)?;
    Ok(dst.freeze())
}

/// Configuration for the frame codec and its stream adapters.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 46269, the protocol limit.
    ///
    /// Lower values also cap the decoder's buffer; frames declaring a larger
    /// data section are rejected with `CapacityExceeded`.
    pub max_payload_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<Duration>,
    /// How long a partially received frame may stay incomplete.
    pub frame_timeout: Option<Duration>,
}

impl FrameConfig {
    /// Largest data section length the decoder will buffer.
    pub fn data_capacity(&self) -> usize {
        data_len_for(self.max_payload_size.min(MAX_PAYLOAD))
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
            frame_timeout: None,
        }
    }
}
