use crate::b64;
use crate::error::{FrameError, Result};

/// Frame header: sof (1) + id (2) + length (2) + eoh (1) = 6 bytes.
pub const HEADER_SIZE: usize = 6;

/// Start-of-frame marker. Doubles as protocol version 1.
pub const START_OF_FRAME: u8 = 0xF1;

/// End-of-header marker.
pub const END_OF_HEADER: u8 = 0xFF;

/// Highest valid frame ID.
pub const ID_MAX: u16 = 0xF0FF;

/// Highest valid data section length, in base64 characters.
pub const LENGTH_MAX: u16 = 0xF0FF;

/// Trailing CRC-16 bytes inside the data section.
pub const CHECKSUM_SIZE: usize = 2;

/// Largest payload that fits in a frame: `floor(0xF0FF * 6 / 8) - 2`.
pub const MAX_PAYLOAD: usize = b64::decoded_len(LENGTH_MAX as usize) - CHECKSUM_SIZE;

/// Largest possible frame on the wire.
pub const MAX_WIRE_SIZE: usize = HEADER_SIZE + LENGTH_MAX as usize;

/// Data section length (base64 characters) for a payload of `payload_len` bytes.
pub const fn data_len_for(payload_len: usize) -> usize {
    b64::encoded_len(payload_len + CHECKSUM_SIZE)
}

/// Fixed-size frame header.
///
/// ```text
/// ┌──────────┬───────────┬────────────┬──────────┐
/// │ SOF (1B) │ ID (2B LE)│ Len (2B LE)│ EOH (1B) │
/// │ 0xF1     │ ≤ 0xF0FF  │ ≤ 0xF0FF   │ 0xFF     │
/// └──────────┴───────────┴────────────┴──────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    id: u16,
    length: u16,
}

impl FrameHeader {
    /// Build a header for a payload of `payload_len` bytes.
    pub fn new(id: u16, payload_len: usize) -> Result<Self> {
        if id > ID_MAX {
            return Err(FrameError::InvalidId { id });
        }
        if payload_len > MAX_PAYLOAD {
            return Err(FrameError::PayloadTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD,
            });
        }
        let length = u16::try_from(data_len_for(payload_len)).map_err(|_| {
            FrameError::PayloadTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD,
            }
        })?;
        Self::from_raw(id, length)
    }

    /// Build a header from raw field values.
    pub fn from_raw(id: u16, length: u16) -> Result<Self> {
        if id > ID_MAX {
            return Err(FrameError::InvalidId { id });
        }
        if length > LENGTH_MAX {
            return Err(FrameError::LengthOverflow { length });
        }
        Ok(Self { id, length })
    }

    /// Parse and validate a complete 6-byte header.
    pub fn parse(bytes: &[u8; HEADER_SIZE]) -> Result<Self> {
        let [sof, id_lo, id_hi, len_lo, len_hi, eoh] = *bytes;
        if sof != START_OF_FRAME {
            return Err(FrameError::InvalidStartOfFrame { found: sof });
        }
        let id = u16::from_le_bytes([id_lo, id_hi]);
        let length = u16::from_le_bytes([len_lo, len_hi]);
        let header = Self::from_raw(id, length)?;
        if eoh != END_OF_HEADER {
            return Err(FrameError::UnexpectedEndOfHeader { found: eoh });
        }
        Ok(header)
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    /// Raw `length` field: base64 characters in the data section.
    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn data_len(&self) -> usize {
        self.length as usize
    }

    /// Header plus data section.
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.data_len()
    }

    /// Payload bytes carried by the data section, if the length is reachable.
    pub fn payload_len(&self) -> Option<usize> {
        b64::decoded_len(self.data_len()).checked_sub(CHECKSUM_SIZE)
    }

    pub fn as_bytes(&self) -> [u8; HEADER_SIZE] {
        let [id_lo, id_hi] = self.id.to_le_bytes();
        let [len_lo, len_hi] = self.length.to_le_bytes();
        [START_OF_FRAME, id_lo, id_hi, len_lo, len_hi, END_OF_HEADER]
    }
}
