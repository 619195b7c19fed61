/// Errors that can occur during frame encoding or while driving a stream.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame ID lies in the reserved range `0xF100..=0xFFFF`.
    #[error("invalid frame id 0x{id:04X} (max 0xF0FF)")]
    InvalidId { id: u16 },

    /// The payload exceeds the protocol or configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The header does not start with `0xF1`.
    #[error("invalid start-of-frame marker 0x{found:02X} (expected 0xF1)")]
    InvalidStartOfFrame { found: u8 },

    /// The header length field lies in the reserved range.
    #[error("invalid data length {length} (max 0xF0FF)")]
    LengthOverflow { length: u16 },

    /// The header does not end with `0xFF`.
    #[error("invalid end-of-header marker 0x{found:02X} (expected 0xFF)")]
    UnexpectedEndOfHeader { found: u8 },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte source reached EOF.
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;

/// A problem found in the byte stream.
///
/// None of these are fatal: the decoder reports the event and resynchronizes
/// on its own. They are values handed to the caller, not failures of the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Candidate header carried an ID above `0xF0FF`.
    #[error("candidate header has invalid id 0x{id:04X}")]
    InvalidId { id: u16 },

    /// Candidate header carried a length above `0xF0FF`.
    #[error("candidate header has invalid length 0x{length:04X}")]
    LengthOverflow { length: u16 },

    /// The byte after the length field was not `0xFF`.
    #[error("expected end-of-header 0xFF, found 0x{found:02X}")]
    UnexpectedEndOfHeader { found: u8 },

    /// A byte inside the data section is outside the base64 alphabet.
    #[error("invalid base64 character 0x{byte:02X} at data offset {offset}")]
    InvalidCharacter { offset: usize, byte: u8 },

    /// The decoded payload does not match its trailing checksum.
    #[error("checksum mismatch in frame 0x{id:04X}")]
    CrcMismatch { id: u16 },

    /// A partially received frame was abandoned after the caller's deadline.
    #[error("frame timed out ({discarded} bytes discarded)")]
    Timeout { discarded: usize },

    /// The declared data section does not fit the configured capacity.
    #[error("declared length {length} exceeds capacity {capacity}")]
    CapacityExceeded { length: usize, capacity: usize },
}

/// Errors from the restricted base64 codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Base64Error {
    /// Byte outside `A-Z a-z 0-9 + /`.
    #[error("invalid base64 character 0x{byte:02X} at offset {offset}")]
    InvalidCharacter { offset: usize, byte: u8 },

    /// The unused low bits of the final character are not zero.
    #[error("non-zero trailing bits in final character 0x{byte:02X} at offset {offset}")]
    TrailingBits { offset: usize, byte: u8 },

    /// No byte sequence encodes to this many characters.
    #[error("invalid base64 length {len}")]
    InvalidLength { len: usize },
}
