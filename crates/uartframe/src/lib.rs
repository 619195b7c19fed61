//! Self-synchronizing message framing for UART and other byte links.
//!
//! uartframe wraps arbitrary binary payloads in frames that a receiver can
//! pick out of a noisy, lossy byte stream without any out-of-band signalling.
//!
//! # Crate Structure
//!
//! - [`frame`]: wire format, CRC-16/USB, restricted base64, the synchronizing
//!   stream decoder and blocking reader/writer adapters
//!
//! With the `async` feature, [`frame::SerialCodec`] plugs into
//! `tokio_util::codec::{FramedRead, FramedWrite}`.

/// Re-export frame types.
pub mod frame {
    pub use uartframe_frame::*;
}
