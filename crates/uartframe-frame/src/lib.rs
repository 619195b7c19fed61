//! Self-synchronizing frame codec for byte-oriented serial links.
//!
//! This is the core of uartframe. Every frame on the wire carries:
//! - A start-of-frame sentinel (`0xF1`)
//! - A 2-byte little-endian frame ID (`0x0000..=0xF0FF`)
//! - A 2-byte little-endian data section length, counted in base64 characters
//! - An end-of-header sentinel (`0xFF`)
//! - The base64 rendering of `payload || crc16`
//!
//! The sentinels can never appear inside a valid header field or a base64
//! character, so the [`StreamDecoder`] can always find its way back to the
//! next frame after garbage, truncation or overflow.

pub mod b64;
pub mod checksum;
pub mod codec;
pub mod decoder;
pub mod error;
pub mod header;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

#[cfg(feature = "async")]
pub use async_codec::SerialCodec;
pub use checksum::checksum;
pub use codec::{encode, encode_frame, Frame, FrameConfig};
pub use decoder::{DecodeEvent, DecoderStats, StreamDecoder};
pub use error::{Base64Error, DecodeError, FrameError, Result};
pub use header::{
    FrameHeader, CHECKSUM_SIZE, END_OF_HEADER, HEADER_SIZE, ID_MAX, LENGTH_MAX, MAX_PAYLOAD,
    MAX_WIRE_SIZE, START_OF_FRAME,
};
pub use reader::FrameReader;
pub use writer::{FrameWriter, WriterStats};
