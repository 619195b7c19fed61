//! Restricted base64 used for the data section.
//!
//! Standard alphabet, no padding, final partial group zero-filled. None of the
//! 64 symbols is `0xF1` or `0xFF`, which is what lets the decoder treat those
//! two bytes as unambiguous sentinels.

use ::base64::engine::general_purpose::STANDARD_NO_PAD;
use ::base64::Engine as _;
use bytes::{BufMut, BytesMut};

use crate::error::Base64Error;

const SYMBOLS: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

const MEMBERSHIP: [bool; 256] = {
    let mut map = [false; 256];
    let mut i = 0;
    while i < SYMBOLS.len() {
        map[SYMBOLS[i] as usize] = true;
        i += 1;
    }
    map
};

/// Returns true if `byte` is one of the 64 base64 symbols.
#[inline]
pub fn is_alphabet(byte: u8) -> bool {
    MEMBERSHIP[byte as usize]
}

/// Number of characters produced for `n` input bytes: `ceil(n * 8 / 6)`.
pub const fn encoded_len(n: usize) -> usize {
    (n * 8).div_ceil(6)
}

/// Number of whole bytes carried by `chars` characters: `floor(chars * 6 / 8)`.
pub const fn decoded_len(chars: usize) -> usize {
    chars * 6 / 8
}

/// Encode `bytes` into a new string.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD_NO_PAD.encode(bytes)
}

/// Append the encoding of `bytes` to `dst`.
pub fn encode_into(bytes: &[u8], dst: &mut BytesMut) {
    let encoded = encode(bytes);
    dst.reserve(encoded.len());
    dst.put_slice(encoded.as_bytes());
}

/// Decode `chars` back into bytes.
///
/// The padding bits of the final character must be zero.
pub fn decode(chars: &[u8]) -> Result<Vec<u8>, Base64Error> {
    let invalid = chars
        .iter()
        .copied()
        .enumerate()
        .find(|&(_, b)| !is_alphabet(b));
    if let Some((offset, byte)) = invalid {
        return Err(Base64Error::InvalidCharacter { offset, byte });
    }
    if chars.len() % 4 == 1 {
        return Err(Base64Error::InvalidLength { len: chars.len() });
    }

    STANDARD_NO_PAD.decode(chars).map_err(|err| match err {
        ::base64::DecodeError::InvalidLastSymbol(offset, byte) => {
            Base64Error::TrailingBits { offset, byte }
        }
        ::base64::DecodeError::InvalidByte(offset, byte) => {
            Base64Error::InvalidCharacter { offset, byte }
        }
        _ => Base64Error::InvalidLength { len: chars.len() },
    })
}
