//! CRC-16/USB checksum over frame payloads.

use crc::{Crc, CRC_16_USB};

/// Poly 0x8005, init 0xFFFF, reflected in/out, xorout 0xFFFF.
const CRC16_USB: Crc<u16> = Crc::<u16>::new(&CRC_16_USB);

/// Compute the CRC-16/USB of `bytes`.
pub fn checksum(bytes: &[u8]) -> u16 {
    CRC16_USB.checksum(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_value() {
        assert_eq!(checksum(b"123456789"), 0xB4C8);
    }

    #[test]
    fn short_payload() {
        assert_eq!(checksum(&[0x00, 0x01, 0x02]), 0x6E0E);
    }

    #[test]
    fn empty_input() {
        // init 0xFFFF xored with 0xFFFF
        assert_eq!(checksum(&[]), 0x0000);
    }

    #[test]
    fn single_bit_flip_changes_checksum() {
        let payload = b"the quick brown fox".to_vec();
        let reference = checksum(&payload);
        for byte in 0..payload.len() {
            for bit in 0..8 {
                let mut flipped = payload.clone();
                flipped[byte] ^= 1 << bit;
                assert_ne!(checksum(&flipped), reference, "byte {byte} bit {bit}");
            }
        }
    }
}
