//! CRC32 checksums for WAL records
//!
//! Every WAL record carries a checksum over its body. The raw CRC is masked
//! before storage so that a checksum stored alongside data that itself
//! embeds checksums does not collide with a recomputation over that data.

use crc32fast::Hasher;

/// Rotation-plus-constant applied to the raw CRC before storage.
const MASK_DELTA: u32 = 0xa282_ead8;

fn mask(crc: u32) -> u32 {
    ((crc >> 15) | (crc << 17)).wrapping_add(MASK_DELTA)
}

/// Computes the masked CRC32 checksum over `data`.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    mask(hasher.finalize())
}

/// Verifies that the stored checksum matches the data.
pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_deterministic() {
        let data = b"group record body";
        assert_eq!(compute_checksum(data), compute_checksum(data));
    }

    #[test]
    fn test_checksum_detects_single_bit_flip() {
        let mut data = vec![0x00, 0x01, 0x02, 0x03, 0x04];
        let original = compute_checksum(&data);
        data[2] ^= 0x01;
        assert_ne!(original, compute_checksum(&data));
    }

    #[test]
    fn test_mask_differs_from_raw_crc() {
        let data = b"payload";
        let mut hasher = Hasher::new();
        hasher.update(data);
        assert_ne!(compute_checksum(data), hasher.finalize());
    }

    #[test]
    fn test_verify_checksum() {
        let data = b"payload";
        let checksum = compute_checksum(data);
        assert!(verify_checksum(data, checksum));
        assert!(!verify_checksum(data, checksum ^ 1));
    }
}
