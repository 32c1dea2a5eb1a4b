//! SHA-256 hashing used for block hashes and transaction ids.

use sha2::{Digest, Sha256};

/// Computes the SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes the SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Checks if a hash meets the difficulty target.
/// The hash must start with `difficulty` zero bits.
pub fn meets_difficulty(hash: &[u8], difficulty: u32) -> bool {
    let full_bytes = difficulty as usize / 8;
    let remaining_bits = difficulty as usize % 8;

    for byte in hash.iter().take(full_bytes) {
        if *byte != 0 {
            return false;
        }
    }

    if remaining_bits > 0 {
        match hash.get(full_bytes) {
            Some(byte) => {
                let mask = 0xFFu8 << (8 - remaining_bits);
                if byte & mask != 0 {
                    return false;
                }
            }
            None => return false,
        }
    }

    hash.len() >= full_bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_meets_difficulty() {
        let hash = [0x00, 0x00, 0x0F, 0xFF];
        assert!(meets_difficulty(&hash, 16));
        assert!(meets_difficulty(&hash, 20));
        assert!(!meets_difficulty(&hash, 21));
        assert!(!meets_difficulty(&hash, 24));
    }

    #[test]
    fn test_zero_difficulty_always_met() {
        assert!(meets_difficulty(&[0xFF], 0));
    }
}
