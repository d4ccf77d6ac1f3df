//! Cryptographic hashing utilities
//!
//! SHA-256 based hashing for block hashes and transaction ids, plus the
//! binary-prefix difficulty check performed on hex-encoded hashes.

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Error raised when a hash value is not valid hexadecimal.
///
/// A malformed hash must fail the difficulty check rather than pass it,
/// even when the required difficulty is zero.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("non-hexadecimal character {character:?} in hash")]
pub struct EncodingError {
    pub character: char,
}

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Expands a hex string into its binary-digit representation.
///
/// Each hex digit maps to four binary characters (`"f"` -> `"1111"`).
pub fn hex_to_binary(hash: &str) -> Result<String, EncodingError> {
    let mut binary = String::with_capacity(hash.len() * 4);
    for character in hash.chars() {
        let nibble = character.to_digit(16).ok_or(EncodingError { character })?;
        for bit in (0..4).rev() {
            binary.push(if nibble >> bit & 1 == 1 { '1' } else { '0' });
        }
    }
    Ok(binary)
}

/// Checks whether a hex-encoded hash has at least `difficulty` leading
/// zero bits in its binary form.
pub fn hash_meets_difficulty(hash: &str, difficulty: u32) -> Result<bool, EncodingError> {
    let binary = hex_to_binary(hash)?;
    let required = difficulty as usize;
    if binary.len() < required {
        return Ok(false);
    }
    Ok(binary[..required].bytes().all(|b| b == b'0'))
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
    fn test_hex_to_binary() {
        assert_eq!(hex_to_binary("0f").unwrap(), "00001111");
        assert_eq!(hex_to_binary("a1").unwrap(), "10100001");
        assert_eq!(hex_to_binary("").unwrap(), "");
    }

    #[test]
    fn test_hex_to_binary_rejects_non_hex() {
        let err = hex_to_binary("00zz").unwrap_err();
        assert_eq!(err.character, 'z');
    }

    #[test]
    fn test_meets_difficulty() {
        // 0x0f = 4 leading zero bits
        assert!(hash_meets_difficulty("0fff", 4).unwrap());
        assert!(!hash_meets_difficulty("0fff", 5).unwrap());
        assert!(hash_meets_difficulty("00ff", 8).unwrap());
        // Difficulty 0 matches any well-formed hash
        assert!(hash_meets_difficulty("ffff", 0).unwrap());
    }

    #[test]
    fn test_malformed_hash_never_passes() {
        // A non-hex hash must signal failure even at difficulty 0
        assert!(hash_meets_difficulty("xyz", 0).is_err());
    }
}
