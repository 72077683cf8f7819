//! Content hashing

use sha3::Shake256;
use sha3::digest::{ExtendableOutput, Update, XofReader};

/// Digest length in bytes (hex form is twice as long)
pub const HASH_LEN: usize = 16;

/// Hash encoded packet bytes: SHAKE256 truncated to 128 bits, lower-case hex
#[must_use]
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Shake256::default();
    hasher.update(data);
    let mut reader = hasher.finalize_xof();
    let mut digest = [0u8; HASH_LEN];
    reader.read(&mut digest);
    hex::encode(digest)
}

/// Whether `candidate` looks like a hash produced by [`hash_bytes`]
#[must_use]
pub fn is_valid_hash(candidate: &str) -> bool {
    candidate.len() == HASH_LEN * 2
        && candidate
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash_bytes(b"packet"), hash_bytes(b"packet"));
        assert_ne!(hash_bytes(b"packet"), hash_bytes(b"packe7"));
    }

    #[test]
    fn test_hash_shape() {
        let hash = hash_bytes(b"");
        assert_eq!(hash.len(), 32);
        assert!(is_valid_hash(&hash));
    }

    #[test]
    fn test_known_digest() {
        // SHAKE256("") truncated to 16 bytes
        assert_eq!(hash_bytes(b""), "46b9dd2b0ba88d13233b3feb743eeb24");
    }

    #[test]
    fn test_is_valid_hash_rejects() {
        assert!(!is_valid_hash("abc"));
        assert!(!is_valid_hash("46B9DD2B0BA88D13233B3FEB743EEB24"));
        assert!(!is_valid_hash("../../../../../../etc/passwd0000"));
    }
}
