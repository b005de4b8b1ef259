//! 32-byte hashes.

use sha2::{Digest, Sha256};
use std::fmt;

/// A 256-bit hash (txid, block hash, proof-of-work hash).
///
/// Stored in the internal (little-endian) byte order used on the wire;
/// displayed reversed, following the usual convention for block explorers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The all-zero hash.
    pub const ZERO: Hash256 = Hash256([0u8; 32]);

    /// Create from raw bytes (internal byte order).
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Hash256(bytes)
    }

    /// The raw bytes in internal byte order.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        write!(f, "{}", hex::encode(reversed))
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self)
    }
}

/// Double SHA-256 of `data`.
pub fn sha256d(data: &[u8]) -> Hash256 {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    Hash256(second.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256d_deterministic() {
        let a = sha256d(b"ember");
        let b = sha256d(b"ember");
        assert_eq!(a, b);
        assert_ne!(a, sha256d(b"Ember"));
    }

    #[test]
    fn test_display_reverses_byte_order() {
        let mut bytes = [0u8; 32];
        bytes[31] = 0xab;
        let hash = Hash256::from_bytes(bytes);
        assert!(hash.to_string().starts_with("ab"));
    }

    #[test]
    fn test_zero() {
        assert!(Hash256::ZERO.is_zero());
        assert!(!sha256d(b"x").is_zero());
    }
}
