//! Proof-of-work hash strategies.
//!
//! The active strategy is scrypt with fixed parameters N=1024, r=1, p=1 and
//! a 32-byte output, computed over the 80-byte header, which also serves as
//! its own salt. A double-SHA256 strategy is kept for unit tests that need a
//! cheap hash.

use ember_primitives::{sha256d, BlockHeader, Hash256};
use scrypt::Params;

/// A proof-of-work hash over a block header.
pub trait PowHasher: Send + Sync {
    fn pow_hash(&self, header: &BlockHeader) -> Hash256;
}

/// scrypt(N=1024, r=1, p=1, dkLen=32) over the 80-byte header.
pub struct ScryptPow {
    params: Params,
}

impl ScryptPow {
    pub fn new() -> Self {
        ScryptPow {
            // log2(1024) = 10
            params: Params::new(10, 1, 1, 32).expect("fixed scrypt parameters are valid"),
        }
    }
}

impl Default for ScryptPow {
    fn default() -> Self {
        Self::new()
    }
}

impl PowHasher for ScryptPow {
    fn pow_hash(&self, header: &BlockHeader) -> Hash256 {
        let input = header.serialize();
        let mut output = [0u8; 32];
        scrypt::scrypt(&input, &input, &self.params, &mut output)
            .expect("output length matches parameters");
        Hash256::from_bytes(output)
    }
}

/// Double SHA-256 of the header, i.e. the block hash itself.
pub struct DoubleSha256Pow;

impl PowHasher for DoubleSha256Pow {
    fn pow_hash(&self, header: &BlockHeader) -> Hash256 {
        sha256d(&header.serialize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrypt_is_deterministic() {
        let hasher = ScryptPow::new();
        let header = BlockHeader {
            version: 1,
            time: 1_317_972_665,
            bits: 0x1e0f_ffff,
            ..Default::default()
        };
        assert_eq!(hasher.pow_hash(&header), hasher.pow_hash(&header));
    }

    #[test]
    fn test_scrypt_depends_on_nonce() {
        let hasher = ScryptPow::new();
        let mut header = BlockHeader::default();
        let h0 = hasher.pow_hash(&header);
        header.nonce = 1;
        assert_ne!(hasher.pow_hash(&header), h0);
    }

    #[test]
    fn test_sha256d_strategy_matches_block_hash() {
        let header = BlockHeader {
            nonce: 7,
            ..Default::default()
        };
        assert_eq!(DoubleSha256Pow.pow_hash(&header), header.hash());
    }
}
