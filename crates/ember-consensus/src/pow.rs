//! Compact-bits encoding and 256-bit target arithmetic.

use ember_primitives::Hash256;
use num_bigint::BigUint;
use num_traits::Zero;

/// Decode a compact difficulty encoding into a 256-bit target.
///
/// A set sign bit or a zero mantissa yields the zero target, which no hash
/// can satisfy.
pub fn compact_to_target(bits: u32) -> BigUint {
    let size = (bits >> 24) as usize;
    let word = bits & 0x007f_ffff;

    if word == 0 || bits & 0x0080_0000 != 0 {
        return BigUint::zero();
    }

    if size <= 3 {
        BigUint::from(word >> (8 * (3 - size)))
    } else {
        BigUint::from(word) << (8 * (size - 3))
    }
}

/// Encode a target into the compact representation.
pub fn target_to_compact(target: &BigUint) -> u32 {
    if target.is_zero() {
        return 0;
    }

    let bytes = target.to_bytes_be();
    let mut size = bytes.len();
    let mut word: u32 = if size <= 3 {
        let mut w = 0u32;
        for &b in &bytes {
            w = (w << 8) | b as u32;
        }
        size = 3;
        w
    } else {
        ((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | (bytes[2] as u32)
    };

    // Avoid setting the sign bit
    if word & 0x0080_0000 != 0 {
        word >>= 8;
        size += 1;
    }

    ((size as u32) << 24) | word
}

/// The target as 32 little-endian bytes, the layout proof-of-work hashes use.
pub fn target_to_le_bytes(target: &BigUint) -> [u8; 32] {
    let mut out = [0u8; 32];
    let bytes = target.to_bytes_le();
    let len = bytes.len().min(32);
    out[..len].copy_from_slice(&bytes[..len]);
    out
}

/// Whether a proof-of-work hash satisfies the target.
pub fn hash_meets_target(hash: &Hash256, target: &BigUint) -> bool {
    BigUint::from_bytes_le(hash.as_bytes()) <= *target
}
