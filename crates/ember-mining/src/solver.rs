//! Nonce scanning.
//!
//! The scanner looks for proof-of-work hashes with enough leading zero
//! bytes. Matching the zero-byte prefix of the target is a necessary but not
//! sufficient condition for `hash <= target`, so every candidate returned
//! here must still be checked precisely by the caller. Scanning works on a
//! private copy of the header; the template header is never mutated.

use ember_consensus::{target_to_le_bytes, PowHasher};
use ember_primitives::{BlockHeader, Hash256};
use num_bigint::BigUint;

/// Scan nonces starting at `*nonce`, hashing the header with each one.
///
/// Returns `true` when a candidate is found; `*nonce` then holds the
/// candidate nonce and `*hash_out` its hash. Returns `false` after the nonce
/// crosses a 4096 boundary so the caller can check for cancellation and tip
/// changes; the nonce keeps its position and the scan can simply be called
/// again. A target whose top byte is nonzero constrains no byte prefix, so
/// the first hash tried is a candidate; an all-zero target reports success
/// immediately with nothing scanned.
pub fn scan_pow_hash(
    hasher: &dyn PowHasher,
    header: &BlockHeader,
    nonce: &mut u32,
    target: &BigUint,
    hash_out: &mut Hash256,
    hashes_scanned: &mut u64,
) -> bool {
    let target_bytes = target_to_le_bytes(target);

    // Highest nonzero byte of the target; every hash byte above it must be
    // zero for the hash to possibly come in under the target.
    let Some(first_nonzero_from_top) = (0..32).rev().find(|&i| target_bytes[i] != 0) else {
        return true; // nothing to look for
    };

    let mut scratch = *header;
    loop {
        scratch.nonce = *nonce;
        *hash_out = hasher.pow_hash(&scratch);
        *hashes_scanned += 1;

        if hash_out.as_bytes()[first_nonzero_from_top + 1..]
            .iter()
            .all(|&byte| byte == 0)
        {
            return true;
        }

        *nonce = nonce.wrapping_add(1);

        // Not found after trying for a while
        if *nonce & 0xfff == 0 {
            return false;
        }
    }
}
