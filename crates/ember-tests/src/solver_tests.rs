//! Nonce scanner scenarios against the real scrypt hash.

use ember_consensus::{hash_meets_target, PowHasher, ScryptPow};
use ember_mining::scan_pow_hash;
use ember_primitives::{BlockHeader, Hash256};
use num_bigint::BigUint;

fn scrypt_header() -> BlockHeader {
    BlockHeader {
        version: 4,
        time: 1_700_000_000,
        bits: 0x1e0f_ffff,
        ..Default::default()
    }
}

/// A target whose little-endian top byte is `top`, all other bytes zero.
fn target_with_top_byte(top: u8) -> BigUint {
    let mut bytes = [0u8; 32];
    bytes[31] = top;
    BigUint::from_bytes_le(&bytes)
}

#[test]
fn test_scanner_precision_against_scrypt() {
    let hasher = ScryptPow::new();
    let header = scrypt_header();

    // Find a nonce whose scrypt hash has its high byte exactly 1.
    let mut k = None;
    for nonce in 0u32..200_000 {
        let hash = hasher.pow_hash(&BlockHeader { nonce, ..header });
        if hash.as_bytes()[31] == 1 {
            k = Some((nonce, hash));
            break;
        }
    }
    let (k, expected_hash) = k.expect("a high-byte-1 hash exists in range");

    // Against a target with high byte 2 the scanner must succeed at K on
    // its first try, and the precise comparison must confirm it.
    let target = target_with_top_byte(2);
    let mut nonce = k;
    let mut hash = Hash256::ZERO;
    let mut scanned = 0;
    assert!(scan_pow_hash(
        &hasher,
        &header,
        &mut nonce,
        &target,
        &mut hash,
        &mut scanned,
    ));
    assert_eq!(nonce, k);
    assert_eq!(scanned, 1);
    assert_eq!(hash, expected_hash);
    assert!(hash_meets_target(&hash, &target));
}

#[test]
fn test_search_soundness_with_scrypt() {
    // Loop the scanner the way a worker does until the precise comparison
    // passes, then confirm the reported nonce reproduces the hash.
    let hasher = ScryptPow::new();
    let header = scrypt_header();
    let target = target_with_top_byte(0x60);

    let mut nonce = 0u32;
    let mut hash = Hash256::ZERO;
    let mut scanned = 0;
    for _ in 0..10_000 {
        if scan_pow_hash(&hasher, &header, &mut nonce, &target, &mut hash, &mut scanned) {
            if hash_meets_target(&hash, &target) {
                let solved = BlockHeader { nonce, ..header };
                assert_eq!(hasher.pow_hash(&solved), hash);
                assert!(hash_meets_target(&hasher.pow_hash(&solved), &target));
                return;
            }
            nonce = nonce.wrapping_add(1);
        }
    }
    panic!("no scrypt candidate satisfied the target");
}
