//! # ember-consensus
//!
//! Consensus rules and parameters for the Ember blockchain.
//!
//! This crate provides:
//! - Chain parameters and the block subsidy schedule
//! - Compact-bits difficulty encoding and 256-bit target arithmetic
//! - The scrypt proof-of-work hash behind a pluggable strategy
//! - Merkle roots and the coinbase witness commitment
//! - Transaction finality and legacy signature-operation counting
//! - The chain-view and block-validation interfaces the miner consumes

mod chain;
mod error;
mod merkle;
mod params;
mod pow;
mod pow_hash;
mod tx_verify;

pub use chain::{BlockIndex, BlockValidation, ChainView};
pub use error::{ConsensusError, ConsensusResult};
pub use merkle::{
    block_merkle_root, block_witness_merkle_root, generate_coinbase_commitment, merkle_root,
    WITNESS_COMMITMENT_HEADER,
};
pub use params::{
    get_block_subsidy, ChainParams, Network, DEFAULT_BLOCK_MAX_WEIGHT, DEFAULT_BLOCK_MIN_TX_FEE,
    LOCKTIME_THRESHOLD, MAX_BLOCK_SIGOPS_COST, MAX_BLOCK_WEIGHT,
};
pub use pow::{compact_to_target, hash_meets_target, target_to_compact, target_to_le_bytes};
pub use pow_hash::{DoubleSha256Pow, PowHasher, ScryptPow};
pub use tx_verify::{is_final_tx, legacy_sigop_count};

pub use ember_primitives::WITNESS_SCALE_FACTOR;
