//! # ember-primitives
//!
//! Core data types for the Ember blockchain.
//!
//! This crate provides:
//! - 32-byte hashes and double-SHA256
//! - Monetary amounts and fee rates
//! - A minimal script byte builder
//! - Transactions with segregated witness serialization
//! - Blocks and 80-byte block headers

mod amount;
mod block;
mod hash;
mod script;
mod transaction;

pub use amount::{format_money, Amount, FeeRate, COIN};
pub use block::{Block, BlockHeader, BLOCK_HEADER_SIZE};
pub use hash::{sha256d, Hash256};
pub use script::{opcodes, Script};
pub use transaction::{OutPoint, Transaction, TxIn, TxOut, SEQUENCE_FINAL};

/// Factor by which non-witness bytes are weighted against witness bytes.
pub const WITNESS_SCALE_FACTOR: u64 = 4;
