//! # ember-mining
//!
//! Block production for the Ember blockchain.
//!
//! This crate provides:
//! - Block template assembly by ancestor fee rate under weight and
//!   signature-operation budgets
//! - The modified-score overlay that keeps package ordering correct as
//!   ancestors are absorbed into the block
//! - The scrypt nonce scanner
//! - The miner supervisor that runs worker threads against the chain tip

mod assembler;
mod config;
mod error;
mod miner;
mod scorer;
mod solver;

pub use assembler::{
    update_time, AssemblerOptions, BlockAssembler, BlockTemplate, LAST_BLOCK_TX, LAST_BLOCK_WEIGHT,
};
pub use config::MinerConfig;
pub use error::{MiningError, MiningResult};
pub use miner::{
    increment_extra_nonce, process_block_found, Miner, MinerContext, MiningWallet, NetStatus,
    ReserveScript,
};
pub use scorer::{ModifiedEntry, ModifiedTxSet};
pub use solver::scan_pow_hash;

/// Maximum size of the coinbase script signature, in bytes.
pub const MAX_COINBASE_SCRIPT_SIG_SIZE: usize = 100;
