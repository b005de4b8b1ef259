//! Chain-view and validation interfaces consumed by block production.

use crate::error::ConsensusResult;
use ember_primitives::{Block, BlockHeader, Hash256};
use std::sync::Arc;

/// A summary of one block in the active chain.
///
/// Two indexes refer to the same block exactly when their hashes are equal;
/// tip-change detection compares hashes, never addresses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockIndex {
    /// Height of this block.
    pub height: u32,
    /// The block hash.
    pub hash: Hash256,
    /// The block's own timestamp.
    pub time: i64,
    /// Median of the previous eleven block timestamps.
    pub median_time_past: i64,
}

/// View of the active chain as the miner consumes it.
pub trait ChainView: Send + Sync {
    /// The current chain tip.
    fn tip(&self) -> Arc<BlockIndex>;

    /// Compact difficulty target required for a block extending `tip`.
    fn next_work_required(&self, tip: &BlockIndex, header: &BlockHeader) -> u32;

    /// Block version to advertise on top of `tip`.
    fn compute_block_version(&self, tip: &BlockIndex) -> i32;

    /// Whether segregated witness is active for blocks extending `tip`.
    fn is_witness_enabled(&self, tip: &BlockIndex) -> bool;

    /// Network-adjusted unix time.
    fn adjusted_time(&self) -> i64;
}

/// The node's block-acceptance pipeline as the miner consumes it.
pub trait BlockValidation: Send + Sync {
    /// Check a freshly assembled block without connecting it.
    fn test_block_validity(&self, block: &Block, tip: &BlockIndex) -> ConsensusResult<()>;

    /// Submit a solved block as if received from a peer. Returns whether the
    /// block was accepted.
    fn process_new_block(&self, block: &Block, force_processing: bool) -> bool;
}
