//! Consensus error types.

use thiserror::Error;

/// Consensus errors.
#[derive(Error, Debug)]
pub enum ConsensusError {
    /// A block failed the validity check.
    #[error("block validity check failed: {0}")]
    BlockInvalid(String),
}

/// Result type for consensus operations.
pub type ConsensusResult<T> = Result<T, ConsensusError>;
