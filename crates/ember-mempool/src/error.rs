//! Error types for the mempool.

use ember_primitives::Hash256;
use thiserror::Error;

/// Mempool errors.
#[derive(Error, Debug)]
pub enum MempoolError {
    /// Transaction already exists in the pool.
    #[error("transaction {0} already in mempool")]
    AlreadyExists(Hash256),
}

/// Result type for mempool operations.
pub type MempoolResult<T> = Result<T, MempoolError>;
