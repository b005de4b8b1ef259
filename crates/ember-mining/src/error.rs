//! Mining error types.

use thiserror::Error;

/// Mining errors.
#[derive(Error, Debug)]
pub enum MiningError {
    /// The wallet returned no script to mine to (e.g. the keypool is
    /// empty). The worker logs and exits.
    #[error("no coinbase script available (mining requires a wallet)")]
    NoCoinbaseScript,

    /// The chain tip moved while a template was being assembled. The worker
    /// discards the template and reassembles.
    #[error("chain tip moved during block assembly")]
    StaleTip,

    /// A template this node built failed its own validity check. Fatal to
    /// the worker, since it indicates a bug.
    #[error("assembled an invalid block template: {0}")]
    InvalidTemplate(String),

    /// A candidate's precise proof-of-work hash differed from the scanner's
    /// output. Fatal assertion.
    #[error("scanned hash does not match the block's proof-of-work hash")]
    HashMismatch,

    /// Cancellation was requested. Propagated up without being treated as a
    /// failure.
    #[error("mining interrupted")]
    Interrupted,
}

/// Result type for mining operations.
pub type MiningResult<T> = Result<T, MiningError>;
