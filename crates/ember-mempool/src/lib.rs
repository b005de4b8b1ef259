//! # ember-mempool
//!
//! Transaction memory pool for the Ember blockchain.
//!
//! This crate provides:
//! - Entry storage with precomputed ancestor statistics (cumulative size,
//!   modified fees and signature-operation cost)
//! - An index ordered by ancestor fee rate, the ordering block assembly
//!   walks
//! - Ancestor and descendant enumeration over in-pool dependencies

mod entry;
mod error;
mod ordering;
mod pool;

pub use entry::MempoolEntry;
pub use error::{MempoolError, MempoolResult};
pub use ordering::AncestorScore;
pub use pool::{Mempool, MempoolView};
