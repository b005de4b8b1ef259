//! Mempool entries.

use crate::ordering::AncestorScore;
use ember_primitives::{Amount, Hash256, Transaction};
use std::collections::BTreeSet;
use std::sync::Arc;

/// One pending transaction together with its precomputed ancestor
/// aggregates. The aggregates always include the entry itself.
#[derive(Clone, Debug)]
pub struct MempoolEntry {
    /// The transaction body.
    pub tx: Arc<Transaction>,
    txid: Hash256,
    /// Virtual size of this transaction alone.
    pub tx_size: u64,
    /// Fee paid by this transaction alone.
    pub fee: Amount,
    /// Fee plus any priority delta applied to this transaction.
    pub modified_fee: Amount,
    /// Signature-operation cost of this transaction alone.
    pub sigop_cost: i64,
    /// Virtual size of this transaction and all in-pool ancestors.
    pub size_with_ancestors: u64,
    /// Modified fees of this transaction and all in-pool ancestors.
    pub mod_fees_with_ancestors: Amount,
    /// Signature-operation cost of this transaction and all in-pool
    /// ancestors.
    pub sigops_with_ancestors: i64,
    /// Number of transactions in the ancestor package, including this one.
    pub count_with_ancestors: u64,
    /// Direct in-pool parents.
    pub parents: BTreeSet<Hash256>,
}

impl MempoolEntry {
    pub(crate) fn new(
        tx: Arc<Transaction>,
        fee: Amount,
        fee_delta: Amount,
        sigop_cost: i64,
        parents: BTreeSet<Hash256>,
    ) -> Self {
        let txid = tx.txid();
        let tx_size = tx.vsize();
        let modified_fee = fee + fee_delta;
        MempoolEntry {
            tx,
            txid,
            tx_size,
            fee,
            modified_fee,
            sigop_cost,
            size_with_ancestors: tx_size,
            mod_fees_with_ancestors: modified_fee,
            sigops_with_ancestors: sigop_cost,
            count_with_ancestors: 1,
            parents,
        }
    }

    /// The transaction id.
    pub fn txid(&self) -> Hash256 {
        self.txid
    }

    /// Ordering key over the entry's ancestor aggregates.
    pub fn score_key(&self) -> AncestorScore {
        AncestorScore {
            fees: self.mod_fees_with_ancestors,
            size: self.size_with_ancestors,
            txid: self.txid,
        }
    }
}
