//! Transaction pool implementation.

use crate::{AncestorScore, MempoolEntry, MempoolError, MempoolResult};
use ember_primitives::{Amount, Hash256, Transaction};
use parking_lot::{RwLock, RwLockReadGuard};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

struct PoolInner {
    /// Entries by txid.
    entries: HashMap<Hash256, MempoolEntry>,
    /// Direct in-pool children of each entry.
    children: HashMap<Hash256, BTreeSet<Hash256>>,
    /// Entries ordered by ancestor fee rate, best first.
    score_index: BTreeSet<AncestorScore>,
}

/// Transaction mempool.
///
/// Block assembly takes a single [`MempoolView`] and holds it for the whole
/// assembly, so the pool cannot change under a template in progress.
pub struct Mempool {
    inner: RwLock<PoolInner>,
}

impl Mempool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Mempool {
            inner: RwLock::new(PoolInner {
                entries: HashMap::new(),
                children: HashMap::new(),
                score_index: BTreeSet::new(),
            }),
        }
    }

    /// Add a transaction paying `fee` with the given signature-operation
    /// cost. Parents are discovered from inputs whose funding transaction is
    /// already pooled; inputs funded by confirmed outputs carry no
    /// dependency.
    pub fn add(
        &self,
        tx: Arc<Transaction>,
        fee: Amount,
        sigop_cost: i64,
    ) -> MempoolResult<Hash256> {
        self.add_with_fee_delta(tx, fee, 0, sigop_cost)
    }

    /// As [`Mempool::add`], with a priority delta folded into the entry's
    /// modified fee.
    pub fn add_with_fee_delta(
        &self,
        tx: Arc<Transaction>,
        fee: Amount,
        fee_delta: Amount,
        sigop_cost: i64,
    ) -> MempoolResult<Hash256> {
        let txid = tx.txid();
        let mut inner = self.inner.write();

        if inner.entries.contains_key(&txid) {
            return Err(MempoolError::AlreadyExists(txid));
        }

        let parents: BTreeSet<Hash256> = tx
            .inputs
            .iter()
            .map(|input| input.previous_output.txid)
            .filter(|parent| inner.entries.contains_key(parent))
            .collect();

        let mut entry = MempoolEntry::new(tx, fee, fee_delta, sigop_cost, parents);

        // Fold every transitive ancestor into the entry's aggregates.
        for ancestor_id in ancestor_closure(&inner, &entry.parents) {
            let ancestor = &inner.entries[&ancestor_id];
            entry.size_with_ancestors += ancestor.tx_size;
            entry.mod_fees_with_ancestors += ancestor.modified_fee;
            entry.sigops_with_ancestors += ancestor.sigop_cost;
            entry.count_with_ancestors += 1;
        }

        for parent in entry.parents.clone() {
            inner.children.entry(parent).or_default().insert(txid);
        }
        inner.score_index.insert(entry.score_key());
        inner.entries.insert(txid, entry);

        debug!(count = inner.entries.len(), %txid, "transaction added to mempool");
        Ok(txid)
    }

    /// Number of pooled transactions.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take a read view for the duration of one block assembly.
    pub fn read(&self) -> MempoolView<'_> {
        MempoolView {
            guard: self.inner.read(),
        }
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new()
    }
}

/// A consistent snapshot of the pool, held across one block assembly.
pub struct MempoolView<'a> {
    guard: RwLockReadGuard<'a, PoolInner>,
}

impl MempoolView<'_> {
    /// Entries in ancestor-score order, best fee rate first.
    pub fn by_ancestor_score(&self) -> impl Iterator<Item = &MempoolEntry> + '_ {
        self.guard
            .score_index
            .iter()
            .filter_map(move |key| self.guard.entries.get(&key.txid))
    }

    /// Look up an entry by txid.
    pub fn entry(&self, txid: &Hash256) -> Option<&MempoolEntry> {
        self.guard.entries.get(txid)
    }

    /// Number of pooled transactions.
    pub fn len(&self) -> usize {
        self.guard.entries.len()
    }

    /// Whether the view is empty.
    pub fn is_empty(&self) -> bool {
        self.guard.entries.is_empty()
    }

    /// The transaction, all of its in-pool descendants, transitively.
    /// Includes `txid` itself.
    pub fn calculate_descendants(&self, txid: &Hash256) -> BTreeSet<Hash256> {
        let mut out = BTreeSet::new();
        let mut stack = vec![*txid];
        while let Some(current) = stack.pop() {
            if out.insert(current) {
                if let Some(kids) = self.guard.children.get(&current) {
                    stack.extend(kids.iter().copied());
                }
            }
        }
        out
    }

    /// All in-pool ancestors of `txid`, transitively, without any limits.
    /// Does not include `txid` itself.
    pub fn calculate_ancestors(&self, txid: &Hash256) -> BTreeSet<Hash256> {
        match self.guard.entries.get(txid) {
            Some(entry) => ancestor_closure(&self.guard, &entry.parents),
            None => BTreeSet::new(),
        }
    }
}

fn ancestor_closure(inner: &PoolInner, parents: &BTreeSet<Hash256>) -> BTreeSet<Hash256> {
    let mut out = BTreeSet::new();
    let mut stack: Vec<Hash256> = parents.iter().copied().collect();
    while let Some(current) = stack.pop() {
        if out.insert(current) {
            if let Some(entry) = inner.entries.get(&current) {
                stack.extend(entry.parents.iter().copied());
            }
        }
    }
    out
}
