//! The modified-score overlay used during package selection.
//!
//! The mempool's ancestor aggregates go stale the moment an ancestor is
//! placed into the block under assembly. Rather than mutating the shared
//! pool, the assembler keeps this per-template overlay: for every
//! not-yet-included descendant of an included transaction it records the
//! aggregates minus the contributions of everything already in the block.

use ember_mempool::{AncestorScore, MempoolEntry, MempoolView};
use ember_primitives::{Amount, Hash256};
use std::collections::{BTreeSet, HashMap};

/// Overlay record for one entry whose mempool aggregates are stale.
#[derive(Clone, Copy, Debug)]
pub struct ModifiedEntry {
    pub txid: Hash256,
    pub size_with_ancestors: u64,
    pub mod_fees_with_ancestors: Amount,
    pub sigops_with_ancestors: i64,
}

impl ModifiedEntry {
    fn from_entry(entry: &MempoolEntry) -> Self {
        ModifiedEntry {
            txid: entry.txid(),
            size_with_ancestors: entry.size_with_ancestors,
            mod_fees_with_ancestors: entry.mod_fees_with_ancestors,
            sigops_with_ancestors: entry.sigops_with_ancestors,
        }
    }

    /// Ordering key over the overlay aggregates.
    pub fn score_key(&self) -> AncestorScore {
        AncestorScore {
            fees: self.mod_fees_with_ancestors,
            size: self.size_with_ancestors,
            txid: self.txid,
        }
    }
}

/// Overlay entries keyed by txid with a secondary score-ordered view. Both
/// views are updated together on every mutation.
#[derive(Default)]
pub struct ModifiedTxSet {
    by_txid: HashMap<Hash256, ModifiedEntry>,
    by_score: BTreeSet<AncestorScore>,
}

impl ModifiedTxSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the overlay holds an entry for `txid`.
    pub fn contains(&self, txid: &Hash256) -> bool {
        self.by_txid.contains_key(txid)
    }

    /// The overlay entry with the best ancestor fee rate.
    pub fn best(&self) -> Option<ModifiedEntry> {
        self.by_score
            .iter()
            .next()
            .and_then(|key| self.by_txid.get(&key.txid))
            .copied()
    }

    /// Drop the overlay entry for `txid`, if present.
    pub fn remove(&mut self, txid: &Hash256) -> bool {
        match self.by_txid.remove(txid) {
            Some(entry) => {
                self.by_score.remove(&entry.score_key());
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_txid.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_txid.len()
    }

    /// Refresh the overlay after `added` went into the block: every in-pool
    /// descendant outside `added` has the newly included transaction's
    /// individual size, modified fee and sig-op cost subtracted from its
    /// aggregates. Returns the number of descendant updates performed.
    pub fn update_for_added(&mut self, view: &MempoolView, added: &BTreeSet<Hash256>) -> usize {
        let mut descendants_updated = 0;
        for txid in added {
            let Some(added_entry) = view.entry(txid) else {
                continue;
            };
            for descendant in view.calculate_descendants(txid) {
                if added.contains(&descendant) {
                    continue;
                }
                descendants_updated += 1;
                if let Some(mut modified) = self.by_txid.remove(&descendant) {
                    self.by_score.remove(&modified.score_key());
                    modified.size_with_ancestors -= added_entry.tx_size;
                    modified.mod_fees_with_ancestors -= added_entry.modified_fee;
                    modified.sigops_with_ancestors -= added_entry.sigop_cost;
                    self.by_score.insert(modified.score_key());
                    self.by_txid.insert(descendant, modified);
                } else if let Some(entry) = view.entry(&descendant) {
                    let mut modified = ModifiedEntry::from_entry(entry);
                    modified.size_with_ancestors -= added_entry.tx_size;
                    modified.mod_fees_with_ancestors -= added_entry.modified_fee;
                    modified.sigops_with_ancestors -= added_entry.sigop_cost;
                    self.by_score.insert(modified.score_key());
                    self.by_txid.insert(descendant, modified);
                }
            }
        }
        descendants_updated
    }
}
