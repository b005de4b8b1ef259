//! Ancestor fee-rate ordering.

use ember_primitives::{Amount, Hash256};
use std::cmp::Ordering;

/// Ordering key over ancestor aggregates: higher
/// `fees / size` sorts first, ties broken by txid.
///
/// Rates are compared by cross-multiplication so the ordering is exact and
/// never passes through floating point.
#[derive(Clone, Copy, Debug)]
pub struct AncestorScore {
    /// Modified fees including ancestors.
    pub fees: Amount,
    /// Size including ancestors, in virtual bytes.
    pub size: u64,
    /// The entry's txid.
    pub txid: Hash256,
}

impl PartialEq for AncestorScore {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for AncestorScore {}

impl Ord for AncestorScore {
    fn cmp(&self, other: &Self) -> Ordering {
        // self.fees/self.size > other.fees/other.size
        //   <=> self.fees * other.size > other.fees * self.size
        let lhs = self.fees as i128 * other.size as i128;
        let rhs = other.fees as i128 * self.size as i128;
        // Reversed so the best rate comes first in a BTreeSet
        rhs.cmp(&lhs).then_with(|| self.txid.cmp(&other.txid))
    }
}

impl PartialOrd for AncestorScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
