//! Transaction-level consensus checks used during block assembly.

use crate::params::LOCKTIME_THRESHOLD;
use ember_primitives::{Transaction, SEQUENCE_FINAL};

/// Whether `tx` is final for a block at `block_height` whose lock-time
/// cutoff is `block_time`.
pub fn is_final_tx(tx: &Transaction, block_height: u32, block_time: i64) -> bool {
    if tx.lock_time == 0 {
        return true;
    }
    let cutoff = if tx.lock_time < LOCKTIME_THRESHOLD {
        block_height as i64
    } else {
        block_time
    };
    if (tx.lock_time as i64) < cutoff {
        return true;
    }
    tx.inputs.iter().all(|input| input.sequence == SEQUENCE_FINAL)
}

/// Legacy signature-operation count over all input and output scripts.
pub fn legacy_sigop_count(tx: &Transaction) -> i64 {
    let inputs: i64 = tx.inputs.iter().map(|i| i.script_sig.sigop_count()).sum();
    let outputs: i64 = tx
        .outputs
        .iter()
        .map(|o| o.script_pubkey.sigop_count())
        .sum();
    inputs + outputs
}
