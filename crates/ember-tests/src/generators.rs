//! Transaction generators for mempool scenarios.

use ember_mempool::Mempool;
use ember_primitives::{sha256d, Amount, Hash256, OutPoint, Script, Transaction, TxIn, TxOut};
use std::sync::Arc;

/// Build a transaction spending the given outpoints. `tag` makes the txid
/// unique; `pad` grows the transaction by roughly that many virtual bytes.
/// Roots (no spends) consume a synthetic confirmed outpoint derived from
/// the tag.
pub fn make_tx(spends: &[(Hash256, u32)], tag: u64, pad: usize) -> Arc<Transaction> {
    let inputs = if spends.is_empty() {
        vec![TxIn::new(OutPoint {
            txid: sha256d(&tag.to_le_bytes()),
            vout: 0,
        })]
    } else {
        spends
            .iter()
            .map(|&(txid, vout)| TxIn::new(OutPoint { txid, vout }))
            .collect()
    };

    let mut marker = Script::new();
    marker.push_slice(&tag.to_le_bytes());

    let mut outputs = vec![
        TxOut {
            value: 10_000,
            script_pubkey: marker,
        },
        TxOut {
            value: 10_000,
            script_pubkey: Script::from_bytes(vec![0x51]),
        },
    ];
    if pad > 0 {
        outputs.push(TxOut {
            value: 0,
            script_pubkey: Script::from_bytes(vec![0x6a; pad]),
        });
    }

    Arc::new(Transaction {
        version: 1,
        inputs,
        outputs,
        lock_time: 0,
    })
}

/// Add a transaction whose fee works out to `rate` lits per virtual byte.
/// Returns the txid.
pub fn add_tx_at_rate(
    pool: &Mempool,
    spends: &[(Hash256, u32)],
    tag: u64,
    pad: usize,
    rate: Amount,
) -> Hash256 {
    let tx = make_tx(spends, tag, pad);
    let fee = rate * tx.vsize() as Amount;
    pool.add(tx, fee, 0).expect("generator txids are unique")
}

/// Add a transaction paying an explicit fee. Returns the txid.
pub fn add_tx_with_fee(
    pool: &Mempool,
    spends: &[(Hash256, u32)],
    tag: u64,
    pad: usize,
    fee: Amount,
) -> Hash256 {
    let tx = make_tx(spends, tag, pad);
    pool.add(tx, fee, 0).expect("generator txids are unique")
}

/// Position of `txid` in a template's transaction list, if included.
pub fn position_of(txids: &[Hash256], txid: &Hash256) -> Option<usize> {
    txids.iter().position(|t| t == txid)
}
