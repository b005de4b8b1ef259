//! Merkle roots and the coinbase witness commitment.

use ember_primitives::{sha256d, Block, Hash256, Script, TxOut};
use std::sync::Arc;

/// Bytes identifying a witness-commitment output.
pub const WITNESS_COMMITMENT_HEADER: [u8; 4] = [0xaa, 0x21, 0xa9, 0xed];

/// Merkle root over a list of hashes. Odd levels duplicate their last entry.
pub fn merkle_root(hashes: &[Hash256]) -> Hash256 {
    if hashes.is_empty() {
        return Hash256::ZERO;
    }
    let mut level: Vec<Hash256> = hashes.to_vec();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            let last = level[level.len() - 1];
            level.push(last);
        }
        level = level
            .chunks(2)
            .map(|pair| {
                let mut data = [0u8; 64];
                data[..32].copy_from_slice(pair[0].as_bytes());
                data[32..].copy_from_slice(pair[1].as_bytes());
                sha256d(&data)
            })
            .collect();
    }
    level[0]
}

/// Merkle root over the block's transaction ids.
pub fn block_merkle_root(block: &Block) -> Hash256 {
    let txids: Vec<Hash256> = block.txdata.iter().map(|tx| tx.txid()).collect();
    merkle_root(&txids)
}

/// Merkle root over witness transaction ids; the coinbase contributes the
/// zero hash.
pub fn block_witness_merkle_root(block: &Block) -> Hash256 {
    let wtxids: Vec<Hash256> = block
        .txdata
        .iter()
        .enumerate()
        .map(|(i, tx)| if i == 0 { Hash256::ZERO } else { tx.wtxid() })
        .collect();
    merkle_root(&wtxids)
}

/// Compute the witness commitment for `block`, append the commitment output
/// to its coinbase, and return the commitment script bytes.
pub fn generate_coinbase_commitment(block: &mut Block) -> Vec<u8> {
    let witness_root = block_witness_merkle_root(block);
    let witness_nonce = [0u8; 32];

    let mut preimage = [0u8; 64];
    preimage[..32].copy_from_slice(witness_root.as_bytes());
    preimage[32..].copy_from_slice(&witness_nonce);
    let commitment = sha256d(&preimage);

    let mut script_bytes = Vec::with_capacity(38);
    script_bytes.push(0x6a); // OP_RETURN
    script_bytes.push(36);
    script_bytes.extend_from_slice(&WITNESS_COMMITMENT_HEADER);
    script_bytes.extend_from_slice(commitment.as_bytes());

    let mut coinbase = (*block.txdata[0]).clone();
    coinbase.outputs.push(TxOut {
        value: 0,
        script_pubkey: Script::from_bytes(script_bytes.clone()),
    });
    block.txdata[0] = Arc::new(coinbase);

    script_bytes
}
