//! Transactions and their consensus serialization.

use crate::hash::{sha256d, Hash256};
use crate::script::Script;
use crate::{Amount, WITNESS_SCALE_FACTOR};

/// Sequence number that opts out of lock-time enforcement.
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

/// A reference to an output of a previous transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutPoint {
    /// The id of the transaction holding the output.
    pub txid: Hash256,
    /// The output index.
    pub vout: u32,
}

impl OutPoint {
    /// The null outpoint used by coinbase inputs.
    pub fn null() -> Self {
        OutPoint {
            txid: Hash256::ZERO,
            vout: u32::MAX,
        }
    }

    /// Whether this is the coinbase null outpoint.
    pub fn is_null(&self) -> bool {
        self.txid.is_zero() && self.vout == u32::MAX
    }
}

/// A transaction input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxIn {
    pub previous_output: OutPoint,
    pub script_sig: Script,
    pub sequence: u32,
    /// Witness stack; empty for non-witness inputs.
    pub witness: Vec<Vec<u8>>,
}

impl TxIn {
    /// An input spending `previous_output` with an empty script.
    pub fn new(previous_output: OutPoint) -> Self {
        TxIn {
            previous_output,
            script_sig: Script::new(),
            sequence: SEQUENCE_FINAL,
            witness: Vec::new(),
        }
    }
}

/// A transaction output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOut {
    pub value: Amount,
    pub script_pubkey: Script,
}

/// A transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    /// The transaction id: double SHA-256 of the non-witness serialization.
    pub fn txid(&self) -> Hash256 {
        sha256d(&self.serialize(false))
    }

    /// The witness transaction id.
    pub fn wtxid(&self) -> Hash256 {
        sha256d(&self.serialize(true))
    }

    /// Whether any input carries witness data.
    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(|input| !input.witness.is_empty())
    }

    /// Whether this is a coinbase transaction.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].previous_output.is_null()
    }

    /// Serialized size without witness data.
    pub fn base_size(&self) -> usize {
        self.serialize(false).len()
    }

    /// Serialized size including witness data.
    pub fn total_size(&self) -> usize {
        self.serialize(true).len()
    }

    /// Block weight: non-witness bytes count four, witness bytes count one.
    pub fn weight(&self) -> u64 {
        self.base_size() as u64 * (WITNESS_SCALE_FACTOR - 1) + self.total_size() as u64
    }

    /// Virtual size: weight rounded up to whole weight-factor units.
    pub fn vsize(&self) -> u64 {
        (self.weight() + WITNESS_SCALE_FACTOR - 1) / WITNESS_SCALE_FACTOR
    }

    /// Consensus serialization. With `include_witness`, witness-bearing
    /// transactions use the extended (marker + flag) format.
    pub fn serialize(&self, include_witness: bool) -> Vec<u8> {
        let serialize_witness = include_witness && self.has_witness();
        let mut buf = Vec::with_capacity(64 + self.inputs.len() * 64);

        buf.extend_from_slice(&self.version.to_le_bytes());
        if serialize_witness {
            buf.push(0x00); // marker
            buf.push(0x01); // flag
        }

        write_compact_size(&mut buf, self.inputs.len() as u64);
        for input in &self.inputs {
            buf.extend_from_slice(input.previous_output.txid.as_bytes());
            buf.extend_from_slice(&input.previous_output.vout.to_le_bytes());
            write_compact_size(&mut buf, input.script_sig.len() as u64);
            buf.extend_from_slice(input.script_sig.as_bytes());
            buf.extend_from_slice(&input.sequence.to_le_bytes());
        }

        write_compact_size(&mut buf, self.outputs.len() as u64);
        for output in &self.outputs {
            buf.extend_from_slice(&output.value.to_le_bytes());
            write_compact_size(&mut buf, output.script_pubkey.len() as u64);
            buf.extend_from_slice(output.script_pubkey.as_bytes());
        }

        if serialize_witness {
            for input in &self.inputs {
                write_compact_size(&mut buf, input.witness.len() as u64);
                for item in &input.witness {
                    write_compact_size(&mut buf, item.len() as u64);
                    buf.extend_from_slice(item);
                }
            }
        }

        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        buf
    }
}

/// Variable-length integer used throughout the wire encoding.
fn write_compact_size(buf: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => buf.push(n as u8),
        0xfd..=0xffff => {
            buf.push(0xfd);
            buf.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            buf.push(0xfe);
            buf.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xff);
            buf.extend_from_slice(&n.to_le_bytes());
        }
    }
}
