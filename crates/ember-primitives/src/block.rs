//! Blocks and block headers.

use crate::hash::{sha256d, Hash256};
use crate::transaction::Transaction;
use std::sync::Arc;

/// Serialized size of a block header.
pub const BLOCK_HEADER_SIZE: usize = 80;

/// An 80-byte block header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct BlockHeader {
    pub version: i32,
    pub prev_blockhash: Hash256,
    pub merkle_root: Hash256,
    pub time: u32,
    pub bits: u32,
    pub nonce: u32,
}

impl BlockHeader {
    /// The 80-byte wire serialization hashed by proof of work.
    pub fn serialize(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let mut buf = [0u8; BLOCK_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.version.to_le_bytes());
        buf[4..36].copy_from_slice(self.prev_blockhash.as_bytes());
        buf[36..68].copy_from_slice(self.merkle_root.as_bytes());
        buf[68..72].copy_from_slice(&self.time.to_le_bytes());
        buf[72..76].copy_from_slice(&self.bits.to_le_bytes());
        buf[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        buf
    }

    /// The block hash (double SHA-256 of the header).
    pub fn hash(&self) -> Hash256 {
        sha256d(&self.serialize())
    }
}

/// A block: header plus ordered transactions, coinbase first.
#[derive(Clone, Debug)]
pub struct Block {
    pub header: BlockHeader,
    pub txdata: Vec<Arc<Transaction>>,
}

impl Block {
    /// The coinbase transaction, if the block has any transactions.
    pub fn coinbase(&self) -> Option<&Transaction> {
        self.txdata.first().map(|tx| tx.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_serialization_is_80_bytes() {
        let header = BlockHeader {
            version: 4,
            prev_blockhash: sha256d(b"prev"),
            merkle_root: sha256d(b"root"),
            time: 1_700_000_000,
            bits: 0x1e0f_ffff,
            nonce: 42,
        };
        let bytes = header.serialize();
        assert_eq!(bytes.len(), BLOCK_HEADER_SIZE);
        assert_eq!(&bytes[0..4], &4i32.to_le_bytes());
        assert_eq!(&bytes[76..80], &42u32.to_le_bytes());
    }

    #[test]
    fn test_hash_depends_on_nonce() {
        let mut header = BlockHeader::default();
        let h0 = header.hash();
        header.nonce = 1;
        assert_ne!(header.hash(), h0);
    }
}
