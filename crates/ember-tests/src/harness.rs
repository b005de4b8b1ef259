//! Test harness for integration tests.
//!
//! In-memory stand-ins for the collaborators block production consumes: the
//! chain view, the block-acceptance pipeline, the wallet and the network.

use ember_consensus::{
    BlockIndex, BlockValidation, ChainParams, ChainView, ConsensusError, ConsensusResult,
    DoubleSha256Pow, PowHasher,
};
use ember_mempool::Mempool;
use ember_mining::{
    AssemblerOptions, BlockAssembler, Miner, MinerContext, MiningWallet, NetStatus, ReserveScript,
};
use ember_primitives::{sha256d, Block, BlockHeader, Script};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

/// An in-memory chain with a settable tip.
pub struct MemoryChain {
    tip: RwLock<Arc<BlockIndex>>,
    bits: u32,
    adjusted_time: AtomicI64,
    witness_enabled: AtomicBool,
    tip_reads: AtomicUsize,
    advance_on_later_reads: AtomicBool,
}

impl MemoryChain {
    /// A chain whose tip sits at `height` with the given constant required
    /// work and timestamp.
    pub fn new(height: u32, bits: u32, time: i64) -> Self {
        MemoryChain {
            tip: RwLock::new(Arc::new(Self::index_at(height, time))),
            bits,
            adjusted_time: AtomicI64::new(time),
            witness_enabled: AtomicBool::new(true),
            tip_reads: AtomicUsize::new(0),
            advance_on_later_reads: AtomicBool::new(false),
        }
    }

    fn index_at(height: u32, time: i64) -> BlockIndex {
        BlockIndex {
            height,
            hash: sha256d(&height.to_le_bytes()),
            time,
            median_time_past: time - 600,
        }
    }

    /// Move the tip up one block.
    pub fn advance_tip(&self) {
        let mut tip = self.tip.write();
        let next = Self::index_at(tip.height + 1, tip.time + 150);
        *tip = Arc::new(next);
    }

    /// Make every tip read after the first observe an advanced tip, so an
    /// assembly in progress sees the chain move under it.
    pub fn advance_after_first_read(&self) {
        self.advance_on_later_reads.store(true, Ordering::Relaxed);
    }

    pub fn set_adjusted_time(&self, time: i64) {
        self.adjusted_time.store(time, Ordering::Relaxed);
    }

    pub fn set_witness_enabled(&self, enabled: bool) {
        self.witness_enabled.store(enabled, Ordering::Relaxed);
    }
}

impl ChainView for MemoryChain {
    fn tip(&self) -> Arc<BlockIndex> {
        let reads = self.tip_reads.fetch_add(1, Ordering::Relaxed);
        let tip = self.tip.read().clone();
        if reads > 0 && self.advance_on_later_reads.load(Ordering::Relaxed) {
            return Arc::new(Self::index_at(tip.height + 1, tip.time + 150));
        }
        tip
    }

    fn next_work_required(&self, _tip: &BlockIndex, _header: &BlockHeader) -> u32 {
        self.bits
    }

    fn compute_block_version(&self, _tip: &BlockIndex) -> i32 {
        4
    }

    fn is_witness_enabled(&self, _tip: &BlockIndex) -> bool {
        self.witness_enabled.load(Ordering::Relaxed)
    }

    fn adjusted_time(&self) -> i64 {
        self.adjusted_time.load(Ordering::Relaxed)
    }
}

/// Validation pipeline that records what it is asked to process.
#[derive(Default)]
pub struct RecordingValidation {
    accepted: Mutex<Vec<Block>>,
    reject_validity: AtomicBool,
    reject_submission: AtomicBool,
}

impl RecordingValidation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `test_block_validity` fail.
    pub fn reject_validity(&self) {
        self.reject_validity.store(true, Ordering::Relaxed);
    }

    /// Make `process_new_block` return false.
    pub fn reject_submission(&self) {
        self.reject_submission.store(true, Ordering::Relaxed);
    }

    /// Blocks successfully submitted so far.
    pub fn accepted_count(&self) -> usize {
        self.accepted.lock().len()
    }

    pub fn accepted_blocks(&self) -> Vec<Block> {
        self.accepted.lock().clone()
    }
}

impl BlockValidation for RecordingValidation {
    fn test_block_validity(&self, _block: &Block, _tip: &BlockIndex) -> ConsensusResult<()> {
        if self.reject_validity.load(Ordering::Relaxed) {
            return Err(ConsensusError::BlockInvalid("rejected by test".into()));
        }
        Ok(())
    }

    fn process_new_block(&self, block: &Block, _force_processing: bool) -> bool {
        if self.reject_submission.load(Ordering::Relaxed) {
            return false;
        }
        self.accepted.lock().push(block.clone());
        true
    }
}

struct TestReserveScript {
    script: Script,
    kept: Arc<AtomicUsize>,
}

impl ReserveScript for TestReserveScript {
    fn script(&self) -> &Script {
        &self.script
    }

    fn keep_script(&self) {
        self.kept.fetch_add(1, Ordering::Relaxed);
    }
}

/// Wallet with either a fixed script to hand out or an empty keypool.
pub struct KeypoolWallet {
    script: Option<Script>,
    kept: Arc<AtomicUsize>,
}

impl KeypoolWallet {
    /// A wallet that always reserves the same pay-to-anything script.
    pub fn with_script() -> Self {
        let mut script = Script::new();
        script.push_opcode(0x51); // OP_1, anyone-can-spend
        KeypoolWallet {
            script: Some(script),
            kept: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A wallet whose keypool has run dry.
    pub fn empty() -> Self {
        KeypoolWallet {
            script: None,
            kept: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// How many reservations were committed.
    pub fn kept_count(&self) -> usize {
        self.kept.load(Ordering::Relaxed)
    }

    /// The script this wallet reserves.
    pub fn script(&self) -> Script {
        self.script.clone().unwrap_or_default()
    }
}

impl MiningWallet for KeypoolWallet {
    fn get_script_for_mining(&self) -> Option<Box<dyn ReserveScript>> {
        let script = self.script.clone()?;
        Some(Box::new(TestReserveScript {
            script,
            kept: Arc::clone(&self.kept),
        }))
    }
}

/// Network status with settable readiness.
pub struct StubNet {
    peers: AtomicUsize,
    initial_download: AtomicBool,
}

impl StubNet {
    /// A connected node past initial block download.
    pub fn ready() -> Self {
        StubNet {
            peers: AtomicUsize::new(1),
            initial_download: AtomicBool::new(false),
        }
    }

    /// A node with no peers yet.
    pub fn offline() -> Self {
        StubNet {
            peers: AtomicUsize::new(0),
            initial_download: AtomicBool::new(true),
        }
    }

    pub fn set_peers(&self, peers: usize) {
        self.peers.store(peers, Ordering::Relaxed);
    }

    pub fn set_initial_download(&self, initial_download: bool) {
        self.initial_download
            .store(initial_download, Ordering::Relaxed);
    }
}

impl NetStatus for StubNet {
    fn node_count(&self) -> usize {
        self.peers.load(Ordering::Relaxed)
    }

    fn is_initial_block_download(&self) -> bool {
        self.initial_download.load(Ordering::Relaxed)
    }
}

/// A bundle of collaborators wired together for one test.
pub struct TestNode {
    pub chain: Arc<MemoryChain>,
    pub pool: Arc<Mempool>,
    pub validation: Arc<RecordingValidation>,
    pub wallet: Arc<KeypoolWallet>,
    pub net: Arc<StubNet>,
    pub params: Arc<ChainParams>,
    pub pow: Arc<dyn PowHasher>,
}

impl TestNode {
    /// A regtest node at height 100 with the cheap double-SHA256 hash
    /// strategy, ready to mine.
    pub fn regtest() -> Self {
        TestNode {
            chain: Arc::new(MemoryChain::new(100, 0x207f_ffff, 1_700_000_000)),
            pool: Arc::new(Mempool::new()),
            validation: Arc::new(RecordingValidation::new()),
            wallet: Arc::new(KeypoolWallet::with_script()),
            net: Arc::new(StubNet::ready()),
            params: Arc::new(ChainParams::regtest()),
            pow: Arc::new(DoubleSha256Pow),
        }
    }

    /// A mainnet-rules node (no mine-on-demand). The target is hard enough
    /// that test workers never stumble into a solution.
    pub fn mainnet_rules() -> Self {
        TestNode {
            chain: Arc::new(MemoryChain::new(100, 0x1200_ffff, 1_700_000_000)),
            params: Arc::new(ChainParams::mainnet()),
            ..Self::regtest()
        }
    }

    /// The collaborator handles as the miner consumes them.
    pub fn context(&self) -> MinerContext {
        MinerContext {
            chain: self.chain.clone(),
            pool: self.pool.clone(),
            validation: self.validation.clone(),
            wallet: self.wallet.clone(),
            net: self.net.clone(),
            pow: self.pow.clone(),
            params: self.params.clone(),
        }
    }

    /// A fresh assembler over this node's collaborators.
    pub fn assembler(&self, options: AssemblerOptions) -> BlockAssembler {
        BlockAssembler::new(
            self.chain.clone(),
            self.pool.clone(),
            self.validation.clone(),
            self.params.clone(),
            options,
        )
    }

    /// A miner supervisor over this node's collaborators.
    pub fn miner(&self, options: AssemblerOptions) -> Miner {
        Miner::new(self.context(), options)
    }

    /// The wallet's coinbase script.
    pub fn coinbase_script(&self) -> Script {
        self.wallet.script()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_chain_tip_identity() {
        let chain = MemoryChain::new(100, 0x207f_ffff, 1_700_000_000);
        let before = chain.tip();
        chain.advance_tip();
        let after = chain.tip();
        assert_eq!(after.height, before.height + 1);
        assert_ne!(after.hash, before.hash);
    }

    #[test]
    fn test_memory_chain_staleness_hook() {
        let chain = MemoryChain::new(100, 0x207f_ffff, 1_700_000_000);
        chain.advance_after_first_read();
        let first = chain.tip();
        let second = chain.tip();
        assert_ne!(first.hash, second.hash);
    }

    #[test]
    fn test_empty_wallet_reserves_nothing() {
        assert!(KeypoolWallet::empty().get_script_for_mining().is_none());
        assert!(KeypoolWallet::with_script()
            .get_script_for_mining()
            .is_some());
    }
}
