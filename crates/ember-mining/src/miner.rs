//! The internal miner.
//!
//! The supervisor owns a set of worker threads. Each worker repeatedly
//! assembles a fresh template on top of the current tip, scans nonces for a
//! scrypt hash under the target, and submits solutions back through the
//! node's block-acceptance pipeline. Workers are cancelled cooperatively and
//! joined before a new set is started.

use crate::assembler::{update_time, AssemblerOptions, BlockAssembler, BlockTemplate};
use crate::error::{MiningError, MiningResult};
use crate::solver::scan_pow_hash;
use crate::MAX_COINBASE_SCRIPT_SIG_SIZE;
use ember_consensus::{
    block_merkle_root, compact_to_target, hash_meets_target, BlockIndex, BlockValidation,
    ChainParams, ChainView, PowHasher,
};
use ember_mempool::Mempool;
use ember_primitives::{format_money, Block, Hash256, Script};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// A coinbase script reserved from the wallet. Dropping the reservation
/// without calling [`ReserveScript::keep_script`] returns the script to the
/// keypool.
pub trait ReserveScript: Send {
    /// The script the coinbase pays to.
    fn script(&self) -> &Script;

    /// Commit the reservation after a block paying to the script was
    /// submitted.
    fn keep_script(&self);
}

/// The wallet as the miner consumes it.
pub trait MiningWallet: Send + Sync {
    /// Reserve a script to mine to. `None` when the wallet has nothing to
    /// offer (e.g. the keypool ran dry).
    fn get_script_for_mining(&self) -> Option<Box<dyn ReserveScript>>;
}

/// Network readiness as the miner consumes it.
pub trait NetStatus: Send + Sync {
    /// Number of connected peers.
    fn node_count(&self) -> usize;

    /// Whether the node is still in initial block download.
    fn is_initial_block_download(&self) -> bool;
}

/// Everything a mining worker needs from the rest of the node.
#[derive(Clone)]
pub struct MinerContext {
    pub chain: Arc<dyn ChainView>,
    pub pool: Arc<Mempool>,
    pub validation: Arc<dyn BlockValidation>,
    pub wallet: Arc<dyn MiningWallet>,
    pub net: Arc<dyn NetStatus>,
    pub pow: Arc<dyn PowHasher>,
    pub params: Arc<ChainParams>,
}

struct WorkerSet {
    cancel: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

/// Supervisor for the internal mining threads.
pub struct Miner {
    context: MinerContext,
    options: AssemblerOptions,
    workers: Mutex<Option<WorkerSet>>,
}

impl Miner {
    pub fn new(context: MinerContext, options: AssemblerOptions) -> Self {
        Miner {
            context,
            options,
            workers: Mutex::new(None),
        }
    }

    /// Start or stop mining. Any existing workers are always interrupted and
    /// joined first. `threads < 0` means one worker per physical core;
    /// `enable = false` or `threads = 0` leaves mining stopped.
    pub fn generate(&self, enable: bool, threads: i32) {
        let mut slot = self.workers.lock();

        if let Some(set) = slot.take() {
            set.cancel.store(true, Ordering::Relaxed);
            for handle in set.handles {
                let _ = handle.join();
            }
            info!("mining workers stopped");
        }

        let threads = if threads < 0 {
            num_cpus::get_physical() as i32
        } else {
            threads
        };

        if !enable || threads == 0 {
            return;
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let handles = (0..threads)
            .map(|worker_id| {
                let context = self.context.clone();
                let options = self.options.clone();
                let cancel = Arc::clone(&cancel);
                thread::Builder::new()
                    .name(format!("ember-miner-{worker_id}"))
                    .spawn(move || worker_main(worker_id as usize, context, options, cancel))
                    .expect("failed to spawn mining worker thread")
            })
            .collect();

        *slot = Some(WorkerSet { cancel, handles });
        info!(threads, "mining workers started");
    }

    /// Stop mining and join all workers.
    pub fn stop(&self) {
        self.generate(false, 0);
    }

    /// Number of worker threads currently managed.
    pub fn mining_thread_count(&self) -> usize {
        self.workers
            .lock()
            .as_ref()
            .map(|set| set.handles.len())
            .unwrap_or(0)
    }
}

fn worker_main(
    worker_id: usize,
    context: MinerContext,
    options: AssemblerOptions,
    cancel: Arc<AtomicBool>,
) {
    info!(worker = worker_id, "miner started");
    match worker_loop(worker_id, &context, &options, &cancel) {
        Ok(()) => info!(worker = worker_id, "miner finished"),
        Err(MiningError::Interrupted) => info!(worker = worker_id, "miner interrupted"),
        Err(MiningError::NoCoinbaseScript) => {
            warn!(
                worker = worker_id,
                "no coinbase script available, keypool may need a refill before restarting mining"
            );
        }
        Err(e) => error!(worker = worker_id, error = %e, "miner stopped on error"),
    }
}

fn worker_loop(
    worker_id: usize,
    context: &MinerContext,
    options: &AssemblerOptions,
    cancel: &AtomicBool,
) -> MiningResult<()> {
    let reserved = context
        .wallet
        .get_script_for_mining()
        .ok_or(MiningError::NoCoinbaseScript)?;
    if reserved.script().is_empty() {
        return Err(MiningError::NoCoinbaseScript);
    }

    let mut rng = StdRng::from_entropy();
    let worker_began = Instant::now();
    let mut all_hashes: u64 = 0;

    // Extra-nonce state is per worker and resets whenever the previous
    // block hash changes.
    let mut extra_nonce: u32 = 0;
    let mut last_prev_hash = Hash256::ZERO;

    loop {
        // Wait for the network so we don't mine on an obsolete chain.
        while context.net.node_count() == 0 || context.net.is_initial_block_download() {
            if cancel.load(Ordering::Relaxed) {
                return Err(MiningError::Interrupted);
            }
            thread::sleep(Duration::from_secs(1));
        }
        if cancel.load(Ordering::Relaxed) {
            return Err(MiningError::Interrupted);
        }

        //
        // Create a new block
        //
        let tip = context.chain.tip();
        let mut assembler = BlockAssembler::new(
            Arc::clone(&context.chain),
            Arc::clone(&context.pool),
            Arc::clone(&context.validation),
            Arc::clone(&context.params),
            options.clone(),
        );
        let mut template: BlockTemplate =
            match assembler.create_new_block(reserved.script(), true) {
                Ok(template) => template,
                Err(MiningError::StaleTip) => continue,
                Err(e) => return Err(e),
            };

        increment_extra_nonce(
            &mut template.block,
            &tip,
            &context.params,
            &mut extra_nonce,
            &mut last_prev_hash,
        );

        //
        // Search
        //
        let mut hashes_scanned: u64 = 0;
        let scan_began = Instant::now();
        let mut target = compact_to_target(template.block.header.bits);
        let mut hash = Hash256::ZERO;
        let mut nonce: u32 = rng.gen();

        info!(
            worker = worker_id,
            txs = template.block.txdata.len(),
            height = tip.height + 1,
            "searching for proof of work, initial nonce {nonce:#x}"
        );

        loop {
            if scan_pow_hash(
                context.pow.as_ref(),
                &template.block.header,
                &mut nonce,
                &target,
                &mut hash,
                &mut hashes_scanned,
            ) {
                if hash_meets_target(&hash, &target) {
                    // Found a solution
                    template.block.header.nonce = nonce;
                    let precise = context.pow.pow_hash(&template.block.header);
                    if precise != hash {
                        error!(
                            worker = worker_id,
                            scanned = %hash,
                            block = %precise,
                            "scanned hash does not reproduce on the block header"
                        );
                        return Err(MiningError::HashMismatch);
                    }

                    info!(
                        worker = worker_id,
                        hash = %hash,
                        "proof of work found with nonce {nonce:#x}"
                    );

                    process_block_found(&template.block, context);
                    reserved.keep_script();

                    // For regression testing, stop mining after a block is found
                    if context.params.mine_blocks_on_demand {
                        return Err(MiningError::Interrupted);
                    }
                    break;
                }
                // Candidate failed the precise comparison; start elsewhere.
                nonce = rng.gen();
            }

            if cancel.load(Ordering::Relaxed) {
                return Err(MiningError::Interrupted);
            }

            // Rebuild the block if the chain moved on.
            if context.chain.tip().hash != tip.hash {
                break;
            }

            // Recreate the block if the clock has run backwards, to get the
            // actual time.
            if update_time(
                &mut template.block.header,
                &context.params,
                &tip,
                context.chain.as_ref(),
            ) < 0
            {
                break;
            }

            if context.params.allow_min_difficulty_blocks {
                // Changing the header time can change the work required
                target = compact_to_target(template.block.header.bits);
            }
        }

        all_hashes += hashes_scanned;
        let scan_rate = hashes_scanned as f64 / scan_began.elapsed().as_secs_f64().max(1e-9);
        let total_rate = all_hashes as f64 / worker_began.elapsed().as_secs_f64().max(1e-9);
        info!(
            worker = worker_id,
            scanned = hashes_scanned,
            total = all_hashes,
            "scan finished at {scan_rate:.3} hash/s ({total_rate:.3} hash/s overall)"
        );
    }
}

/// Rebuild the coinbase script signature as `height || extra_nonce ||
/// coinbase_flags` and refresh the header's merkle root. The extra nonce
/// expands the search space beyond the 32-bit header nonce; it resets
/// whenever the previous block hash changes.
pub fn increment_extra_nonce(
    block: &mut Block,
    prev: &BlockIndex,
    params: &ChainParams,
    extra_nonce: &mut u32,
    last_prev_hash: &mut Hash256,
) {
    if *last_prev_hash != block.header.prev_blockhash {
        *extra_nonce = 0;
        *last_prev_hash = block.header.prev_blockhash;
    }
    *extra_nonce += 1;

    // Height first in the coinbase, required since block version 2
    let height = prev.height + 1;
    let mut script_sig = Script::new();
    script_sig.push_int(height as i64);
    script_sig.push_int(*extra_nonce as i64);
    script_sig.extend(&params.coinbase_flags);
    assert!(script_sig.len() <= MAX_COINBASE_SCRIPT_SIG_SIZE);

    let mut coinbase = (*block.txdata[0]).clone();
    coinbase.inputs[0].script_sig = script_sig;
    block.txdata[0] = Arc::new(coinbase);
    block.header.merkle_root = block_merkle_root(block);
}

/// Submit a found block. A solution whose previous-block hash no longer
/// matches the tip is stale: logged and discarded without error. Rejection
/// by the acceptance pipeline is likewise logged only.
pub fn process_block_found(block: &Block, context: &MinerContext) -> bool {
    let reward = block
        .coinbase()
        .and_then(|coinbase| coinbase.outputs.first())
        .map(|output| output.value)
        .unwrap_or(0);
    info!(generated = %format_money(reward), hash = %block.header.hash(), "block found");

    let tip = context.chain.tip();
    if block.header.prev_blockhash != tip.hash {
        warn!(
            block_prev = %block.header.prev_blockhash,
            tip = %tip.hash,
            "generated block is stale"
        );
        return false;
    }

    // Process this block the same as if it were received from another node
    if !context.validation.process_new_block(block, true) {
        warn!("generated block was not accepted");
        return false;
    }
    debug!(height = tip.height + 1, "generated block submitted");
    true
}
