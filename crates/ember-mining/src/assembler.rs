//! Block template assembly.
//!
//! Transactions are selected from the mempool by the fee rate of a
//! transaction combined with all of its unconfirmed ancestors. Selected
//! transactions are not removed from the pool, so as packages land in the
//! block the remaining descendants' cached ancestor aggregates go stale;
//! the [`ModifiedTxSet`] overlay carries the corrected values and each loop
//! iteration picks the better of the next pool entry and the best overlay
//! entry.

use crate::error::{MiningError, MiningResult};
use crate::scorer::ModifiedTxSet;
use ember_consensus::{
    generate_coinbase_commitment, get_block_subsidy, is_final_tx, legacy_sigop_count,
    BlockIndex, BlockValidation, ChainParams, ChainView, DEFAULT_BLOCK_MAX_WEIGHT,
    DEFAULT_BLOCK_MIN_TX_FEE, MAX_BLOCK_SIGOPS_COST, MAX_BLOCK_WEIGHT, WITNESS_SCALE_FACTOR,
};
use ember_mempool::{Mempool, MempoolView};
use ember_primitives::{
    opcodes, Amount, Block, BlockHeader, FeeRate, Hash256, OutPoint, Script, Transaction, TxIn,
    TxOut, SEQUENCE_FINAL,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Transaction count of the most recently assembled block. Telemetry only;
/// readers see eventually consistent values.
pub static LAST_BLOCK_TX: AtomicU64 = AtomicU64::new(0);

/// Weight of the most recently assembled block. Telemetry only.
pub static LAST_BLOCK_WEIGHT: AtomicU64 = AtomicU64::new(0);

/// Assembly configuration.
#[derive(Clone, Debug)]
pub struct AssemblerOptions {
    /// Weight budget for the assembled block, clamped at construction to
    /// `[4000, MAX_BLOCK_WEIGHT - 4000]`.
    pub max_weight: u64,
    /// Packages below this ancestor fee rate are never included.
    pub min_fee_rate: FeeRate,
    /// Override for the advertised block version; honored only on networks
    /// that mine blocks on demand.
    pub block_version_override: Option<i32>,
    /// Log the fee rate and txid of every included transaction.
    pub print_priority: bool,
    /// Give up on selection after this many consecutive package failures
    /// once the block is nearly full.
    pub max_consecutive_failures: u32,
    /// "Nearly full" means less than this much weight budget remains.
    pub near_full_weight_margin: u64,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        AssemblerOptions {
            max_weight: DEFAULT_BLOCK_MAX_WEIGHT,
            min_fee_rate: FeeRate::from_lits_per_kvb(DEFAULT_BLOCK_MIN_TX_FEE),
            block_version_override: None,
            print_priority: false,
            max_consecutive_failures: 1_000,
            near_full_weight_margin: 4_000,
        }
    }
}

/// A fully assembled candidate block.
#[derive(Clone, Debug)]
pub struct BlockTemplate {
    /// The block: coinbase first, then the selected transactions in
    /// dependency order.
    pub block: Block,
    /// Per-transaction fees; `fees[0]` is the negated total so the coinbase
    /// "consumes" them.
    pub fees: Vec<Amount>,
    /// Per-transaction signature-operation costs.
    pub sigops: Vec<i64>,
    /// The witness commitment script bytes.
    pub coinbase_commitment: Vec<u8>,
}

/// Assembles one block template per call to [`BlockAssembler::create_new_block`].
pub struct BlockAssembler {
    chain: Arc<dyn ChainView>,
    pool: Arc<Mempool>,
    validation: Arc<dyn BlockValidation>,
    params: Arc<ChainParams>,
    options: AssemblerOptions,

    // Per-template state, reset at the start of each assembly.
    in_block: BTreeSet<Hash256>,
    block_weight: u64,
    block_sigops: i64,
    block_fees: Amount,
    block_tx: u64,
    height: u32,
    locktime_cutoff: i64,
    include_witness: bool,
}

impl BlockAssembler {
    pub fn new(
        chain: Arc<dyn ChainView>,
        pool: Arc<Mempool>,
        validation: Arc<dyn BlockValidation>,
        params: Arc<ChainParams>,
        mut options: AssemblerOptions,
    ) -> Self {
        // Limit weight to between 4K and MAX_BLOCK_WEIGHT - 4K for sanity
        options.max_weight = options.max_weight.clamp(4_000, MAX_BLOCK_WEIGHT - 4_000);
        BlockAssembler {
            chain,
            pool,
            validation,
            params,
            options,
            in_block: BTreeSet::new(),
            block_weight: 0,
            block_sigops: 0,
            block_fees: 0,
            block_tx: 0,
            height: 0,
            locktime_cutoff: 0,
            include_witness: false,
        }
    }

    /// The effective options after clamping.
    pub fn options(&self) -> &AssemblerOptions {
        &self.options
    }

    fn reset(&mut self) {
        self.in_block.clear();

        // Reserve space for the coinbase transaction
        self.block_weight = 4_000;
        self.block_sigops = 400;
        self.include_witness = false;

        // These counters do not include the coinbase
        self.block_tx = 0;
        self.block_fees = 0;
    }

    /// Assemble a block template paying out to `coinbase_script`.
    ///
    /// On success the template has passed the node's block validity check.
    pub fn create_new_block(
        &mut self,
        coinbase_script: &Script,
        include_witness_requested: bool,
    ) -> MiningResult<BlockTemplate> {
        if coinbase_script.is_empty() {
            return Err(MiningError::NoCoinbaseScript);
        }

        let assembly_started = Instant::now();
        self.reset();

        let mut template = BlockTemplate {
            block: Block {
                header: BlockHeader::default(),
                txdata: Vec::new(),
            },
            fees: Vec::new(),
            sigops: Vec::new(),
            coinbase_commitment: Vec::new(),
        };

        // Dummy coinbase as the first transaction, filled in at the end
        template.block.txdata.push(Arc::new(Transaction {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }));
        template.fees.push(-1);
        template.sigops.push(-1);

        // The mempool view and the tip snapshot are held for the whole
        // assembly; the tip is re-checked by hash before validation.
        let pool = Arc::clone(&self.pool);
        let view = pool.read();
        let tip = self.chain.tip();

        self.height = tip.height + 1;

        let mut version = self.chain.compute_block_version(&tip);
        if self.params.mine_blocks_on_demand {
            if let Some(override_version) = self.options.block_version_override {
                version = override_version;
            }
        }
        template.block.header.version = version;

        let median_time_past = tip.median_time_past;
        template.block.header.time =
            std::cmp::max(median_time_past + 1, self.chain.adjusted_time()) as u32;

        self.locktime_cutoff = if self.params.locktime_uses_median_time_past {
            median_time_past
        } else {
            template.block.header.time as i64
        };

        self.include_witness =
            self.chain.is_witness_enabled(&tip) && include_witness_requested;

        let (packages_selected, descendants_updated) =
            self.add_package_txs(&view, &mut template);
        let selection_finished = Instant::now();

        LAST_BLOCK_TX.store(self.block_tx, Ordering::Relaxed);
        LAST_BLOCK_WEIGHT.store(self.block_weight, Ordering::Relaxed);

        // Create the real coinbase transaction
        let mut coinbase_sig = Script::new();
        coinbase_sig.push_int(self.height as i64);
        coinbase_sig.push_opcode(opcodes::OP_0);
        let coinbase = Transaction {
            version: 1,
            inputs: vec![TxIn {
                previous_output: OutPoint::null(),
                script_sig: coinbase_sig,
                sequence: SEQUENCE_FINAL,
                witness: Vec::new(),
            }],
            outputs: vec![TxOut {
                value: self.block_fees + get_block_subsidy(self.height, &self.params),
                script_pubkey: coinbase_script.clone(),
            }],
            lock_time: 0,
        };
        template.block.txdata[0] = Arc::new(coinbase);
        template.coinbase_commitment = generate_coinbase_commitment(&mut template.block);
        template.fees[0] = -self.block_fees;
        template.sigops[0] =
            WITNESS_SCALE_FACTOR as i64 * legacy_sigop_count(&template.block.txdata[0]);

        info!(
            weight = self.block_weight,
            txs = self.block_tx,
            fees = self.block_fees,
            sigops = self.block_sigops,
            "assembled block template"
        );

        // Fill in the header
        template.block.header.prev_blockhash = tip.hash;
        update_time(
            &mut template.block.header,
            &self.params,
            &tip,
            self.chain.as_ref(),
        );
        template.block.header.bits = self.chain.next_work_required(&tip, &template.block.header);
        template.block.header.nonce = 0;

        if self.chain.tip().hash != tip.hash {
            return Err(MiningError::StaleTip);
        }

        self.validation
            .test_block_validity(&template.block, &tip)
            .map_err(|e| MiningError::InvalidTemplate(e.to_string()))?;

        debug!(
            packages = packages_selected,
            descendants_updated,
            selection_ms = selection_finished.duration_since(assembly_started).as_millis() as u64,
            total_ms = assembly_started.elapsed().as_millis() as u64,
            "template assembly finished"
        );

        Ok(template)
    }

    /// Whether a package of the given aggregates still fits the block.
    fn test_package(&self, package_size: u64, package_sigops: i64) -> bool {
        if self.block_weight + WITNESS_SCALE_FACTOR * package_size >= self.options.max_weight {
            return false;
        }
        if self.block_sigops + package_sigops >= MAX_BLOCK_SIGOPS_COST {
            return false;
        }
        true
    }

    /// Transaction-level checks on every member of a package: finality, and
    /// no witness data while witness commitments are not being made.
    fn test_package_transactions(&self, view: &MempoolView, package: &BTreeSet<Hash256>) -> bool {
        for txid in package {
            let Some(entry) = view.entry(txid) else {
                return false;
            };
            if !is_final_tx(&entry.tx, self.height, self.locktime_cutoff) {
                return false;
            }
            if !self.include_witness && entry.tx.has_witness() {
                return false;
            }
        }
        true
    }

    /// Append one transaction to the template and account for it.
    fn add_to_block(&mut self, template: &mut BlockTemplate, view: &MempoolView, txid: &Hash256) {
        let Some(entry) = view.entry(txid) else {
            return;
        };
        template.block.txdata.push(entry.tx.clone());
        template.fees.push(entry.fee);
        template.sigops.push(entry.sigop_cost);
        self.block_weight += WITNESS_SCALE_FACTOR * entry.tx_size;
        self.block_sigops += entry.sigop_cost;
        self.block_fees += entry.fee;
        self.block_tx += 1;
        self.in_block.insert(*txid);

        if self.options.print_priority {
            info!(
                fee = %FeeRate::from_fee(entry.modified_fee, entry.tx_size),
                txid = %txid,
                "added transaction to template"
            );
        }
    }

    /// Order a package so every transaction follows all of its ancestors.
    /// Sorting by ancestor count is sufficient: a descendant always counts
    /// strictly more ancestors than anything it depends on.
    fn sort_for_block(&self, view: &MempoolView, package: &BTreeSet<Hash256>) -> Vec<Hash256> {
        let mut sorted: Vec<Hash256> = package.iter().copied().collect();
        sorted.sort_by_key(|txid| {
            view.entry(txid)
                .map(|entry| entry.count_with_ancestors)
                .unwrap_or(u64::MAX)
        });
        sorted
    }

    /// The selection loop. Returns `(packages_selected, descendants_updated)`.
    fn add_package_txs(
        &mut self,
        view: &MempoolView,
        template: &mut BlockTemplate,
    ) -> (usize, usize) {
        // Overlay of entries whose pool aggregates are stale, plus entries
        // that already failed so they are not evaluated twice against bad
        // cached values.
        let mut modified = ModifiedTxSet::new();
        let mut failed: BTreeSet<Hash256> = BTreeSet::new();

        // Prime the overlay from anything already in the block.
        let mut descendants_updated = modified.update_for_added(view, &self.in_block);
        let mut packages_selected = 0usize;

        let mut pool_cursor = view.by_ancestor_score().peekable();
        let mut consecutive_failures: u32 = 0;

        loop {
            // Skip pool entries that are already placed, already failed, or
            // shadowed by a (stale-aggregate) overlay entry.
            if let Some(entry) = pool_cursor.peek() {
                let txid = entry.txid();
                if self.in_block.contains(&txid)
                    || failed.contains(&txid)
                    || modified.contains(&txid)
                {
                    pool_cursor.next();
                    continue;
                }
            }

            let pool_candidate = pool_cursor.peek().map(|entry| {
                (
                    entry.txid(),
                    entry.size_with_ancestors,
                    entry.mod_fees_with_ancestors,
                    entry.sigops_with_ancestors,
                    entry.score_key(),
                )
            });
            let overlay_candidate = modified.best().map(|m| {
                (
                    m.txid,
                    m.size_with_ancestors,
                    m.mod_fees_with_ancestors,
                    m.sigops_with_ancestors,
                    m.score_key(),
                )
            });

            // Pick whichever side scores better; ties go to the pool side.
            let (txid, package_size, package_fees, package_sigops, using_modified) =
                match (pool_candidate, overlay_candidate) {
                    (None, None) => break,
                    (None, Some(m)) => (m.0, m.1, m.2, m.3, true),
                    (Some(p), Some(m)) if m.4 < p.4 => (m.0, m.1, m.2, m.3, true),
                    (Some(p), _) => {
                        pool_cursor.next();
                        (p.0, p.1, p.2, p.3, false)
                    }
                };

            debug_assert!(!self.in_block.contains(&txid));

            if package_fees < self.options.min_fee_rate.fee(package_size) {
                // Everything else we might consider has a lower fee rate
                break;
            }

            if !self.test_package(package_size, package_sigops) {
                if using_modified {
                    // The overlay always surfaces its best entry, so a
                    // failed one must be dropped to reach the next best.
                    modified.remove(&txid);
                    failed.insert(txid);
                }
                consecutive_failures += 1;
                if consecutive_failures > self.options.max_consecutive_failures
                    && self.block_weight
                        > self.options.max_weight - self.options.near_full_weight_margin
                {
                    // Close to full and not succeeding; stop trying
                    break;
                }
                continue;
            }

            let mut package = view.calculate_ancestors(&txid);
            package.retain(|ancestor| !self.in_block.contains(ancestor));
            package.insert(txid);

            if !self.test_package_transactions(view, &package) {
                if using_modified {
                    modified.remove(&txid);
                    failed.insert(txid);
                }
                continue;
            }

            // This package is going in; reset the failure streak.
            consecutive_failures = 0;

            for member in self.sort_for_block(view, &package) {
                self.add_to_block(template, view, &member);
                modified.remove(&member);
            }
            packages_selected += 1;

            descendants_updated += modified.update_for_added(view, &package);
        }

        (packages_selected, descendants_updated)
    }
}

/// Bump the header time to `max(median_time_past + 1, adjusted_time)` and
/// return the signed delta. On networks that allow minimum-difficulty
/// blocks, a time change can also change the required work, so the target is
/// re-derived.
pub fn update_time(
    header: &mut BlockHeader,
    params: &ChainParams,
    prev: &BlockIndex,
    chain: &dyn ChainView,
) -> i64 {
    let old_time = header.time as i64;
    let new_time = std::cmp::max(prev.median_time_past + 1, chain.adjusted_time());

    if old_time < new_time {
        header.time = new_time as u32;
    }

    if params.allow_min_difficulty_blocks {
        header.bits = chain.next_work_required(prev, header);
    }

    new_time - old_time
}
