//! Chain parameters for the Ember blockchain.

use ember_primitives::{Amount, Script, COIN};

/// Maximum block weight allowed by consensus.
pub const MAX_BLOCK_WEIGHT: u64 = 4_000_000;

/// Maximum cumulative signature-operation cost per block.
pub const MAX_BLOCK_SIGOPS_COST: i64 = 80_000;

/// Default weight budget for assembled blocks, leaving headroom below the
/// consensus maximum.
pub const DEFAULT_BLOCK_MAX_WEIGHT: u64 = MAX_BLOCK_WEIGHT - 4_000;

/// Default minimum fee rate for block inclusion, in lits per 1000 virtual
/// bytes. Matches the minimum relay rate.
pub const DEFAULT_BLOCK_MIN_TX_FEE: Amount = 1_000;

/// Lock-time values below this threshold are block heights, values at or
/// above it are unix timestamps.
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;

/// Networks an Ember node can run on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
    Regtest,
}

/// Static consensus parameters for one network.
#[derive(Clone, Debug)]
pub struct ChainParams {
    /// Which network these parameters describe.
    pub network: Network,
    /// The easiest allowed compact difficulty target.
    pub pow_limit_bits: u32,
    /// Whether blocks may fall back to minimum difficulty when block
    /// production stalls (testnet rule).
    pub allow_min_difficulty_blocks: bool,
    /// Whether blocks are only produced on demand (regtest rule); the miner
    /// stops a worker after each found block.
    pub mine_blocks_on_demand: bool,
    /// Blocks between subsidy halvings.
    pub subsidy_halving_interval: u32,
    /// Whether the lock-time cutoff for transaction finality is the median
    /// time past rather than the block time.
    pub locktime_uses_median_time_past: bool,
    /// Extra bytes appended to the coinbase script signature.
    pub coinbase_flags: Script,
}

impl ChainParams {
    /// Mainnet parameters.
    pub fn mainnet() -> Self {
        ChainParams {
            network: Network::Mainnet,
            pow_limit_bits: 0x1e0f_ffff,
            allow_min_difficulty_blocks: false,
            mine_blocks_on_demand: false,
            subsidy_halving_interval: 840_000,
            locktime_uses_median_time_past: true,
            coinbase_flags: coinbase_flags(),
        }
    }

    /// Testnet parameters.
    pub fn testnet() -> Self {
        ChainParams {
            network: Network::Testnet,
            allow_min_difficulty_blocks: true,
            ..Self::mainnet()
        }
    }

    /// Regression-test parameters.
    pub fn regtest() -> Self {
        ChainParams {
            network: Network::Regtest,
            pow_limit_bits: 0x207f_ffff,
            allow_min_difficulty_blocks: true,
            mine_blocks_on_demand: true,
            subsidy_halving_interval: 150,
            ..Self::mainnet()
        }
    }
}

fn coinbase_flags() -> Script {
    let mut flags = Script::new();
    flags.push_slice(b"/Ember/");
    flags
}

/// Block subsidy at `height`: 50 EMB, halving every
/// `subsidy_halving_interval` blocks until it reaches zero.
pub fn get_block_subsidy(height: u32, params: &ChainParams) -> Amount {
    let halvings = height / params.subsidy_halving_interval;
    if halvings >= 64 {
        return 0;
    }
    (50 * COIN) >> halvings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsidy_schedule() {
        let params = ChainParams::mainnet();
        assert_eq!(get_block_subsidy(0, &params), 50 * COIN);
        assert_eq!(get_block_subsidy(839_999, &params), 50 * COIN);
        assert_eq!(get_block_subsidy(840_000, &params), 25 * COIN);
        assert_eq!(get_block_subsidy(1_680_000, &params), 25 * COIN / 2);
    }

    #[test]
    fn test_subsidy_eventually_zero() {
        let params = ChainParams::regtest();
        assert_eq!(get_block_subsidy(64 * 150, &params), 0);
    }

    #[test]
    fn test_network_flavors() {
        assert!(!ChainParams::mainnet().mine_blocks_on_demand);
        assert!(ChainParams::testnet().allow_min_difficulty_blocks);
        assert!(ChainParams::regtest().mine_blocks_on_demand);
    }
}
