//! Mining configuration.

use crate::assembler::AssemblerOptions;
use ember_consensus::{DEFAULT_BLOCK_MAX_WEIGHT, DEFAULT_BLOCK_MIN_TX_FEE};
use ember_primitives::{Amount, FeeRate};
use serde::{Deserialize, Serialize};

/// Miner configuration as consumed from the node's configuration surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    /// Enable internal mining.
    pub enable: bool,
    /// Number of mining threads; negative means one per physical core.
    pub threads: i32,
    /// Maximum weight of assembled blocks.
    pub block_max_weight: u64,
    /// Minimum fee rate for block inclusion, in lits per 1000 virtual bytes.
    pub block_min_tx_fee: Amount,
    /// Block version override, honored on mine-on-demand networks only.
    pub block_version: Option<i32>,
    /// Log fee rate and txid of every included transaction.
    pub print_priority: bool,
}

impl Default for MinerConfig {
    fn default() -> Self {
        MinerConfig {
            enable: false,
            threads: -1,
            block_max_weight: DEFAULT_BLOCK_MAX_WEIGHT,
            block_min_tx_fee: DEFAULT_BLOCK_MIN_TX_FEE,
            block_version: None,
            print_priority: false,
        }
    }
}

impl MinerConfig {
    /// The assembler options this configuration implies.
    pub fn assembler_options(&self) -> AssemblerOptions {
        AssemblerOptions {
            max_weight: self.block_max_weight,
            min_fee_rate: FeeRate::from_lits_per_kvb(self.block_min_tx_fee),
            block_version_override: self.block_version,
            print_priority: self.print_priority,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MinerConfig::default();
        assert!(!config.enable);
        assert_eq!(config.threads, -1);
        assert_eq!(config.block_max_weight, DEFAULT_BLOCK_MAX_WEIGHT);
        assert_eq!(config.block_min_tx_fee, DEFAULT_BLOCK_MIN_TX_FEE);
    }

    #[test]
    fn test_options_carry_overrides() {
        let config = MinerConfig {
            block_max_weight: 100_000,
            block_min_tx_fee: 5_000,
            block_version: Some(3),
            print_priority: true,
            ..Default::default()
        };
        let options = config.assembler_options();
        assert_eq!(options.max_weight, 100_000);
        assert_eq!(options.min_fee_rate, FeeRate::from_lits_per_kvb(5_000));
        assert_eq!(options.block_version_override, Some(3));
        assert!(options.print_priority);
    }
}
