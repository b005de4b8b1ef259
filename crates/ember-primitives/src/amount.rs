//! Monetary amounts and fee rates.

use std::fmt;

/// A monetary amount in the smallest unit (lits). Signed so that fee
/// sentinels and deltas can go negative.
pub type Amount = i64;

/// Lits per EMB.
pub const COIN: Amount = 100_000_000;

/// Format an amount as a decimal EMB string, e.g. `50.00000000`.
pub fn format_money(amount: Amount) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{}{}.{:08}", sign, abs / COIN as u64, abs % COIN as u64)
}

/// A fee rate in lits per 1000 virtual bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct FeeRate {
    lits_per_kvb: Amount,
}

impl FeeRate {
    /// The zero fee rate.
    pub const ZERO: FeeRate = FeeRate { lits_per_kvb: 0 };

    /// Create a fee rate from lits per 1000 virtual bytes.
    pub const fn from_lits_per_kvb(lits_per_kvb: Amount) -> Self {
        FeeRate { lits_per_kvb }
    }

    /// The fee rate implied by paying `fee` for `size` virtual bytes.
    pub fn from_fee(fee: Amount, size: u64) -> Self {
        if size == 0 {
            return FeeRate::ZERO;
        }
        FeeRate {
            lits_per_kvb: fee.saturating_mul(1000) / size as Amount,
        }
    }

    /// The fee this rate charges for `size` virtual bytes.
    ///
    /// Never rounds a positive rate down to a free transaction.
    pub fn fee(&self, size: u64) -> Amount {
        let fee = self.lits_per_kvb.saturating_mul(size as Amount) / 1000;
        if fee == 0 && size != 0 && self.lits_per_kvb > 0 {
            1
        } else {
            fee
        }
    }

    /// The rate in lits per 1000 virtual bytes.
    pub fn lits_per_kvb(&self) -> Amount {
        self.lits_per_kvb
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} EMB/kvB", format_money(self.lits_per_kvb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(50 * COIN), "50.00000000");
        assert_eq!(format_money(1), "0.00000001");
        assert_eq!(format_money(-COIN / 2), "-0.50000000");
    }

    #[test]
    fn test_fee_rate_round_trip() {
        let rate = FeeRate::from_fee(1000, 250);
        assert_eq!(rate.lits_per_kvb(), 4000);
        assert_eq!(rate.fee(250), 1000);
    }

    #[test]
    fn test_fee_never_rounds_to_free() {
        let rate = FeeRate::from_lits_per_kvb(1);
        assert_eq!(rate.fee(100), 1);
        assert_eq!(rate.fee(0), 0);
        assert_eq!(FeeRate::ZERO.fee(100), 0);
    }

    #[test]
    fn test_fee_proportional_to_size() {
        let rate = FeeRate::from_lits_per_kvb(5000);
        assert_eq!(rate.fee(1000), 5000);
        assert_eq!(rate.fee(400), 2000);
    }
}
