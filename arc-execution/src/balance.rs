use arc_instrument::AssetName;
use chrono::{DateTime, Utc};
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `{asset, free, locked}` with invariant `free ≥ 0 ∧ locked ≥ 0`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, Constructor)]
pub struct AssetBalance {
    pub free: Decimal,
    pub locked: Decimal,
}

impl AssetBalance {
    pub fn total(&self) -> Decimal {
        self.free + self.locked
    }
}

/// Timestamped [`AssetBalance`] for one asset, as tracked per (exchange, account) by
/// the Private-State Tracker.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AccountBalance {
    pub asset: AssetName,
    pub balance: AssetBalance,
    pub time_exchange: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_total_is_free_plus_locked() {
        let balance = AssetBalance::new(dec!(1.5), dec!(0.5));
        assert_eq!(balance.total(), dec!(2.0));
    }
}
