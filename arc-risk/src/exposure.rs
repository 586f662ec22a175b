use arc_instrument::{ExchangeId, Symbol};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Tracks net USD-notional exposure per `(exchange, symbol)` leg, and the combined
/// exposure per symbol across all exchanges.
#[derive(Debug, Default)]
pub struct ExposureTracker {
    per_leg: RwLock<HashMap<(ExchangeId, Symbol), Decimal>>,
}

impl ExposureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adjust the signed notional held on `exchange` for `symbol`. Positive
    /// is long, negative is short.
    pub fn update(&self, exchange: ExchangeId, symbol: Symbol, delta_usd: Decimal) {
        let mut guard = self.per_leg.write();
        *guard.entry((exchange, symbol)).or_insert(Decimal::ZERO) += delta_usd;
    }

    pub fn leg_exposure(&self, exchange: ExchangeId, symbol: &Symbol) -> Decimal {
        *self.per_leg.read().get(&(exchange, symbol.clone())).unwrap_or(&Decimal::ZERO)
    }

    /// Sum of absolute per-leg exposure for `symbol` across every exchange -
    /// the quantity compared against [`crate::RiskLimits::max_position_size_usd`].
    pub fn total_exposure(&self, symbol: &Symbol) -> Decimal {
        self.per_leg
            .read()
            .iter()
            .filter(|((_, leg_symbol), _)| leg_symbol == symbol)
            .map(|(_, notional)| notional.abs())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_total_exposure_sums_across_exchanges() {
        let tracker = ExposureTracker::new();
        let symbol = Symbol::spot("btc", "usdt");
        tracker.update(ExchangeId::GateioSpot, symbol.clone(), dec!(1000));
        tracker.update(ExchangeId::MexcSpot, symbol.clone(), dec!(-500));
        assert_eq!(tracker.total_exposure(&symbol), dec!(1500));
    }

    #[test]
    fn test_update_accumulates_on_same_leg() {
        let tracker = ExposureTracker::new();
        let symbol = Symbol::spot("btc", "usdt");
        tracker.update(ExchangeId::GateioSpot, symbol.clone(), dec!(100));
        tracker.update(ExchangeId::GateioSpot, symbol.clone(), dec!(50));
        assert_eq!(tracker.leg_exposure(ExchangeId::GateioSpot, &symbol), dec!(150));
    }
}
