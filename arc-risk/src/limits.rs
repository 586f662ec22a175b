use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Static-per-session risk configuration. Loaded once at startup and never mutated; a
/// config reload requires a process restart.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RiskLimits {
    pub max_position_size_usd: Decimal,
    pub min_profit_margin_bps: Decimal,
    pub max_concurrent_tasks: usize,
    /// Per-exchange-leg notional a single order may carry, guarding against
    /// a mis-sized fill consuming an entire account's balance in one leg.
    pub max_order_notional_usd: Decimal,
}
