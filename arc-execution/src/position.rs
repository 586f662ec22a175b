use arc_instrument::{Side, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Futures-only position snapshot.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Position {
    pub symbol: Symbol,
    pub side: Side,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub mark_price: Option<Decimal>,
    pub unrealized_pnl: Option<Decimal>,
    pub margin: Option<Decimal>,
}
