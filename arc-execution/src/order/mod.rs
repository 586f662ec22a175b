pub mod id;
pub mod request;
pub mod state;

pub use id::{ClientOrderId, OrderId};
pub use request::OrderRequest;
pub use state::{OrderStatus, OrderType, TimeInForce};

use arc_instrument::{Side, Symbol};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A tracked order, private or public-echoed via fills.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Order {
    pub symbol: Symbol,
    pub order_id: OrderId,
    pub client_order_id: Option<ClientOrderId>,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub filled_quantity: Decimal,
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    pub avg_price: Option<Decimal>,
    pub fee: Option<Decimal>,
    pub time_in_force: TimeInForce,
}

impl Order {
    pub fn remaining_quantity(&self) -> Decimal {
        self.quantity - self.filled_quantity
    }

    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }
}
