use arc_instrument::Symbol;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::books::Level;

/// Compact top-of-book view, derived in O(1) from the first element of each side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookTicker {
    pub bid_price: Decimal,
    pub bid_qty: Decimal,
    pub ask_price: Decimal,
    pub ask_qty: Decimal,
    pub timestamp: DateTime<Utc>,
    pub update_id: Option<u64>,
}

/// A parsed public market-data event, dispatched by the WebSocket client to registered
/// handlers.
#[derive(Debug, Clone)]
pub enum MarketEvent {
    OrderBookSnapshot {
        symbol: Symbol,
        bids: Vec<Level>,
        asks: Vec<Level>,
        timestamp: DateTime<Utc>,
        update_id: Option<u64>,
    },
    OrderBookDiff {
        symbol: Symbol,
        bids: Vec<Level>,
        asks: Vec<Level>,
        timestamp: DateTime<Utc>,
        first_update_id: Option<u64>,
        last_update_id: Option<u64>,
    },
    BookTicker {
        symbol: Symbol,
        ticker: BookTicker,
    },
    Trade {
        trade: arc_instrument::Trade,
    },
}
