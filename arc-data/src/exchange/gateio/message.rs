use crate::books::Level;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Generic envelope wrapping every Gate.io WebSocket push: `{"channel":...,
/// "event":..., "error":..., "result":...}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GateioMessage<T> {
    pub channel: String,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub error: Option<GateioError>,
    pub result: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GateioError {
    pub code: i64,
    pub message: String,
}

/// `spot.book_ticker` push payload.
#[derive(Debug, Clone, Deserialize)]
pub struct GateioBookTicker {
    #[serde(rename = "t")]
    pub time_ms: i64,
    #[serde(rename = "u")]
    pub update_id: u64,
    #[serde(rename = "s")]
    pub pair: String,
    #[serde(rename = "b")]
    pub best_bid_price: Decimal,
    #[serde(rename = "B")]
    pub best_bid_amount: Decimal,
    #[serde(rename = "a")]
    pub best_ask_price: Decimal,
    #[serde(rename = "A")]
    pub best_ask_amount: Decimal,
}

impl GateioBookTicker {
    pub fn timestamp(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.time_ms).single().unwrap_or_else(Utc::now)
    }
}

/// `spot.order_book_update` diff push payload.
#[derive(Debug, Clone, Deserialize)]
pub struct GateioOrderBookUpdate {
    #[serde(rename = "t")]
    pub time_ms: i64,
    #[serde(rename = "s")]
    pub pair: String,
    #[serde(rename = "U")]
    pub first_update_id: u64,
    #[serde(rename = "u")]
    pub last_update_id: u64,
    #[serde(rename = "b")]
    pub bids: Vec<(Decimal, Decimal)>,
    #[serde(rename = "a")]
    pub asks: Vec<(Decimal, Decimal)>,
}

impl GateioOrderBookUpdate {
    pub fn timestamp(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.time_ms).single().unwrap_or_else(Utc::now)
    }

    pub fn bid_levels(&self) -> Vec<Level> {
        self.bids.iter().map(|(p, s)| Level::new(*p, *s)).collect()
    }

    pub fn ask_levels(&self) -> Vec<Level> {
        self.asks.iter().map(|(p, s)| Level::new(*p, *s)).collect()
    }
}

/// REST `/spot/order_book` snapshot response.
#[derive(Debug, Clone, Deserialize)]
pub struct GateioOrderBookSnapshot {
    pub id: Option<u64>,
    #[serde(default)]
    pub current: Option<i64>,
    pub bids: Vec<(Decimal, Decimal)>,
    pub asks: Vec<(Decimal, Decimal)>,
}

/// `spot.trades` push payload.
#[derive(Debug, Clone, Deserialize)]
pub struct GateioTrade {
    pub id: i64,
    #[serde(rename = "create_time_ms")]
    pub create_time_ms: String,
    #[serde(rename = "currency_pair")]
    pub pair: String,
    pub side: String,
    pub amount: Decimal,
    pub price: Decimal,
}

impl GateioTrade {
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.create_time_ms
            .parse::<f64>()
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms as i64).single())
            .unwrap_or_else(Utc::now)
    }
}
