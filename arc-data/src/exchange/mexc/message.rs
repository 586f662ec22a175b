use crate::books::Level;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Subscribe/unsubscribe acknowledgement: `{"id": N, "code": 0, "msg":
/// "spot@public.book_ticker.v3.api@BTCUSDT"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct MexcSubResponse {
    pub id: Option<u64>,
    pub code: Option<i64>,
    #[serde(default)]
    pub msg: Option<String>,
}

/// `spot@public.bookTicker.v3.api@{symbol}` push payload, wrapped in the
/// generic `{"c": channel, "d": {...}, "s": symbol, "t": ts}` envelope MEXC
/// uses for JSON public channels.
#[derive(Debug, Clone, Deserialize)]
pub struct MexcPushEnvelope<T> {
    #[serde(rename = "c")]
    pub channel: String,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "t")]
    pub time_ms: i64,
    #[serde(rename = "d")]
    pub data: T,
}

impl<T> MexcPushEnvelope<T> {
    pub fn timestamp(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.time_ms).single().unwrap_or_else(Utc::now)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MexcBookTickerData {
    #[serde(rename = "b")]
    pub best_bid_price: Decimal,
    #[serde(rename = "B")]
    pub best_bid_amount: Decimal,
    #[serde(rename = "a")]
    pub best_ask_price: Decimal,
    #[serde(rename = "A")]
    pub best_ask_amount: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MexcDealData {
    #[serde(rename = "p")]
    pub price: Decimal,
    #[serde(rename = "v")]
    pub quantity: Decimal,
    #[serde(rename = "S")]
    pub side: i32, // 1 = buy, 2 = sell
    #[serde(rename = "t")]
    pub time_ms: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MexcDepthData {
    #[serde(rename = "bids", default)]
    pub bids: Vec<MexcDepthLevel>,
    #[serde(rename = "asks", default)]
    pub asks: Vec<MexcDepthLevel>,
    #[serde(rename = "r")]
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MexcDepthLevel {
    #[serde(rename = "p")]
    pub price: Decimal,
    #[serde(rename = "v")]
    pub quantity: Decimal,
}

impl MexcDepthData {
    pub fn bid_levels(&self) -> Vec<Level> {
        self.bids.iter().map(|l| Level::new(l.price, l.quantity)).collect()
    }

    pub fn ask_levels(&self) -> Vec<Level> {
        self.asks.iter().map(|l| Level::new(l.price, l.quantity)).collect()
    }
}

/// REST `/api/v3/depth` snapshot response.
#[derive(Debug, Clone, Deserialize)]
pub struct MexcDepthSnapshot {
    #[serde(rename = "lastUpdateId")]
    pub last_update_id: u64,
    pub bids: Vec<(Decimal, Decimal)>,
    pub asks: Vec<(Decimal, Decimal)>,
}

/// REST `POST /api/v3/userDataStream` response.
#[derive(Debug, Clone, Deserialize)]
pub struct MexcListenKeyResponse {
    #[serde(rename = "listenKey")]
    pub listen_key: String,
}
