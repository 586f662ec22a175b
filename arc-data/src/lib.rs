#![warn(
    unused,
    clippy::cognitive_complexity,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity)]

//! # Arc-Data Per-exchange market-data decoders, the incremental [`books::OrderBook`]
//! engine, and the [`hub::MarketDataHub`] fan-in point consumers subscribe to.

pub mod books;
pub mod channel;
pub mod client;
pub mod error;
pub mod exchange;
pub mod hub;
pub mod model;

pub use channel::Channel;
pub use client::{ExchangeWsProtocol, WebSocketClient};
pub use error::DataError;
pub use hub::{MarketDataHub, SharedMarketDataHub};
pub use model::{BookTicker, MarketEvent};
