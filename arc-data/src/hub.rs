use crate::books::{Level, OrderBook};
use crate::error::DataError;
use crate::model::{BookTicker, MarketEvent};
use arc_instrument::{ExchangeId, Symbol, Trade};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

type Key = (ExchangeId, Symbol);

#[derive(Debug, Clone)]
struct VenueState {
    book: OrderBook,
    ticker: Option<BookTicker>,
    last_trade: Option<Trade>,
}

/// Fan-in point for every exchange's parsed [`MarketEvent`]s, keyed by `(ExchangeId,
/// Symbol)`. Owns exactly one [`OrderBook`] and the latest [`BookTicker`]/[`Trade`] per
/// key, and dispatches every ingested event synchronously to registered consumers
/// without blocking the ingest path.
pub struct MarketDataHub {
    state: RwLock<HashMap<Key, VenueState>>,
    consumers: RwLock<Vec<Box<dyn Fn(ExchangeId, &MarketEvent) + Send + Sync>>>,
    resync_hook: RwLock<Option<Arc<dyn Fn(ExchangeId, Symbol) + Send + Sync>>>,
}

impl std::fmt::Debug for MarketDataHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataHub")
            .field("tracked_keys", &self.state.read().len())
            .field("consumers", &self.consumers.read().len())
            .finish()
    }
}

impl Default for MarketDataHub {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketDataHub {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(HashMap::new()),
            consumers: RwLock::new(Vec::new()),
            resync_hook: RwLock::new(None),
        }
    }

    /// Register a callback invoked for every event ingested via
    /// [`Self::ingest`], after internal state has been updated.
    pub fn subscribe(&self, consumer: impl Fn(ExchangeId, &MarketEvent) + Send + Sync + 'static) {
        self.consumers.write().push(Box::new(consumer));
    }

    /// Register the hook invoked with `(exchange, symbol)` whenever a diff is dropped
    /// for a sequence gap, so the caller can fetch a fresh REST snapshot and re-ingest
    /// it. Only one hook can be registered; a later call replaces an earlier one.
    pub fn on_sequence_gap(&self, hook: impl Fn(ExchangeId, Symbol) + Send + Sync + 'static) {
        *self.resync_hook.write() = Some(Arc::new(hook));
    }

    /// Apply one parsed [`MarketEvent`] from `exchange` to this hub's
    /// per-symbol state, then fan it out to every registered consumer.
    pub fn ingest(&self, exchange: ExchangeId, event: MarketEvent) {
        if let Err(error) = self.apply(exchange, &event) {
            warn!(?error, ?exchange, "dropping market event that failed to apply");

            if let (DataError::SequenceGap(_), MarketEvent::OrderBookDiff { symbol, .. }) = (&error, &event) {
                if let Some(hook) = self.resync_hook.read().clone() {
                    hook(exchange, symbol.clone());
                }
            }
            return;
        }

        for consumer in self.consumers.read().iter() {
            consumer(exchange, &event);
        }
    }

    fn apply(&self, exchange: ExchangeId, event: &MarketEvent) -> Result<(), DataError> {
        match event {
            MarketEvent::OrderBookSnapshot {
                symbol,
                bids,
                asks,
                timestamp,
                update_id,
            } => {
                let mut state = self.state.write();
                let entry = state
                    .entry((exchange, symbol.clone()))
                    .or_insert_with(|| VenueState {
                        book: OrderBook::new(symbol.clone()),
                        ticker: None,
                        last_trade: None,
                    });
                entry
                    .book
                    .apply_snapshot(bids.clone(), asks.clone(), *timestamp, *update_id);
                debug!(%symbol, ?exchange, "applied order book snapshot");
                Ok(())
            }
            MarketEvent::OrderBookDiff {
                symbol,
                bids,
                asks,
                timestamp,
                first_update_id,
                last_update_id,
            } => {
                let mut state = self.state.write();
                let entry = state
                    .entry((exchange, symbol.clone()))
                    .or_insert_with(|| VenueState {
                        book: OrderBook::new(symbol.clone()),
                        ticker: None,
                        last_trade: None,
                    });
                let diff = crate::books::LevelDiff {
                    bids: bids.clone(),
                    asks: asks.clone(),
                };
                entry
                    .book
                    .apply_diff(diff, *timestamp, *first_update_id, *last_update_id)
                    .map_err(DataError::from)
            }
            MarketEvent::BookTicker { symbol, ticker } => {
                let mut state = self.state.write();
                let entry = state
                    .entry((exchange, symbol.clone()))
                    .or_insert_with(|| VenueState {
                        book: OrderBook::new(symbol.clone()),
                        ticker: None,
                        last_trade: None,
                    });
                entry.ticker = Some(*ticker);
                Ok(())
            }
            MarketEvent::Trade { trade } => {
                let mut state = self.state.write();
                let entry = state
                    .entry((exchange, trade.symbol.clone()))
                    .or_insert_with(|| VenueState {
                        book: OrderBook::new(trade.symbol.clone()),
                        ticker: None,
                        last_trade: None,
                    });
                entry.last_trade = Some(trade.clone());
                Ok(())
            }
        }
    }

    pub fn best_bid_ask(&self, exchange: ExchangeId, symbol: &Symbol) -> Option<(Level, Level)> {
        let state = self.state.read();
        let entry = state.get(&(exchange, symbol.clone()))?;
        Some((entry.book.best_bid()?, entry.book.best_ask()?))
    }

    /// Timestamp of the last applied snapshot/diff for `(exchange, symbol)`, used by
    /// the Opportunity Scanner to enforce `market_data_staleness_ms`.
    pub fn book_timestamp(&self, exchange: ExchangeId, symbol: &Symbol) -> Option<chrono::DateTime<chrono::Utc>> {
        Some(self.state.read().get(&(exchange, symbol.clone()))?.book.timestamp())
    }

    pub fn latest_ticker(&self, exchange: ExchangeId, symbol: &Symbol) -> Option<BookTicker> {
        self.state.read().get(&(exchange, symbol.clone()))?.ticker
    }

    pub fn latest_trade(&self, exchange: ExchangeId, symbol: &Symbol) -> Option<Trade> {
        self.state
            .read()
            .get(&(exchange, symbol.clone()))?
            .last_trade
            .clone()
    }

    pub fn is_stale(&self, exchange: ExchangeId, symbol: &Symbol) -> bool {
        self.state
            .read()
            .get(&(exchange, symbol.clone()))
            .map(|entry| entry.book.is_stale())
            .unwrap_or(true)
    }
}

pub type SharedMarketDataHub = Arc<MarketDataHub>;
