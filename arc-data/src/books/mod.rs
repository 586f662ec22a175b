use arc_instrument::Symbol;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// A single `(price, size)` level of an [`OrderBook`] side. `size == 0` in a diff
/// signals level removal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize, Serialize)]
pub struct Level {
    pub price: Decimal,
    pub size: Decimal,
}

impl Level {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

/// Tags an [`OrderBookSide`] as the bid (buyer) side — sorted descending by price.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Bids;

/// Tags an [`OrderBookSide`] as the ask (seller) side — sorted ascending by price.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Asks;

/// One side of an [`OrderBook`]: an ordered, duplicate-free sequence of [`Level`]s.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderBookSide<Side> {
    levels: Vec<Level>,
    _side: std::marker::PhantomData<Side>,
}

impl OrderBookSide<Bids> {
    pub fn new<I: IntoIterator<Item = Level>>(levels: I) -> Self {
        let mut levels: Vec<Level> = levels.into_iter().filter(|l| !l.size.is_zero()).collect();
        levels.sort_unstable_by(|a, b| b.price.cmp(&a.price));
        levels.dedup_by_key(|l| l.price);
        Self {
            levels,
            _side: std::marker::PhantomData,
        }
    }

    fn upsert(&mut self, level: Level) {
        self.upsert_single(level, |existing| existing.price.cmp(&level.price).reverse());
    }
}

impl OrderBookSide<Asks> {
    pub fn new<I: IntoIterator<Item = Level>>(levels: I) -> Self {
        let mut levels: Vec<Level> = levels.into_iter().filter(|l| !l.size.is_zero()).collect();
        levels.sort_unstable_by(|a, b| a.price.cmp(&b.price));
        levels.dedup_by_key(|l| l.price);
        Self {
            levels,
            _side: std::marker::PhantomData,
        }
    }

    fn upsert(&mut self, level: Level) {
        self.upsert_single(level, |existing| existing.price.cmp(&level.price));
    }
}

impl<Side> OrderBookSide<Side> {
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn best(&self) -> Option<Level> {
        self.levels.first().copied()
    }

    pub fn depth(&self, n: usize) -> &[Level] {
        &self.levels[..self.levels.len().min(n)]
    }

    /// Upsert a single [`Level`], removing it if `size` is zero.
    fn upsert_single<FnOrd>(&mut self, level: Level, fn_ord: FnOrd)
    where
        FnOrd: Fn(&Level) -> Ordering,
    {
        match (self.levels.binary_search_by(fn_ord), level.size.is_zero()) {
            (Ok(index), true) => {
                self.levels.remove(index);
            }
            (Ok(index), false) => {
                self.levels[index].size = level.size;
            }
            (Err(_), true) => {
                debug!(?level, "received zero-size upsert for a level not present, dropping");
            }
            (Err(index), false) => {
                self.levels.insert(index, level);
            }
        }
    }
}

/// A sequenced batch of level changes applied to one side of an [`OrderBook`].
#[derive(Debug, Clone, Default)]
pub struct LevelDiff {
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
}

/// Per-symbol incremental order book, exclusively owned by the market-data hub.
/// Maintains an O(1) `(best_bid, best_ask)` cache and validates sequence-id continuity,
/// marking itself `stale` on a detected gap or a crossed book until a fresh snapshot is
/// applied.
#[derive(Debug, Clone)]
pub struct OrderBook {
    symbol: Symbol,
    bids: OrderBookSide<Bids>,
    asks: OrderBookSide<Asks>,
    last_update_id: Option<u64>,
    timestamp: DateTime<Utc>,
    stale: bool,
    best_bid: Option<Level>,
    best_ask: Option<Level>,
}

impl OrderBook {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            bids: OrderBookSide::new(std::iter::empty()),
            asks: OrderBookSide::new(std::iter::empty()),
            last_update_id: None,
            timestamp: Utc::now(),
            stale: true,
            best_bid: None,
            best_ask: None,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// `true` iff the book requires a fresh snapshot before further diffs can
    /// be trusted (sequence gap or crossed book detected).
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Clear and replace both sides; recompute best. Always clears the stale flag.
    pub fn apply_snapshot(
        &mut self,
        bids: impl IntoIterator<Item = Level>,
        asks: impl IntoIterator<Item = Level>,
        ts: DateTime<Utc>,
        id: Option<u64>,
    ) {
        self.bids = OrderBookSide::new(bids);
        self.asks = OrderBookSide::new(asks);
        self.timestamp = ts;
        self.last_update_id = id;
        self.stale = false;
        self.recompute_best();
    }

    /// Apply an incremental diff, validating sequence continuity when `id` is provided.
    /// Returns `Err` describing a detected gap; the caller is expected to mark the book
    /// for resync (it is already marked `stale` when this returns `Err`).
    pub fn apply_diff(
        &mut self,
        diff: LevelDiff,
        ts: DateTime<Utc>,
        first_id: Option<u64>,
        last_id: Option<u64>,
    ) -> Result<(), SequenceGap> {
        if let (Some(last_update_id), Some(first_id)) = (self.last_update_id, first_id) {
            if first_id > last_update_id + 1 {
                self.stale = true;
                return Err(SequenceGap {
                    expected_next: last_update_id + 1,
                    received_first: first_id,
                });
            }
        }

        for level in diff.bids {
            self.bids.upsert(level);
        }
        for level in diff.asks {
            self.asks.upsert(level);
        }

        self.timestamp = ts;
        if let Some(last_id) = last_id {
            self.last_update_id = Some(last_id);
        }

        self.recompute_best();
        Ok(())
    }

    pub fn best_bid(&self) -> Option<Level> {
        self.best_bid
    }

    pub fn best_ask(&self) -> Option<Level> {
        self.best_ask
    }

    pub fn bids(&self) -> &OrderBookSide<Bids> {
        &self.bids
    }

    pub fn asks(&self) -> &OrderBookSide<Asks> {
        &self.asks
    }

    pub fn depth(&self, n: usize) -> (&[Level], &[Level]) {
        (self.bids.depth(n), self.asks.depth(n))
    }

    fn recompute_best(&mut self) {
        self.best_bid = self.bids.best();
        self.best_ask = self.asks.best();

        if let (Some(bid), Some(ask)) = (self.best_bid, self.best_ask) {
            if bid.price >= ask.price {
                warn!(symbol = %self.symbol, %bid.price, %ask.price, "crossed book detected, marking stale");
                self.stale = true;
            }
        }
    }
}

/// A detected sequence-id discontinuity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("sequence gap: expected next id {expected_next}, received first id {received_first}")]
pub struct SequenceGap {
    pub expected_next: u64,
    pub received_first: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_instrument::Symbol;
    use rust_decimal_macros::dec;

    fn btc_usdt() -> Symbol {
        Symbol::spot("BTC", "USDT")
    }

    fn ts(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    // S1 — snapshot then diff.
    #[test]
    fn test_apply_snapshot_then_diff_matches_scenario_s1() {
        let mut book = OrderBook::new(btc_usdt());
        book.apply_snapshot(
            [Level::new(dec!(100), dec!(1)), Level::new(dec!(99), dec!(2))],
            [Level::new(dec!(101), dec!(1)), Level::new(dec!(102), dec!(2))],
            ts(1000),
            Some(1),
        );

        book.apply_diff(
            LevelDiff {
                bids: vec![Level::new(dec!(100), dec!(0)), Level::new(dec!(98), dec!(3))],
                asks: vec![Level::new(dec!(101), dec!(1.5))],
            },
            ts(1001),
            Some(2),
            Some(2),
        )
        .unwrap();

        assert_eq!(
            book.bids().levels(),
            &[Level::new(dec!(99), dec!(2)), Level::new(dec!(98), dec!(3))]
        );
        assert_eq!(
            book.asks().levels(),
            &[Level::new(dec!(101), dec!(1.5)), Level::new(dec!(102), dec!(2))]
        );
        assert_eq!(book.best_bid(), Some(Level::new(dec!(99), dec!(2))));
        assert_eq!(book.best_ask(), Some(Level::new(dec!(101), dec!(1.5))));
        assert!(!book.is_stale());
    }

    // S2 — sequence gap detection.
    #[test]
    fn test_sequence_gap_marks_book_stale_matches_scenario_s2() {
        let mut book = OrderBook::new(btc_usdt());
        book.apply_snapshot([], [], ts(1000), Some(42));

        let result = book.apply_diff(LevelDiff::default(), ts(1001), Some(45), Some(46));
        assert!(result.is_err());
        assert!(book.is_stale());

        book.apply_snapshot(
            [Level::new(dec!(100), dec!(1))],
            [Level::new(dec!(101), dec!(1))],
            ts(1002),
            Some(50),
        );
        assert!(!book.is_stale());
    }

    #[test]
    fn test_crossed_book_marks_stale() {
        let mut book = OrderBook::new(btc_usdt());
        book.apply_snapshot(
            [Level::new(dec!(100), dec!(1))],
            [Level::new(dec!(99), dec!(1))],
            ts(1000),
            None,
        );
        assert!(book.is_stale());
    }

    #[test]
    fn test_upsert_zero_size_removes_existing_level() {
        let mut side = OrderBookSide::<Bids>::new([Level::new(dec!(10), dec!(1))]);
        side.upsert(Level::new(dec!(10), dec!(0)));
        assert!(side.levels().is_empty());
    }
}
