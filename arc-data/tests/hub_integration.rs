use arc_data::books::Level;
use arc_data::model::MarketEvent;
use arc_data::MarketDataHub;
use arc_instrument::{ExchangeId, Symbol};
use chrono::Utc;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_hub_applies_snapshot_then_diff_and_notifies_consumers() {
    let hub = MarketDataHub::new();
    let symbol = Symbol::spot("btc", "usdt");
    let notified = Arc::new(AtomicUsize::new(0));
    let notified_clone = notified.clone();
    hub.subscribe(move |_exchange, _event| {
        notified_clone.fetch_add(1, Ordering::SeqCst);
    });

    hub.ingest(
        ExchangeId::GateioSpot,
        MarketEvent::OrderBookSnapshot {
            symbol: symbol.clone(),
            bids: vec![Level::new(dec!(100), dec!(1))],
            asks: vec![Level::new(dec!(101), dec!(1))],
            timestamp: Utc::now(),
            update_id: Some(1),
        },
    );

    assert_eq!(
        hub.best_bid_ask(ExchangeId::GateioSpot, &symbol),
        Some((Level::new(dec!(100), dec!(1)), Level::new(dec!(101), dec!(1))))
    );
    assert!(!hub.is_stale(ExchangeId::GateioSpot, &symbol));

    hub.ingest(
        ExchangeId::GateioSpot,
        MarketEvent::OrderBookDiff {
            symbol: symbol.clone(),
            bids: vec![Level::new(dec!(99), dec!(5))],
            asks: vec![],
            timestamp: Utc::now(),
            first_update_id: Some(2),
            last_update_id: Some(2),
        },
    );

    assert_eq!(notified.load(Ordering::SeqCst), 2);
    assert_eq!(
        hub.best_bid_ask(ExchangeId::GateioSpot, &symbol),
        Some((Level::new(dec!(100), dec!(1)), Level::new(dec!(101), dec!(1))))
    );
}

#[test]
fn test_hub_sequence_gap_marks_stale_and_is_not_fanned_out_as_error_panic() {
    let hub = MarketDataHub::new();
    let symbol = Symbol::spot("btc", "usdt");

    hub.ingest(
        ExchangeId::MexcSpot,
        MarketEvent::OrderBookSnapshot {
            symbol: symbol.clone(),
            bids: vec![],
            asks: vec![],
            timestamp: Utc::now(),
            update_id: Some(10),
        },
    );

    hub.ingest(
        ExchangeId::MexcSpot,
        MarketEvent::OrderBookDiff {
            symbol: symbol.clone(),
            bids: vec![],
            asks: vec![],
            timestamp: Utc::now(),
            first_update_id: Some(50),
            last_update_id: Some(51),
        },
    );

    assert!(hub.is_stale(ExchangeId::MexcSpot, &symbol));
}

#[test]
fn test_hub_tracks_independent_state_per_exchange_and_symbol() {
    let hub = MarketDataHub::new();
    let btc = Symbol::spot("btc", "usdt");
    let eth = Symbol::spot("eth", "usdt");

    hub.ingest(
        ExchangeId::GateioSpot,
        MarketEvent::OrderBookSnapshot {
            symbol: btc.clone(),
            bids: vec![Level::new(dec!(100), dec!(1))],
            asks: vec![Level::new(dec!(101), dec!(1))],
            timestamp: Utc::now(),
            update_id: Some(1),
        },
    );
    hub.ingest(
        ExchangeId::MexcSpot,
        MarketEvent::OrderBookSnapshot {
            symbol: eth.clone(),
            bids: vec![Level::new(dec!(10), dec!(1))],
            asks: vec![Level::new(dec!(11), dec!(1))],
            timestamp: Utc::now(),
            update_id: Some(1),
        },
    );

    assert!(hub.best_bid_ask(ExchangeId::GateioSpot, &eth).is_none());
    assert!(hub.best_bid_ask(ExchangeId::MexcSpot, &btc).is_none());
    assert!(hub.best_bid_ask(ExchangeId::GateioSpot, &btc).is_some());
    assert!(hub.best_bid_ask(ExchangeId::MexcSpot, &eth).is_some());
}
