use arc_data::client::ExchangeWsProtocol;
use arc_data::exchange::gateio::{GateioProtocol, GateioSymbolMapper};
use arc_data::model::MarketEvent;
use arc_data::Channel;
use arc_instrument::Symbol;
use arc_integration::protocol::websocket::WsMessage;
use std::sync::Arc;

fn protocol() -> GateioProtocol {
    GateioProtocol::new(Arc::new(GateioSymbolMapper::default()))
}

#[test]
fn test_subscribe_message_matches_gateio_wire_format() {
    let protocol = protocol();
    let messages = protocol.subscribe_messages(&[Symbol::spot("btc", "usdt")], &[Channel::OrderBookL1]);
    assert_eq!(messages.len(), 1);
    let WsMessage::Text(text) = &messages[0] else {
        panic!("expected text message");
    };

    let value: serde_json::Value = serde_json::from_str(text).unwrap();
    assert_eq!(value["channel"], "spot.book_ticker");
    assert_eq!(value["event"], "subscribe");
    assert_eq!(value["payload"][0], "BTC_USDT");
}

#[test]
fn test_book_ticker_push_decodes_into_market_event() {
    let protocol = protocol();
    let raw = r#"{
        "time": 1700000000,
        "channel": "spot.book_ticker",
        "event": "update",
        "result": {
            "t": 1700000000123,
            "u": 48733182,
            "s": "BTC_USDT",
            "b": "21000.1",
            "B": "3.5",
            "a": "21000.2",
            "A": "2.1"
        }
    }"#;

    let events = protocol.parse(&WsMessage::Text(raw.to_string()));
    assert_eq!(events.len(), 1);
    match events.into_iter().next().unwrap().unwrap() {
        MarketEvent::BookTicker { symbol, ticker } => {
            assert_eq!(symbol, Symbol::spot("btc", "usdt"));
            assert_eq!(ticker.bid_price.to_string(), "21000.1");
            assert_eq!(ticker.ask_price.to_string(), "21000.2");
            assert_eq!(ticker.update_id, Some(48733182));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn test_order_book_update_push_decodes_into_diff_event() {
    let protocol = protocol();
    let raw = r#"{
        "time": 1700000000,
        "channel": "spot.order_book_update",
        "event": "update",
        "result": {
            "t": 1700000000456,
            "s": "BTC_USDT",
            "U": 100,
            "u": 101,
            "b": [["21000.0", "1.5"]],
            "a": [["21000.5", "0.2"]]
        }
    }"#;

    let events = protocol.parse(&WsMessage::Text(raw.to_string()));
    assert_eq!(events.len(), 1);
    match events.into_iter().next().unwrap().unwrap() {
        MarketEvent::OrderBookDiff {
            symbol,
            first_update_id,
            last_update_id,
            bids,
            asks,
            ..
        } => {
            assert_eq!(symbol, Symbol::spot("btc", "usdt"));
            assert_eq!(first_update_id, Some(100));
            assert_eq!(last_update_id, Some(101));
            assert_eq!(bids.len(), 1);
            assert_eq!(asks.len(), 1);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn test_subscription_error_surfaces_as_err() {
    let protocol = protocol();
    let raw = r#"{
        "time": 1700000000,
        "channel": "spot.book_ticker",
        "event": "subscribe",
        "error": {"code": 2, "message": "unknown currency pair"},
        "result": {}
    }"#;

    let events = protocol.parse(&WsMessage::Text(raw.to_string()));
    assert_eq!(events.len(), 1);
    assert!(events[0].is_err());
}
