use arc_data::client::ExchangeWsProtocol;
use arc_data::exchange::mexc::{MexcProtocol, MexcSymbolMapper};
use arc_data::model::MarketEvent;
use arc_integration::protocol::websocket::WsMessage;
use std::sync::Arc;

fn protocol() -> MexcProtocol {
    MexcProtocol::new(Arc::new(MexcSymbolMapper::default()))
}

#[test]
fn test_book_ticker_push_decodes_into_market_event() {
    let protocol = protocol();
    let raw = r#"{
        "c": "spot@public.bookTicker.v3.api@BTCUSDT",
        "s": "BTCUSDT",
        "t": 1700000000123,
        "d": {
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
            assert_eq!(symbol.base.as_str(), "btc");
            assert_eq!(symbol.quote.as_str(), "usdt");
            assert_eq!(ticker.bid_price.to_string(), "21000.1");
            assert_eq!(ticker.ask_price.to_string(), "21000.2");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn test_deal_push_decodes_into_trade_event() {
    let protocol = protocol();
    let raw = r#"{
        "c": "spot@public.deals.v3.api@BTCUSDT",
        "s": "BTCUSDT",
        "t": 1700000000123,
        "d": {
            "p": "21000.5",
            "v": "0.01",
            "S": 1,
            "t": 1700000000100
        }
    }"#;

    let events = protocol.parse(&WsMessage::Text(raw.to_string()));
    assert_eq!(events.len(), 1);
    match events.into_iter().next().unwrap().unwrap() {
        MarketEvent::Trade { trade } => {
            assert_eq!(trade.side, arc_instrument::Side::Buy);
            assert_eq!(trade.price.to_string(), "21000.5");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn test_subscription_ack_with_nonzero_code_surfaces_as_err() {
    let protocol = protocol();
    let raw = r#"{"id": 1, "code": 1, "msg": "invalid channel"}"#;
    let events = protocol.parse(&WsMessage::Text(raw.to_string()));
    assert_eq!(events.len(), 1);
    assert!(events[0].is_err());
}

#[test]
fn test_binary_frame_is_reported_unsupported_not_dropped_silently() {
    let protocol = protocol();
    let events = protocol.parse(&WsMessage::Binary(vec![0u8, 1, 2]));
    assert_eq!(events.len(), 1);
    assert!(events[0].is_err());
}
