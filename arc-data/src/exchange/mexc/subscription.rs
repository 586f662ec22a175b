use super::message::{
    MexcBookTickerData, MexcDealData, MexcDepthData, MexcPushEnvelope, MexcSubResponse,
};
use crate::channel::Channel;
use crate::client::ExchangeWsProtocol;
use crate::error::DataError;
use crate::model::{BookTicker, MarketEvent};
use arc_instrument::{Side, Symbol, SymbolMapper, Trade};
use arc_integration::protocol::websocket::{deserialize_or_log, WsMessage};
use chrono::{TimeZone, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const WS_URL: &str = "wss://wbs-api.mexc.com/ws";

/// Channel template for one (channel, symbol) pair. MEXC's high-frequency
/// `.aggre....pb` channels deliver binary protobuf frames requiring a
/// compiled schema; this protocol instead subscribes to the JSON-encoded
/// non-aggregated equivalents, which carry the same semantic content at a
/// coarser update cadence.
fn channel_template(channel: Channel) -> &'static str {
    match channel {
        Channel::OrderBookL1 => "spot@public.bookTicker.v3.api",
        Channel::OrderBookL2 => "spot@public.increase.depth.v3.api",
        Channel::Trades => "spot@public.deals.v3.api",
        Channel::PrivateOrders => "spot@private.orders.v3.api",
        Channel::PrivateBalances => "spot@private.account.v3.api",
        Channel::PrivateTrades => "spot@private.deals.v3.api",
    }
}

#[derive(Serialize)]
struct MexcWsSub {
    method: &'static str,
    params: Vec<String>,
    id: u64,
}

/// MEXC spot WebSocket protocol. Private streams authenticate by embedding a listen-key
/// obtained via REST in the connection URL, rather than per-subscription signing.
pub struct MexcProtocol {
    mapper: Arc<dyn SymbolMapper + Send + Sync>,
    listen_key: Option<String>,
    next_id: AtomicU64,
}

impl MexcProtocol {
    pub fn new(mapper: Arc<dyn SymbolMapper + Send + Sync>) -> Self {
        Self {
            mapper,
            listen_key: None,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_listen_key(mut self, listen_key: String) -> Self {
        self.listen_key = Some(listen_key);
        self
    }

    fn build_message(&self, channel: Channel, symbols: &[Symbol]) -> WsMessage {
        let template = channel_template(channel);
        let params = symbols
            .iter()
            .filter_map(|symbol| self.mapper.to_pair(symbol).ok())
            .map(|pair| {
                if channel.is_private() {
                    template.to_string()
                } else {
                    format!("{template}@{pair}")
                }
            })
            .collect::<Vec<_>>();

        let message = MexcWsSub {
            method: "SUBSCRIPTION",
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };
        WsMessage::Text(serde_json::to_string(&message).expect("serializable"))
    }

    fn symbol_for(&self, pair: &str) -> Result<Symbol, DataError> {
        Ok(self.mapper.to_symbol(pair)?)
    }

    fn parse_book_ticker(
        &self,
        envelope: MexcPushEnvelope<MexcBookTickerData>,
    ) -> Result<MarketEvent, DataError> {
        let symbol = self.symbol_for(&envelope.symbol)?;
        let timestamp = envelope.timestamp();
        Ok(MarketEvent::BookTicker {
            symbol,
            ticker: BookTicker {
                bid_price: envelope.data.best_bid_price,
                bid_qty: envelope.data.best_bid_amount,
                ask_price: envelope.data.best_ask_price,
                ask_qty: envelope.data.best_ask_amount,
                timestamp,
                update_id: None,
            },
        })
    }

    fn parse_deal(&self, envelope: MexcPushEnvelope<MexcDealData>) -> Result<MarketEvent, DataError> {
        let symbol = self.symbol_for(&envelope.symbol)?;
        let side = match envelope.data.side {
            1 => Side::Buy,
            2 => Side::Sell,
            other => return Err(DataError::Parse(format!("unknown MEXC trade side: {other}"))),
        };
        let timestamp = Utc
            .timestamp_millis_opt(envelope.data.time_ms)
            .single()
            .unwrap_or_else(Utc::now);
        Ok(MarketEvent::Trade {
            trade: Trade {
                symbol,
                side,
                quantity: envelope.data.quantity,
                price: envelope.data.price,
                timestamp,
                trade_id: None,
                is_maker: None,
                fee: None,
            },
        })
    }

    fn parse_depth(&self, envelope: MexcPushEnvelope<MexcDepthData>) -> Result<MarketEvent, DataError> {
        let symbol = self.symbol_for(&envelope.symbol)?;
        let version: Option<u64> = envelope.data.version.parse().ok();
        let timestamp = envelope.timestamp();
        Ok(MarketEvent::OrderBookDiff {
            symbol,
            bids: envelope.data.bid_levels(),
            asks: envelope.data.ask_levels(),
            timestamp,
            first_update_id: version,
            last_update_id: version,
        })
    }
}

impl ExchangeWsProtocol for MexcProtocol {
    fn url(&self) -> Url {
        let mut url: Url = WS_URL.parse().expect("static URL is valid");
        if let Some(listen_key) = &self.listen_key {
            url.query_pairs_mut().append_pair("listenKey", listen_key);
        }
        url
    }

    fn is_private(&self) -> bool {
        self.listen_key.is_some()
    }

    fn subscribe_messages(&self, symbols: &[Symbol], channels: &[Channel]) -> Vec<WsMessage> {
        channels
            .iter()
            .map(|&channel| self.build_message(channel, symbols))
            .collect()
    }

    fn unsubscribe_messages(&self, symbols: &[Symbol], channels: &[Channel]) -> Vec<WsMessage> {
        // MEXC uses the same "SUBSCRIPTION" method name for unsubscribe,
        // distinguished only by an UNSUBSCRIPTION method string.
        channels
            .iter()
            .map(|&channel| {
                let template = channel_template(channel);
                let params = symbols
                    .iter()
                    .filter_map(|symbol| self.mapper.to_pair(symbol).ok())
                    .map(|pair| format!("{template}@{pair}"))
                    .collect::<Vec<_>>();
                WsMessage::Text(
                    serde_json::to_string(&serde_json::json!({
                        "method": "UNSUBSCRIPTION",
                        "params": params,
                        "id": self.next_id.fetch_add(1, Ordering::Relaxed),
                    }))
                    .expect("serializable"),
                )
            })
            .collect()
    }

    fn parse(&self, message: &WsMessage) -> Vec<Result<MarketEvent, DataError>> {
        let text = match message {
            WsMessage::Text(text) => text,
            WsMessage::Binary(_) => {
                return vec![Err(DataError::UnknownMessageKind(
                    "binary protobuf frame (unsupported)".into(),
                ))]
            }
            _ => return Vec::new(),
        };

        if let Some(ack) = deserialize_or_log::<MexcSubResponse>(text) {
            if ack.code.is_some() {
                return match ack.code {
                    Some(0) => Vec::new(),
                    Some(code) => vec![Err(DataError::Subscribe(format!(
                        "code={code} msg={:?}",
                        ack.msg
                    )))],
                    None => Vec::new(),
                };
            }
        }

        let value: serde_json::Value = match deserialize_or_log(text) {
            Some(value) => value,
            None => return Vec::new(),
        };
        let channel = match value.get("c").and_then(|c| c.as_str()) {
            Some(channel) => channel,
            None => return Vec::new(),
        };

        if channel.starts_with("spot@public.bookTicker") {
            deserialize_or_log::<MexcPushEnvelope<MexcBookTickerData>>(text)
                .map(|envelope| vec![self.parse_book_ticker(envelope)])
                .unwrap_or_default()
        } else if channel.starts_with("spot@public.deals") {
            deserialize_or_log::<MexcPushEnvelope<MexcDealData>>(text)
                .map(|envelope| vec![self.parse_deal(envelope)])
                .unwrap_or_default()
        } else if channel.starts_with("spot@public.increase.depth") {
            deserialize_or_log::<MexcPushEnvelope<MexcDepthData>>(text)
                .map(|envelope| vec![self.parse_depth(envelope)])
                .unwrap_or_default()
        } else {
            vec![Err(DataError::UnknownMessageKind(channel.to_string()))]
        }
    }

    fn heartbeat(&self) -> Option<(Duration, WsMessage)> {
        Some((
            Duration::from_secs(30),
            WsMessage::Text(r#"{"method":"PING"}"#.to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_instrument::SymbolMapper;

    struct StubMapper;
    impl SymbolMapper for StubMapper {
        fn to_pair(&self, symbol: &Symbol) -> Result<String, arc_instrument::SymbolMapError> {
            Ok(format!("{}{}", symbol.base, symbol.quote).to_uppercase())
        }
        fn to_symbol(&self, pair: &str) -> Result<Symbol, arc_instrument::SymbolMapError> {
            Ok(Symbol::spot(&pair[..3], &pair[3..]))
        }
    }

    #[test]
    fn test_subscribe_message_builds_channel_template() {
        let protocol = MexcProtocol::new(Arc::new(StubMapper));
        let messages = protocol.subscribe_messages(&[Symbol::spot("btc", "usdt")], &[Channel::Trades]);
        assert_eq!(messages.len(), 1);
        let WsMessage::Text(text) = &messages[0] else {
            panic!("expected text message");
        };
        assert!(text.contains("spot@public.deals.v3.api@BTCUSDT"));
        assert!(text.contains("\"method\":\"SUBSCRIPTION\""));
    }

    #[test]
    fn test_private_url_embeds_listen_key() {
        let protocol = MexcProtocol::new(Arc::new(StubMapper)).with_listen_key("abc123".into());
        assert!(protocol.url().query().unwrap().contains("listenKey=abc123"));
    }
}
