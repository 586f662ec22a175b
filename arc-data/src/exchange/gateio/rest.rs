use super::message::GateioOrderBookSnapshot;
use crate::books::Level;
use crate::error::DataError;
use arc_integration::protocol::http::client::{HttpParser, RequestConfig, RestClient};
use arc_integration::protocol::http::signer::NoAuth;
use arc_integration::rate_limit::{EndpointLimit, EndpointRateLimitTable};
use arc_integration::SocketError;
use bytes::Bytes;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;

const DEFAULT_CONCURRENCY: usize = 8;

const REST_BASE_URL: &str = "https://api.gateio.ws/api/v4";

/// Gate.io's public spot endpoints share one generous per-IP budget; there is no
/// per-endpoint split worth modelling since this client only ever calls `/spot/order_book`.
fn public_rate_limits() -> EndpointRateLimitTable {
    EndpointRateLimitTable::new(
        Duration::from_millis(10),
        &[(
            "/spot/order_book",
            EndpointLimit {
                requests_per_second: 20.0,
                burst_capacity: 20,
                weight: 1,
            },
        )],
    )
}

/// Minimal response parser for Gate.io's public REST endpoints: errors are plain JSON
/// bodies with a `label`/`message` pair.
#[derive(Debug, Clone, Default)]
pub struct GateioParser;

impl HttpParser for GateioParser {
    type Error = DataError;

    fn parse<T: DeserializeOwned>(&self, status: StatusCode, payload: &Bytes) -> Result<T, Self::Error> {
        if status.is_success() {
            serde_json::from_slice(payload).map_err(|error| {
                DataError::Parse(format!("{error}: {}", String::from_utf8_lossy(payload)))
            })
        } else {
            Err(DataError::Transport(SocketError::HttpResponse(
                status,
                String::from_utf8_lossy(payload).to_string(),
            )))
        }
    }

    fn is_retryable(&self, status: StatusCode, _error: &Self::Error) -> bool {
        status.is_server_error()
    }

    fn is_rate_limited(&self, status: StatusCode, _error: &Self::Error) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS
    }
}

pub fn public_client() -> RestClient<NoAuth, GateioParser> {
    RestClient::new(
        REST_BASE_URL.to_string(),
        None,
        NoAuth,
        GateioParser,
        RequestConfig::default(),
        DEFAULT_CONCURRENCY,
        public_rate_limits(),
    )
}

/// Fetch an order book snapshot for `pair` via `GET /spot/order_book`.
pub async fn fetch_order_book_snapshot(
    client: &RestClient<NoAuth, GateioParser>,
    pair: &str,
    limit: u32,
) -> Result<(Vec<Level>, Vec<Level>, Option<u64>), DataError> {
    let mut params = BTreeMap::new();
    params.insert("currency_pair".to_string(), pair.to_string());
    params.insert("limit".to_string(), limit.to_string());
    params.insert("with_id".to_string(), "true".to_string());

    let snapshot: GateioOrderBookSnapshot = client.get("/spot/order_book", Some(params)).await?;

    let bids = snapshot.bids.iter().map(|(p, s)| Level::new(*p, *s)).collect();
    let asks = snapshot.asks.iter().map(|(p, s)| Level::new(*p, *s)).collect();
    Ok((bids, asks, snapshot.id))
}
