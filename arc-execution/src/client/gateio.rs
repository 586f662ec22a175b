use super::ExecutionClient;
use crate::balance::{AccountBalance, AssetBalance};
use crate::error::{ApiError, ClientError, ConnectivityError};
use crate::order::{ClientOrderId, Order, OrderId, OrderRequest, OrderStatus, OrderType};
use arc_instrument::{AssetName, ExchangeId, Side, Symbol, SymbolInfo, SymbolMapper};
use arc_integration::protocol::http::client::{HttpParser, RequestConfig, RestClient};
use arc_integration::protocol::http::signer::{SignaturePayload, SignaturePlacement, Signer};
use arc_integration::rate_limit::{EndpointLimit, EndpointRateLimitTable};
use arc_integration::SocketError;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

type HmacSha512 = Hmac<Sha512>;

const REST_BASE_URL: &str = "https://api.gateio.ws/api/v4";
const DEFAULT_CONCURRENCY: usize = 8;

/// Gate.io's spot trading endpoints (order placement/cancel/lookup) share a
/// tighter per-account budget than public market data.
fn private_rate_limits() -> EndpointRateLimitTable {
    EndpointRateLimitTable::new(
        Duration::from_millis(10),
        &[
            (
                "/spot/orders",
                EndpointLimit {
                    requests_per_second: 10.0,
                    burst_capacity: 10,
                    weight: 1,
                },
            ),
            (
                "/spot/open_orders",
                EndpointLimit {
                    requests_per_second: 10.0,
                    burst_capacity: 10,
                    weight: 1,
                },
            ),
            (
                "/spot/accounts",
                EndpointLimit {
                    requests_per_second: 5.0,
                    burst_capacity: 5,
                    weight: 1,
                },
            ),
        ],
    )
}

fn public_rate_limits() -> EndpointRateLimitTable {
    EndpointRateLimitTable::new(
        Duration::from_millis(10),
        &[(
            "/spot/currency_pairs",
            EndpointLimit {
                requests_per_second: 20.0,
                burst_capacity: 20,
                weight: 1,
            },
        )],
    )
}

/// Header-triplet HMAC-SHA512 signing: `{KEY, Timestamp, SIGN}` where `SIGN =
/// hex(HMAC_SHA512(secret, method "\n" path "\n" query "\n" sha512hex(body) "\n"
/// timestamp))`. The key and timestamp are emitted by `sign` itself rather than via
/// [`RestClient`]'s generic `api_key` slot, which unconditionally names its header
/// `X-API-KEY` - wrong for Gate.io.
#[derive(Debug, Clone)]
pub struct GateioSigner {
    api_key: String,
    api_secret: String,
}

impl GateioSigner {
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self { api_key, api_secret }
    }
}

impl Signer for GateioSigner {
    fn sign(&self, payload: SignaturePayload<'_>) -> Vec<SignaturePlacement> {
        let timestamp = payload.timestamp_ms / 1000;
        let body_hash = hex::encode(Sha512::digest(payload.body));
        let canonical = format!(
            "{}\n{}\n{}\n{}\n{}",
            payload.method, payload.path, payload.query, body_hash, timestamp
        );

        let mut mac = HmacSha512::new_from_slice(self.api_secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(canonical.as_bytes());
        let sign = hex::encode(mac.finalize().into_bytes());

        vec![
            SignaturePlacement::Header {
                name: "KEY",
                value: self.api_key.clone(),
            },
            SignaturePlacement::Header {
                name: "Timestamp",
                value: timestamp.to_string(),
            },
            SignaturePlacement::Header { name: "SIGN", value: sign },
        ]
    }
}

#[derive(Debug, Clone, Default)]
pub struct GateioParser;

#[derive(Debug, Clone, Deserialize)]
struct GateioErrorBody {
    label: String,
    message: String,
}

impl HttpParser for GateioParser {
    type Error = GateioWireError;

    fn parse<T: DeserializeOwned>(&self, status: StatusCode, payload: &Bytes) -> Result<T, Self::Error> {
        if status.is_success() {
            serde_json::from_slice(payload).map_err(|error| {
                GateioWireError::Parse(format!("{error}: {}", String::from_utf8_lossy(payload)))
            })
        } else {
            match serde_json::from_slice::<GateioErrorBody>(payload) {
                Ok(body) => Err(GateioWireError::Exchange(body.label, body.message)),
                Err(_) => Err(GateioWireError::Transport(SocketError::HttpResponse(
                    status,
                    String::from_utf8_lossy(payload).to_string(),
                ))),
            }
        }
    }

    fn is_retryable(&self, status: StatusCode, _error: &Self::Error) -> bool {
        status.is_server_error()
    }

    fn is_rate_limited(&self, status: StatusCode, _error: &Self::Error) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS
    }
}

/// Transport-level error surfaced by [`GateioParser`], mapped into
/// [`ClientError`] by each client method via [`ApiError::from_gateio_label`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum GateioWireError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error(transparent)]
    Transport(#[from] SocketError),
    #[error("exchange error {0}: {1}")]
    Exchange(String, String),
}

fn public_client() -> RestClient<arc_integration::protocol::http::signer::NoAuth, GateioParser> {
    RestClient::new(
        REST_BASE_URL.to_string(),
        None,
        arc_integration::protocol::http::signer::NoAuth,
        GateioParser,
        RequestConfig::default(),
        DEFAULT_CONCURRENCY,
        public_rate_limits(),
    )
}

fn private_client(api_key: String, api_secret: String) -> RestClient<GateioSigner, GateioParser> {
    RestClient::new(
        REST_BASE_URL.to_string(),
        None,
        GateioSigner::new(api_key, api_secret),
        GateioParser,
        RequestConfig {
            require_auth: true,
            ..RequestConfig::default()
        },
        DEFAULT_CONCURRENCY,
        private_rate_limits(),
    )
}

#[derive(Debug, Clone, Serialize)]
struct GateioOrderRequest {
    currency_pair: String,
    side: &'static str,
    amount: String,
    #[serde(rename = "type")]
    order_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    price: Option<String>,
    time_in_force: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GateioOrderResponse {
    id: String,
    text: Option<String>,
    currency_pair: String,
    side: String,
    #[serde(rename = "type")]
    order_type: String,
    amount: Decimal,
    price: Option<Decimal>,
    filled_total: Option<Decimal>,
    left: Option<Decimal>,
    status: String,
    create_time_ms: Option<i64>,
    fee: Option<Decimal>,
    avg_deal_price: Option<Decimal>,
    time_in_force: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GateioAccountBalanceResponse {
    currency: String,
    available: Decimal,
    locked: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
struct GateioCurrencyPairResponse {
    id: String,
    base: String,
    quote: String,
    amount_precision: u32,
    precision: u32,
    min_base_amount: Option<Decimal>,
    min_quote_amount: Option<Decimal>,
    trade_status: String,
    fee: Option<Decimal>,
}

fn rest_to_order_status(status: &str, left: Option<Decimal>, amount: Decimal) -> OrderStatus {
    match status {
        "open" if left.unwrap_or(amount) < amount => OrderStatus::PartiallyFilled,
        "open" => OrderStatus::New,
        "closed" => OrderStatus::Filled,
        "cancelled" => OrderStatus::Canceled,
        _ => OrderStatus::Rejected,
    }
}

fn rest_to_order(response: GateioOrderResponse, symbol: Symbol) -> Order {
    let quantity = response.amount;
    let filled_quantity = response
        .filled_total
        .unwrap_or(Decimal::ZERO)
        .max(quantity - response.left.unwrap_or(quantity));
    let status = rest_to_order_status(&response.status, response.left, quantity);
    let side = if response.side == "buy" { Side::Buy } else { Side::Sell };
    let order_type = match response.order_type.as_str() {
        "market" => OrderType::Market,
        "limit_maker" => OrderType::LimitMaker,
        _ => OrderType::Limit,
    };
    let timestamp = response
        .create_time_ms
        .and_then(|ms| DateTime::from_timestamp_millis(ms))
        .unwrap_or_else(Utc::now);

    Order {
        symbol,
        order_id: OrderId::new(response.id),
        client_order_id: response.text.map(ClientOrderId::new),
        side,
        order_type,
        quantity,
        price: response.price,
        filled_quantity,
        status,
        timestamp,
        avg_price: response.avg_deal_price,
        fee: response.fee,
        time_in_force: match response.time_in_force.as_deref() {
            Some("ioc") => crate::order::TimeInForce::ImmediateOrCancel,
            Some("fok") => crate::order::TimeInForce::FillOrKill,
            _ => crate::order::TimeInForce::GoodTilCancel,
        },
    }
}

/// Authenticated Gate.io spot trading client.
#[derive(Debug)]
pub struct GateioExecutionClient {
    client: RestClient<GateioSigner, GateioParser>,
    mapper: Arc<dyn SymbolMapper + Send + Sync>,
}

impl GateioExecutionClient {
    pub fn new(api_key: String, api_secret: String, mapper: Arc<dyn SymbolMapper + Send + Sync>) -> Self {
        Self {
            client: private_client(api_key, api_secret),
            mapper,
        }
    }

    /// Points this client at a custom base URL instead of `https://api.gateio.ws` - for
    /// targeting a sandbox environment, or in tests, a local mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.client.base_url = base_url.into();
        self
    }

    fn pair(&self, symbol: &Symbol) -> Result<String, ClientError> {
        self.mapper
            .to_pair(symbol)
            .map_err(|error| ClientError::Validation(error.to_string()))
    }

    fn map_exchange_error(error: GateioWireError, symbol: &Symbol) -> ClientError {
        match error {
            GateioWireError::Parse(message) => ClientError::AccountSnapshot(message),
            GateioWireError::Transport(socket) => {
                ClientError::Connectivity(ConnectivityError::Transport(socket))
            }
            GateioWireError::Exchange(label, message) => {
                ClientError::Api(ApiError::from_gateio_label(&label, &message, Some(symbol)))
            }
        }
    }
}

impl ExecutionClient for GateioExecutionClient {
    const EXCHANGE: ExchangeId = ExchangeId::GateioSpot;

    async fn place_order(&self, request: OrderRequest) -> Result<Order, ClientError> {
        let pair = self.pair(&request.symbol)?;
        let body = GateioOrderRequest {
            currency_pair: pair.clone(),
            side: match request.side {
                Side::Buy => "buy",
                Side::Sell => "sell",
            },
            amount: request.quantity.to_string(),
            order_type: request.order_type.as_gateio_str(),
            price: request.price.map(|price| price.to_string()),
            time_in_force: request.time_in_force.as_gateio_str(),
            text: request.client_order_id.as_ref().map(|id| format!("t-{}", id.0)),
        };

        let response: GateioOrderResponse = self
            .client
            .post("/spot/orders", None, Some(serde_json::to_value(body).expect("serializable")))
            .await
            .map_err(|error| Self::map_exchange_error(error, &request.symbol))?;

        Ok(rest_to_order(response, request.symbol))
    }

    async fn cancel_order(&self, symbol: &Symbol, order_id: &OrderId) -> Result<(), ClientError> {
        let pair = self.pair(symbol)?;
        let mut params = BTreeMap::new();
        params.insert("currency_pair".to_string(), pair);
        let _: serde_json::Value = self
            .client
            .delete(&format!("/spot/orders/{}", order_id.0), Some(params))
            .await
            .map_err(|error| Self::map_exchange_error(error, symbol))?;
        Ok(())
    }

    async fn fetch_order(&self, symbol: &Symbol, order_id: &OrderId) -> Result<Order, ClientError> {
        let pair = self.pair(symbol)?;
        let mut params = BTreeMap::new();
        params.insert("currency_pair".to_string(), pair);
        let response: GateioOrderResponse = self
            .client
            .get(&format!("/spot/orders/{}", order_id.0), Some(params))
            .await
            .map_err(|error| Self::map_exchange_error(error, symbol))?;
        Ok(rest_to_order(response, symbol.clone()))
    }

    async fn fetch_open_orders(&self) -> Result<Vec<Order>, ClientError> {
        let responses: Vec<GateioOrderResponse> = self
            .client
            .get("/spot/open_orders", None)
            .await
            .map_err(|error| {
                Self::map_exchange_error(error, &Symbol::spot("unknown", "unknown"))
            })?;

        responses
            .into_iter()
            .map(|response| {
                let symbol = self
                    .mapper
                    .to_symbol(&response.currency_pair)
                    .map_err(|error| ClientError::Validation(error.to_string()))?;
                Ok(rest_to_order(response, symbol))
            })
            .collect()
    }

    async fn fetch_balances(&self) -> Result<Vec<AccountBalance>, ClientError> {
        let responses: Vec<GateioAccountBalanceResponse> = self
            .client
            .get("/spot/accounts", None)
            .await
            .map_err(|error| {
                Self::map_exchange_error(error, &Symbol::spot("unknown", "unknown"))
            })?;

        let now = Utc::now();
        Ok(responses
            .into_iter()
            .map(|response| AccountBalance {
                asset: AssetName::new(response.currency),
                balance: AssetBalance::new(response.available, response.locked),
                time_exchange: now,
            })
            .collect())
    }

    async fn fetch_symbol_info(&self) -> Result<Vec<SymbolInfo>, ClientError> {
        let responses: Vec<GateioCurrencyPairResponse> = self
            .client
            .get("/spot/currency_pairs", None)
            .await
            .map_err(|error| {
                Self::map_exchange_error(error, &Symbol::spot("unknown", "unknown"))
            })?;

        Ok(responses
            .into_iter()
            .map(|response| SymbolInfo {
                symbol: Symbol::spot(response.base, response.quote),
                base_precision: response.amount_precision,
                quote_precision: response.precision,
                min_base_amount: response.min_base_amount.unwrap_or(Decimal::ZERO),
                min_quote_amount: response.min_quote_amount.unwrap_or(Decimal::ZERO),
                maker_fee: response.fee.unwrap_or(Decimal::ZERO),
                taker_fee: response.fee.unwrap_or(Decimal::ZERO),
                active: response.trade_status == "tradable",
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_produces_five_element_canonical_string() {
        let signer = GateioSigner::new("key".to_string(), "secret".to_string());
        let placements = signer.sign(SignaturePayload {
            method: reqwest::Method::POST,
            path: "/api/v4/spot/orders",
            query: "",
            body: b"{}",
            timestamp_ms: 1_700_000_000_000,
        });
        assert_eq!(placements.len(), 3);
        assert!(matches!(&placements[0], SignaturePlacement::Header { name, .. } if *name == "KEY"));
        assert!(matches!(&placements[1], SignaturePlacement::Header { name, .. } if *name == "Timestamp"));
        assert!(matches!(&placements[2], SignaturePlacement::Header { name, .. } if *name == "SIGN"));
    }

    #[test]
    fn test_rest_to_order_status_detects_partial_fill() {
        let status = rest_to_order_status("open", Some(Decimal::new(5, 1)), Decimal::ONE);
        assert_eq!(status, OrderStatus::PartiallyFilled);
    }
}
