use super::ExecutionClient;
use crate::balance::{AccountBalance, AssetBalance};
use crate::error::{ApiError, ClientError, ConnectivityError};
use crate::order::{ClientOrderId, Order, OrderId, OrderRequest, OrderStatus, OrderType};
use arc_data::exchange::mexc::rest::MexcSigner;
use arc_instrument::{AssetName, ExchangeId, Side, Symbol, SymbolInfo, SymbolMapper};
use arc_integration::protocol::http::client::{HttpParser, RequestConfig, RestClient};
use arc_integration::rate_limit::{EndpointLimit, EndpointRateLimitTable};
use arc_integration::SocketError;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const REST_BASE_URL: &str = "https://api.mexc.com";
const DEFAULT_CONCURRENCY: usize = 8;

/// MEXC's spot trading endpoints (order placement/cancel/lookup) carry their own
/// per-account weight budget, tighter than the public market-data endpoints.
fn private_rate_limits() -> EndpointRateLimitTable {
    EndpointRateLimitTable::new(
        Duration::from_millis(10),
        &[
            (
                "/api/v3/order",
                EndpointLimit {
                    requests_per_second: 10.0,
                    burst_capacity: 10,
                    weight: 1,
                },
            ),
            (
                "/api/v3/openOrders",
                EndpointLimit {
                    requests_per_second: 10.0,
                    burst_capacity: 10,
                    weight: 1,
                },
            ),
            (
                "/api/v3/account",
                EndpointLimit {
                    requests_per_second: 5.0,
                    burst_capacity: 5,
                    weight: 1,
                },
            ),
        ],
    )
}

#[derive(Debug, Clone, Default)]
pub struct MexcParser;

#[derive(Debug, Clone, Deserialize)]
struct MexcErrorBody {
    code: i64,
    msg: String,
}

impl HttpParser for MexcParser {
    type Error = MexcWireError;

    fn parse<T: DeserializeOwned>(&self, status: StatusCode, payload: &Bytes) -> Result<T, Self::Error> {
        if status.is_success() {
            serde_json::from_slice(payload).map_err(|error| {
                MexcWireError::Parse(format!("{error}: {}", String::from_utf8_lossy(payload)))
            })
        } else {
            match serde_json::from_slice::<MexcErrorBody>(payload) {
                Ok(body) => Err(MexcWireError::Exchange(body.code, body.msg)),
                Err(_) => Err(MexcWireError::Transport(SocketError::HttpResponse(
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

/// Transport-level error surfaced by [`MexcParser`], mapped into
/// [`ClientError`] by each client method via [`ApiError::from_mexc_code`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum MexcWireError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error(transparent)]
    Transport(#[from] SocketError),
    #[error("exchange error {0}: {1}")]
    Exchange(i64, String),
}

fn private_client(api_key: String, api_secret: String) -> RestClient<MexcSigner, MexcParser> {
    RestClient::new(
        REST_BASE_URL.to_string(),
        None,
        MexcSigner::new(api_key, api_secret),
        MexcParser,
        RequestConfig {
            require_auth: true,
            ..RequestConfig::default()
        },
        DEFAULT_CONCURRENCY,
        private_rate_limits(),
    )
}

#[derive(Debug, Clone, Deserialize)]
struct MexcOrderResponse {
    #[serde(rename = "orderId")]
    order_id: String,
    #[serde(rename = "clientOrderId")]
    client_order_id: Option<String>,
    symbol: String,
    side: String,
    #[serde(rename = "type")]
    order_type: String,
    #[serde(rename = "origQty")]
    orig_qty: Decimal,
    price: Option<Decimal>,
    #[serde(rename = "executedQty")]
    executed_qty: Option<Decimal>,
    status: String,
    #[serde(rename = "transactTime")]
    transact_time: Option<i64>,
    #[serde(rename = "timeInForce")]
    time_in_force: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct MexcAccountResponse {
    balances: Vec<MexcAssetBalanceResponse>,
}

#[derive(Debug, Clone, Deserialize)]
struct MexcAssetBalanceResponse {
    asset: String,
    free: Decimal,
    locked: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
struct MexcExchangeInfoResponse {
    symbols: Vec<MexcSymbolResponse>,
}

#[derive(Debug, Clone, Deserialize)]
struct MexcSymbolResponse {
    #[serde(rename = "baseAsset")]
    base_asset: String,
    #[serde(rename = "quoteAsset")]
    quote_asset: String,
    #[serde(rename = "baseAssetPrecision")]
    base_asset_precision: u32,
    #[serde(rename = "quoteAssetPrecision")]
    quote_asset_precision: u32,
    #[serde(rename = "baseSizePrecision")]
    base_size_precision: Option<Decimal>,
    #[serde(rename = "quoteAmountPrecision")]
    quote_amount_precision: Option<Decimal>,
    status: String,
    #[serde(rename = "makerCommission")]
    maker_commission: Option<Decimal>,
    #[serde(rename = "takerCommission")]
    taker_commission: Option<Decimal>,
}

fn rest_to_order_status(status: &str) -> OrderStatus {
    match status {
        "NEW" => OrderStatus::New,
        "PARTIALLY_FILLED" => OrderStatus::PartiallyFilled,
        "FILLED" => OrderStatus::Filled,
        "CANCELED" => OrderStatus::Canceled,
        "PARTIALLY_CANCELED" => OrderStatus::Canceled,
        "REJECTED" => OrderStatus::Rejected,
        "EXPIRED" => OrderStatus::Expired,
        _ => OrderStatus::Rejected,
    }
}

fn rest_to_order(response: MexcOrderResponse, symbol: Symbol) -> Order {
    let quantity = response.orig_qty;
    let filled_quantity = response.executed_qty.unwrap_or(Decimal::ZERO);
    let side = if response.side == "BUY" { Side::Buy } else { Side::Sell };
    let order_type = match response.order_type.as_str() {
        "MARKET" => OrderType::Market,
        "LIMIT_MAKER" => OrderType::LimitMaker,
        "IMMEDIATE_OR_CANCEL" => OrderType::ImmediateOrCancel,
        "FILL_OR_KILL" => OrderType::FillOrKill,
        _ => OrderType::Limit,
    };
    let timestamp = response
        .transact_time
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_else(Utc::now);

    Order {
        symbol,
        order_id: OrderId::new(response.order_id),
        client_order_id: response.client_order_id.map(ClientOrderId::new),
        side,
        order_type,
        quantity,
        price: response.price,
        filled_quantity,
        status: rest_to_order_status(&response.status),
        timestamp,
        avg_price: None,
        fee: None,
        time_in_force: match response.time_in_force.as_deref() {
            Some("IOC") => crate::order::TimeInForce::ImmediateOrCancel,
            Some("FOK") => crate::order::TimeInForce::FillOrKill,
            _ => crate::order::TimeInForce::GoodTilCancel,
        },
    }
}

/// Authenticated MEXC spot trading client. Reuses [`MexcSigner`] from `arc-data` so the
/// REST auth strategy isn't duplicated between the market-data and execution surfaces.
#[derive(Debug)]
pub struct MexcExecutionClient {
    client: RestClient<MexcSigner, MexcParser>,
    mapper: Arc<dyn SymbolMapper + Send + Sync>,
}

impl MexcExecutionClient {
    pub fn new(api_key: String, api_secret: String, mapper: Arc<dyn SymbolMapper + Send + Sync>) -> Self {
        Self {
            client: private_client(api_key, api_secret),
            mapper,
        }
    }

    fn pair(&self, symbol: &Symbol) -> Result<String, ClientError> {
        self.mapper
            .to_pair(symbol)
            .map_err(|error| ClientError::Validation(error.to_string()))
    }

    fn map_exchange_error(error: MexcWireError, symbol: &Symbol) -> ClientError {
        match error {
            MexcWireError::Parse(message) => ClientError::AccountSnapshot(message),
            MexcWireError::Transport(socket) => {
                ClientError::Connectivity(ConnectivityError::Transport(socket))
            }
            MexcWireError::Exchange(code, message) => {
                ClientError::Api(ApiError::from_mexc_code(code, &message, Some(symbol)))
            }
        }
    }
}

impl ExecutionClient for MexcExecutionClient {
    const EXCHANGE: ExchangeId = ExchangeId::MexcSpot;

    async fn place_order(&self, request: OrderRequest) -> Result<Order, ClientError> {
        let pair = self.pair(&request.symbol)?;
        let mut params = BTreeMap::new();
        params.insert("symbol".to_string(), pair);
        params.insert(
            "side".to_string(),
            match request.side {
                Side::Buy => "BUY".to_string(),
                Side::Sell => "SELL".to_string(),
            },
        );
        params.insert("type".to_string(), request.order_type.as_mexc_str().to_string());
        params.insert("quantity".to_string(), request.quantity.to_string());
        if let Some(price) = request.price {
            params.insert("price".to_string(), price.to_string());
        }
        params.insert("timeInForce".to_string(), request.time_in_force.as_mexc_str().to_string());
        if let Some(client_order_id) = &request.client_order_id {
            params.insert("newClientOrderId".to_string(), client_order_id.0.to_string());
        }

        let response: MexcOrderResponse = self
            .client
            .post("/api/v3/order", Some(params), None)
            .await
            .map_err(|error| Self::map_exchange_error(error, &request.symbol))?;

        Ok(rest_to_order(response, request.symbol))
    }

    async fn cancel_order(&self, symbol: &Symbol, order_id: &OrderId) -> Result<(), ClientError> {
        let pair = self.pair(symbol)?;
        let mut params = BTreeMap::new();
        params.insert("symbol".to_string(), pair);
        params.insert("orderId".to_string(), order_id.0.to_string());
        let _: serde_json::Value = self
            .client
            .delete("/api/v3/order", Some(params))
            .await
            .map_err(|error| Self::map_exchange_error(error, symbol))?;
        Ok(())
    }

    async fn fetch_order(&self, symbol: &Symbol, order_id: &OrderId) -> Result<Order, ClientError> {
        let pair = self.pair(symbol)?;
        let mut params = BTreeMap::new();
        params.insert("symbol".to_string(), pair);
        params.insert("orderId".to_string(), order_id.0.to_string());
        let response: MexcOrderResponse = self
            .client
            .get("/api/v3/order", Some(params))
            .await
            .map_err(|error| Self::map_exchange_error(error, symbol))?;
        Ok(rest_to_order(response, symbol.clone()))
    }

    async fn fetch_open_orders(&self) -> Result<Vec<Order>, ClientError> {
        let unknown = Symbol::spot("unknown", "unknown");
        let responses: Vec<MexcOrderResponse> = self
            .client
            .get("/api/v3/openOrders", None)
            .await
            .map_err(|error| Self::map_exchange_error(error, &unknown))?;

        responses
            .into_iter()
            .map(|response| {
                let symbol = self
                    .mapper
                    .to_symbol(&response.symbol)
                    .map_err(|error| ClientError::Validation(error.to_string()))?;
                Ok(rest_to_order(response, symbol))
            })
            .collect()
    }

    async fn fetch_balances(&self) -> Result<Vec<AccountBalance>, ClientError> {
        let unknown = Symbol::spot("unknown", "unknown");
        let response: MexcAccountResponse = self
            .client
            .get("/api/v3/account", None)
            .await
            .map_err(|error| Self::map_exchange_error(error, &unknown))?;

        let now = Utc::now();
        Ok(response
            .balances
            .into_iter()
            .map(|balance| AccountBalance {
                asset: AssetName::new(balance.asset),
                balance: AssetBalance::new(balance.free, balance.locked),
                time_exchange: now,
            })
            .collect())
    }

    async fn fetch_symbol_info(&self) -> Result<Vec<SymbolInfo>, ClientError> {
        let unknown = Symbol::spot("unknown", "unknown");
        let response: MexcExchangeInfoResponse = self
            .client
            .get("/api/v3/exchangeInfo", None)
            .await
            .map_err(|error| Self::map_exchange_error(error, &unknown))?;

        Ok(response
            .symbols
            .into_iter()
            .map(|symbol| SymbolInfo {
                symbol: Symbol::spot(symbol.base_asset, symbol.quote_asset),
                base_precision: symbol.base_asset_precision,
                quote_precision: symbol.quote_asset_precision,
                min_base_amount: symbol.base_size_precision.unwrap_or(Decimal::ZERO),
                min_quote_amount: symbol.quote_amount_precision.unwrap_or(Decimal::ZERO),
                maker_fee: symbol.maker_commission.unwrap_or(Decimal::ZERO),
                taker_fee: symbol.taker_commission.unwrap_or(Decimal::ZERO),
                active: symbol.status == "1" || symbol.status == "ENABLED",
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_to_order_status_maps_partially_filled() {
        assert_eq!(rest_to_order_status("PARTIALLY_FILLED"), OrderStatus::PartiallyFilled);
    }

    #[test]
    fn test_rest_to_order_status_maps_filled() {
        assert_eq!(rest_to_order_status("FILLED"), OrderStatus::Filled);
    }
}
