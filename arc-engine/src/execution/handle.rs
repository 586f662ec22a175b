use arc_execution::client::gateio::GateioExecutionClient;
use arc_execution::client::mexc::MexcExecutionClient;
use arc_execution::error::ClientError;
use arc_execution::{Order, OrderId, OrderRequest};
use arc_instrument::{ExchangeId, Symbol};
use std::sync::Arc;

/// A closed set of two concrete exchange clients, dispatched by `match` rather than a
/// trait object - `ExecutionClient`'s async-fn-in-trait methods aren't dyn-compatible,
/// and the workspace only ever speaks to Gate.io and MEXC.
#[derive(Clone)]
pub enum ExchangeHandle {
    Gateio(Arc<GateioExecutionClient>),
    Mexc(Arc<MexcExecutionClient>),
}

impl std::fmt::Debug for ExchangeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExchangeHandle::Gateio(_) => write!(f, "ExchangeHandle::Gateio"),
            ExchangeHandle::Mexc(_) => write!(f, "ExchangeHandle::Mexc"),
        }
    }
}

impl ExchangeHandle {
    pub fn exchange(&self) -> ExchangeId {
        match self {
            ExchangeHandle::Gateio(_) => ExchangeId::GateioSpot,
            ExchangeHandle::Mexc(_) => ExchangeId::MexcSpot,
        }
    }

    pub async fn place_order(&self, request: OrderRequest) -> Result<Order, ClientError> {
        use arc_execution::ExecutionClient;
        match self {
            ExchangeHandle::Gateio(client) => client.place_order(request).await,
            ExchangeHandle::Mexc(client) => client.place_order(request).await,
        }
    }

    pub async fn cancel_order(&self, symbol: &Symbol, order_id: &OrderId) -> Result<(), ClientError> {
        use arc_execution::ExecutionClient;
        match self {
            ExchangeHandle::Gateio(client) => client.cancel_order(symbol, order_id).await,
            ExchangeHandle::Mexc(client) => client.cancel_order(symbol, order_id).await,
        }
    }

    pub async fn fetch_order(&self, symbol: &Symbol, order_id: &OrderId) -> Result<Order, ClientError> {
        use arc_execution::ExecutionClient;
        match self {
            ExchangeHandle::Gateio(client) => client.fetch_order(symbol, order_id).await,
            ExchangeHandle::Mexc(client) => client.fetch_order(symbol, order_id).await,
        }
    }

    pub async fn fetch_open_orders(&self) -> Result<Vec<Order>, ClientError> {
        use arc_execution::ExecutionClient;
        match self {
            ExchangeHandle::Gateio(client) => client.fetch_open_orders().await,
            ExchangeHandle::Mexc(client) => client.fetch_open_orders().await,
        }
    }

    pub async fn fetch_balances(&self) -> Result<Vec<arc_execution::AccountBalance>, ClientError> {
        use arc_execution::ExecutionClient;
        match self {
            ExchangeHandle::Gateio(client) => client.fetch_balances().await,
            ExchangeHandle::Mexc(client) => client.fetch_balances().await,
        }
    }
}
