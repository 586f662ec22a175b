pub mod gateio;
pub mod mexc;

use crate::balance::AccountBalance;
use crate::error::ClientError;
use crate::order::{Order, OrderId, OrderRequest};
use arc_instrument::{ExchangeId, Symbol, SymbolInfo};
use std::future::Future;

/// Authenticated trading surface one exchange client exposes to the Execution Engine
/// and Private-State Tracker.
pub trait ExecutionClient: Send + Sync {
    const EXCHANGE: ExchangeId;

    fn place_order(
        &self,
        request: OrderRequest,
    ) -> impl Future<Output = Result<Order, ClientError>> + Send;

    fn cancel_order(
        &self,
        symbol: &Symbol,
        order_id: &OrderId,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn fetch_order(
        &self,
        symbol: &Symbol,
        order_id: &OrderId,
    ) -> impl Future<Output = Result<Order, ClientError>> + Send;

    fn fetch_open_orders(&self) -> impl Future<Output = Result<Vec<Order>, ClientError>> + Send;

    fn fetch_balances(&self) -> impl Future<Output = Result<Vec<AccountBalance>, ClientError>> + Send;

    fn fetch_symbol_info(&self) -> impl Future<Output = Result<Vec<SymbolInfo>, ClientError>> + Send;
}
