pub mod handle;

pub use handle::ExchangeHandle;

use crate::scanner::ArbitrageOpportunity;
use arc_data::MarketDataHub;
use arc_execution::error::ClientError;
use arc_execution::tracker::PrivateStateTracker;
use arc_execution::{Order, OrderId, OrderRequest, OrderStatus};
use arc_instrument::{ExchangeId, Side, Symbol};
use arc_risk::{RiskCheckContext, RiskLimits};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{info, warn};

/// Execution Engine state machine driving one paired trade. Each instance owns exactly
/// one opportunity; concurrency across trades is the Task Manager's concern, not this
/// type's.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ExecutionState {
    Idle,
    Validating,
    Entering,
    Hedging,
    Monitoring,
    Exiting,
    Completed,
    Failed { reason: String },
    Aborted { reason: String },
}

impl ExecutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionState::Completed | ExecutionState::Failed { .. } | ExecutionState::Aborted { .. }
        )
    }
}

/// One side of the paired trade - either leg may be partially filled independently of
/// the other.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Leg {
    pub exchange: ExchangeId,
    pub side: Side,
    pub target_quantity: Decimal,
    pub filled_quantity: Decimal,
    pub price: Decimal,
    pub order_id: Option<OrderId>,
    pub status: OrderStatus,
}

impl Leg {
    pub(crate) fn new(exchange: ExchangeId, side: Side, target_quantity: Decimal, price: Decimal) -> Self {
        Self {
            exchange,
            side,
            target_quantity,
            filled_quantity: Decimal::ZERO,
            price,
            order_id: None,
            status: OrderStatus::New,
        }
    }

    fn apply_fill(&mut self, order: &Order) {
        self.filled_quantity = order.filled_quantity;
        self.status = order.status;
        if let Some(price) = order.avg_price {
            self.price = price;
        }
    }

    fn remaining(&self) -> Decimal {
        (self.target_quantity - self.filled_quantity).max(Decimal::ZERO)
    }
}

/// Drives one [`ArbitrageOpportunity`] through IDLE→VALIDATING→ENTERING→
/// HEDGING→MONITORING→EXITING→COMPLETED/FAILED/ABORTED.
#[derive(Debug, Clone)]
pub struct ArbitrageExecution {
    pub opportunity: ArbitrageOpportunity,
    pub buy_leg: Leg,
    pub sell_leg: Leg,
    pub state: ExecutionState,
    pub dry_run: bool,
    pub delta_tolerance: Decimal,
    pub started_at: Option<DateTime<Utc>>,
    pub realized_pnl: Option<Decimal>,
}

impl ArbitrageExecution {
    pub fn new(opportunity: ArbitrageOpportunity, dry_run: bool, delta_tolerance: Decimal) -> Self {
        let buy_leg = Leg::new(
            opportunity.buy_exchange,
            Side::Buy,
            opportunity.max_quantity,
            opportunity.buy_price,
        );
        let sell_leg = Leg::new(
            opportunity.sell_exchange,
            Side::Sell,
            opportunity.max_quantity,
            opportunity.sell_price,
        );
        Self {
            opportunity,
            buy_leg,
            sell_leg,
            state: ExecutionState::Idle,
            dry_run,
            delta_tolerance,
            started_at: None,
            realized_pnl: None,
        }
    }

    fn symbol(&self) -> &Symbol {
        &self.opportunity.symbol
    }

    fn abort(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(opportunity_id = %self.opportunity.opportunity_id, %reason, "execution aborted");
        self.state = ExecutionState::Aborted { reason };
    }

    fn fail(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(opportunity_id = %self.opportunity.opportunity_id, %reason, "execution failed");
        self.state = ExecutionState::Failed { reason };
    }

    /// IDLE→VALIDATING: re-evaluate prices against the latest hub snapshot and run the
    /// standard risk checks.
    pub fn validate(
        &mut self,
        hub: &MarketDataHub,
        limits: &RiskLimits,
        buy_tracker: &PrivateStateTracker,
        sell_tracker: &PrivateStateTracker,
    ) {
        debug_assert!(self.state == ExecutionState::Idle);

        let Some((best_bid, best_ask)) = hub.best_bid_ask(self.buy_leg.exchange, self.symbol()) else {
            self.abort("no current market data for buy-leg exchange");
            return;
        };
        let _ = best_bid;
        if best_ask.price > self.opportunity.buy_price * (Decimal::ONE + Decimal::new(5, 4)) {
            self.abort("buy-leg price moved beyond tolerance since opportunity was scanned");
            return;
        }

        let Some((sell_best_bid, _)) = hub.best_bid_ask(self.sell_leg.exchange, self.symbol()) else {
            self.abort("no current market data for sell-leg exchange");
            return;
        };
        if sell_best_bid.price < self.opportunity.sell_price * (Decimal::ONE - Decimal::new(5, 4)) {
            self.abort("sell-leg price moved beyond tolerance since opportunity was scanned");
            return;
        }

        let notional = self.opportunity.buy_price * self.opportunity.max_quantity;
        let buy_asset_balance = buy_tracker
            .balance(&self.symbol().quote)
            .map(|b| b.balance.free)
            .unwrap_or(Decimal::ZERO);
        let sell_asset_balance = sell_tracker
            .balance(&self.symbol().base)
            .map(|b| b.balance.free * self.opportunity.sell_price)
            .unwrap_or(Decimal::ZERO);

        let context = RiskCheckContext {
            symbol: self.symbol().clone(),
            order_notional_usd: notional,
            projected_position_usd: notional,
            available_balance_buy_usd: buy_asset_balance,
            available_balance_sell_usd: sell_asset_balance,
            profit_margin_bps: self.opportunity.spread_pct * Decimal::from(100),
            concurrent_tasks: 0,
        };

        let violations = arc_risk::run_standard_checks(limits, &context);
        if let Some(violation) = violations.into_iter().next() {
            self.abort(format!("risk check failed: {violation:?}"));
            return;
        }

        self.started_at = Some(Utc::now());
        self.state = ExecutionState::Entering;
        info!(opportunity_id = %self.opportunity.opportunity_id, "validated, entering");
    }

    /// VALIDATING→ENTERING: issue the two paired orders. The harder-to-fill leg - the
    /// shallower-depth venue - goes first.
    pub async fn enter(
        &mut self,
        buy_client: &ExchangeHandle,
        sell_client: &ExchangeHandle,
        hub: &MarketDataHub,
    ) {
        debug_assert!(self.state == ExecutionState::Entering);

        let buy_depth = hub
            .best_bid_ask(self.buy_leg.exchange, self.symbol())
            .map(|(_, ask)| ask.size)
            .unwrap_or(Decimal::ZERO);
        let sell_depth = hub
            .best_bid_ask(self.sell_leg.exchange, self.symbol())
            .map(|(bid, _)| bid.size)
            .unwrap_or(Decimal::ZERO);

        let (first_leg_is_buy, _) = if buy_depth <= sell_depth {
            (true, buy_depth)
        } else {
            (false, sell_depth)
        };

        if self.dry_run {
            self.buy_leg.status = OrderStatus::Filled;
            self.buy_leg.filled_quantity = self.buy_leg.target_quantity;
            self.sell_leg.status = OrderStatus::Filled;
            self.sell_leg.filled_quantity = self.sell_leg.target_quantity;
            info!(opportunity_id = %self.opportunity.opportunity_id, "dry-run: recorded intended orders without REST calls");
            self.state = ExecutionState::Hedging;
            return;
        }

        let result = if first_leg_is_buy {
            let buy_result = self.place_leg(buy_client, Side::Buy).await;
            let sell_result = self.place_leg(sell_client, Side::Sell).await;
            (buy_result, sell_result)
        } else {
            let sell_result = self.place_leg(sell_client, Side::Sell).await;
            let buy_result = self.place_leg(buy_client, Side::Buy).await;
            (buy_result, sell_result)
        };

        match result {
            (Ok(buy_order), Ok(sell_order)) => {
                self.buy_leg.order_id = Some(buy_order.order_id.clone());
                self.buy_leg.apply_fill(&buy_order);
                self.sell_leg.order_id = Some(sell_order.order_id.clone());
                self.sell_leg.apply_fill(&sell_order);
                self.state = ExecutionState::Hedging;
            }
            (Ok(filled), Err(error)) | (Err(error), Ok(filled)) => {
                warn!(opportunity_id = %self.opportunity.opportunity_id, %error, "one leg failed outright, rolling back the other");
                let client = if filled.side == Side::Buy { buy_client } else { sell_client };
                if let Err(cancel_error) = client.cancel_order(self.symbol(), &filled.order_id).await {
                    warn!(%cancel_error, "rollback cancel also failed");
                }
                self.abort(format!("one leg failed ({error}), rolled back the other"));
            }
            (Err(buy_error), Err(sell_error)) => {
                self.abort(format!("both legs failed: buy={buy_error}, sell={sell_error}"));
            }
        }
    }

    async fn place_leg(&self, client: &ExchangeHandle, side: Side) -> Result<Order, ClientError> {
        let (quantity, price) = match side {
            Side::Buy => (self.buy_leg.target_quantity, self.buy_leg.price),
            Side::Sell => (self.sell_leg.target_quantity, self.sell_leg.price),
        };
        let request = OrderRequest::limit(self.symbol().clone(), side, quantity, price);
        client.place_order(request).await
    }

    /// ENTERING/HEDGING: track the delta-neutrality invariant and place a rebalancing
    /// order if the two legs' fills have drifted apart beyond `delta_tolerance`.
    pub async fn rebalance_if_needed(&mut self, hedge_client: &ExchangeHandle) {
        let delta = (self.buy_leg.filled_quantity - self.sell_leg.filled_quantity).abs();
        if delta <= self.delta_tolerance {
            self.state = ExecutionState::Monitoring;
            return;
        }

        if self.dry_run {
            if self.buy_leg.filled_quantity > self.sell_leg.filled_quantity {
                self.sell_leg.filled_quantity = self.buy_leg.filled_quantity;
            } else {
                self.buy_leg.filled_quantity = self.sell_leg.filled_quantity;
            }
            self.state = ExecutionState::Monitoring;
            return;
        }

        let (gap_side, gap_quantity) = if self.buy_leg.filled_quantity > self.sell_leg.filled_quantity {
            (Side::Sell, delta)
        } else {
            (Side::Buy, delta)
        };

        let request = OrderRequest::market(self.symbol().clone(), gap_side, gap_quantity);
        match hedge_client.place_order(request).await {
            Ok(order) => {
                match gap_side {
                    Side::Buy => self.buy_leg.apply_fill(&order),
                    Side::Sell => self.sell_leg.apply_fill(&order),
                }
                info!(opportunity_id = %self.opportunity.opportunity_id, %gap_quantity, "placed hedging order to close delta gap");
                self.state = ExecutionState::Monitoring;
            }
            Err(error) => {
                self.fail(format!("hedging order to close delta gap failed: {error}"));
            }
        }
    }

    /// MONITORING→EXITING: net spread fell below the exit threshold, or the position
    /// has been held past `max_hold`.
    pub fn check_exit_condition(
        &mut self,
        hub: &MarketDataHub,
        exit_spread_bps: Decimal,
        max_hold: Duration,
    ) {
        debug_assert!(self.state == ExecutionState::Monitoring);

        let held_too_long = self
            .started_at
            .and_then(|start| Utc::now().signed_duration_since(start).to_std().ok())
            .map(|elapsed| elapsed >= max_hold)
            .unwrap_or(false);

        let spread_closed = hub
            .best_bid_ask(self.sell_leg.exchange, self.symbol())
            .zip(hub.best_bid_ask(self.buy_leg.exchange, self.symbol()))
            .map(|((sell_bid, _), (_, buy_ask))| {
                let spread = sell_bid.price - buy_ask.price;
                let bps = spread / buy_ask.price.max(Decimal::new(1, 8)) * Decimal::from(10_000);
                bps < exit_spread_bps
            })
            .unwrap_or(false);

        if held_too_long || spread_closed {
            self.state = ExecutionState::Exiting;
        }
    }

    /// EXITING→COMPLETED: unwind is a no-op here since both legs already hold matched
    /// spot inventory at rest - records realized P&L from the two legs' average fill
    /// prices.
    pub fn complete(&mut self) {
        debug_assert!(self.state == ExecutionState::Exiting);

        let matched_quantity = self.buy_leg.filled_quantity.min(self.sell_leg.filled_quantity);
        let pnl = (self.sell_leg.price - self.buy_leg.price) * matched_quantity;
        self.realized_pnl = Some(pnl);
        info!(opportunity_id = %self.opportunity.opportunity_id, %pnl, "execution completed");
        self.state = ExecutionState::Completed;
    }

    /// External cancel request at any non-terminal state: cancel all open legs via
    /// REST, wait for confirmed terminal status, transition to ABORTED.
    pub async fn cancel(&mut self, buy_client: &ExchangeHandle, sell_client: &ExchangeHandle) {
        if self.state.is_terminal() {
            return;
        }

        for (leg, client) in [(&self.buy_leg, buy_client), (&self.sell_leg, sell_client)] {
            if let Some(order_id) = &leg.order_id {
                if !leg.status.is_terminal() {
                    if let Err(error) = client.cancel_order(self.symbol(), order_id).await {
                        warn!(%error, %order_id, "cancel request failed during external cancellation");
                    }
                }
            }
        }

        self.abort("cancelled by external request");
    }

    /// Queries the exchange for an order whose placement ack was not observed within
    /// `order_ack_timeout`. If the order is still unknown afterwards, fails the
    /// execution and records the inconsistency.
    pub async fn resolve_ack_timeout(&mut self, client: &ExchangeHandle, order_id: &OrderId) {
        match client.fetch_order(self.symbol(), order_id).await {
            Ok(order) => {
                if order.side == Side::Buy {
                    self.buy_leg.apply_fill(&order);
                } else {
                    self.sell_leg.apply_fill(&order);
                }
            }
            Err(error) => {
                self.fail(format!(
                    "order {order_id} ack timed out and REST query also failed ({error}); inconsistency recorded for operator attention"
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn opportunity() -> ArbitrageOpportunity {
        ArbitrageOpportunity {
            opportunity_id: "test-opp".to_string(),
            symbol: Symbol::spot("btc", "usdt"),
            buy_exchange: ExchangeId::GateioSpot,
            sell_exchange: ExchangeId::MexcSpot,
            buy_price: dec!(100.0),
            sell_price: dec!(100.5),
            spread: dec!(0.5),
            spread_pct: dec!(0.3),
            max_quantity: dec!(1.0),
            estimated_profit: dec!(0.2995),
            confidence: dec!(0.8),
            timestamp: Utc::now(),
            expiry: Utc::now() + chrono::Duration::milliseconds(200),
        }
    }

    // Buy leg fills 1.0 BTC, sell leg fills only 0.4 BTC - delta of 0.6
    // must trigger a rebalancing action in dry-run.
    #[tokio::test]
    async fn test_scenario_s4_partial_fill_triggers_rebalance() {
        let mut execution = ArbitrageExecution::new(opportunity(), true, dec!(0.001));
        execution.state = ExecutionState::Hedging;
        execution.buy_leg.filled_quantity = dec!(1.0);
        execution.sell_leg.filled_quantity = dec!(0.4);

        let handle = ExchangeHandle::Gateio(std::sync::Arc::new(
            arc_execution::client::gateio::GateioExecutionClient::new(
                "key".to_string(),
                "secret".to_string(),
                std::sync::Arc::new(arc_data::exchange::gateio::symbol::GateioSymbolMapper::default()),
            ),
        ));

        execution.rebalance_if_needed(&handle).await;

        assert_eq!(execution.buy_leg.filled_quantity, execution.sell_leg.filled_quantity);
        assert_eq!(execution.state, ExecutionState::Monitoring);
    }

    // Same S4 scenario but with dry_run = false: the gap must be closed by an actual
    // market order placed through the hedge client, not the dry-run shortcut.
    #[tokio::test]
    async fn test_scenario_s4_partial_fill_places_real_hedge_order() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/spot/orders")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "id": "hedge-1",
                    "text": null,
                    "currency_pair": "BTC_USDT",
                    "side": "sell",
                    "type": "market",
                    "amount": "0.6",
                    "price": null,
                    "filled_total": "0.6",
                    "left": "0",
                    "status": "closed",
                    "create_time_ms": 1700000000000,
                    "fee": null,
                    "avg_deal_price": "100.5",
                    "time_in_force": null
                }"#,
            )
            .create_async()
            .await;

        let mut execution = ArbitrageExecution::new(opportunity(), false, dec!(0.001));
        execution.state = ExecutionState::Hedging;
        execution.buy_leg.filled_quantity = dec!(1.0);
        execution.sell_leg.filled_quantity = dec!(0.4);

        let client = arc_execution::client::gateio::GateioExecutionClient::new(
            "key".to_string(),
            "secret".to_string(),
            std::sync::Arc::new(arc_data::exchange::gateio::symbol::GateioSymbolMapper::default()),
        )
        .with_base_url(server.url());
        let handle = ExchangeHandle::Gateio(std::sync::Arc::new(client));

        execution.rebalance_if_needed(&handle).await;

        mock.assert_async().await;
        assert_eq!(execution.sell_leg.filled_quantity, dec!(0.6));
        assert_eq!(execution.sell_leg.status, OrderStatus::Filled);
        assert_eq!(execution.state, ExecutionState::Monitoring);
    }

    #[test]
    fn test_validate_aborts_when_no_market_data() {
        let hub = MarketDataHub::new();
        let mut execution = ArbitrageExecution::new(opportunity(), true, dec!(0.001));
        let buy_tracker = PrivateStateTracker::default();
        let sell_tracker = PrivateStateTracker::default();
        let limits = RiskLimits {
            max_position_size_usd: dec!(100000),
            min_profit_margin_bps: dec!(1),
            max_concurrent_tasks: 4,
            max_order_notional_usd: dec!(100000),
        };

        execution.validate(&hub, &limits, &buy_tracker, &sell_tracker);
        assert!(matches!(execution.state, ExecutionState::Aborted { .. }));
    }

    #[test]
    fn test_complete_records_realized_pnl() {
        let mut execution = ArbitrageExecution::new(opportunity(), true, dec!(0.001));
        execution.state = ExecutionState::Exiting;
        execution.buy_leg.filled_quantity = dec!(1.0);
        execution.sell_leg.filled_quantity = dec!(1.0);

        execution.complete();

        assert_eq!(execution.state, ExecutionState::Completed);
        assert_eq!(execution.realized_pnl, Some(dec!(0.5)));
    }
}
