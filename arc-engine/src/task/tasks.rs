use super::{ContextDeltas, Task, TaskId, TaskStepOutcome};
use crate::execution::{ArbitrageExecution, ExchangeHandle, ExecutionState};
use crate::scanner::ArbitrageOpportunity;
use arc_data::MarketDataHub;
use arc_execution::tracker::PrivateStateTracker;
use arc_execution::{OrderRequest, OrderStatus};
use arc_instrument::{ExchangeId, Side, Symbol};
use arc_risk::RiskLimits;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Wraps the Execution Engine state machine as a Task Manager-visible task.
pub struct SpotFuturesArbitrageTask {
    id: TaskId,
    execution: ArbitrageExecution,
    buy_client: ExchangeHandle,
    sell_client: ExchangeHandle,
    buy_tracker: Arc<PrivateStateTracker>,
    sell_tracker: Arc<PrivateStateTracker>,
    hub: Arc<MarketDataHub>,
    limits: RiskLimits,
    running: bool,
    exit_spread_bps: Decimal,
    max_hold: Duration,
}

impl SpotFuturesArbitrageTask {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        opportunity: ArbitrageOpportunity,
        dry_run: bool,
        delta_tolerance: Decimal,
        buy_client: ExchangeHandle,
        sell_client: ExchangeHandle,
        buy_tracker: Arc<PrivateStateTracker>,
        sell_tracker: Arc<PrivateStateTracker>,
        hub: Arc<MarketDataHub>,
        limits: RiskLimits,
        exit_spread_bps: Decimal,
        max_hold: Duration,
        timestamp_ms: i64,
    ) -> Self {
        let id = TaskId::new(
            timestamp_ms,
            "spot_futures_arbitrage",
            &opportunity.symbol,
            Side::Buy,
        );
        Self {
            id,
            execution: ArbitrageExecution::new(opportunity, dry_run, delta_tolerance),
            buy_client,
            sell_client,
            buy_tracker,
            sell_tracker,
            hub,
            limits,
            running: false,
            exit_spread_bps,
            max_hold,
        }
    }
}

#[async_trait]
impl Task for SpotFuturesArbitrageTask {
    fn id(&self) -> &TaskId {
        &self.id
    }

    fn task_type(&self) -> &'static str {
        "spot_futures_arbitrage"
    }

    fn start(&mut self) {
        self.running = true;
    }

    fn pause(&mut self) {
        self.running = false;
    }

    fn stop(&mut self) {
        self.running = false;
        self.execution.state = ExecutionState::Aborted {
            reason: "stopped by task manager".to_string(),
        };
    }

    fn update(&mut self, deltas: ContextDeltas) {
        if let Some(bps) = deltas.get("exit_spread_bps").and_then(|v| v.as_str()).and_then(|s| s.parse().ok()) {
            self.exit_spread_bps = bps;
        }
    }

    async fn execute_once(&mut self) -> TaskStepOutcome {
        if !self.running {
            return TaskStepOutcome {
                next_delay: Duration::from_millis(500),
                should_continue: true,
                state: "paused".to_string(),
            };
        }

        match self.execution.state.clone() {
            ExecutionState::Idle => {
                self.execution.validate(&self.hub, &self.limits, &self.buy_tracker, &self.sell_tracker);
            }
            ExecutionState::Entering => {
                self.execution.enter(&self.buy_client, &self.sell_client, &self.hub).await;
            }
            ExecutionState::Hedging => {
                self.execution.rebalance_if_needed(&self.sell_client).await;
            }
            ExecutionState::Monitoring => {
                self.execution.check_exit_condition(&self.hub, self.exit_spread_bps, self.max_hold);
            }
            ExecutionState::Exiting => {
                self.execution.complete();
            }
            ExecutionState::Validating | ExecutionState::Completed | ExecutionState::Failed { .. } | ExecutionState::Aborted { .. } => {}
        }

        let terminal = self.execution.state.is_terminal();
        TaskStepOutcome {
            next_delay: if terminal { Duration::ZERO } else { Duration::from_millis(100) },
            should_continue: !terminal,
            state: format!("{:?}", self.execution.state),
        }
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(PersistedExecution {
            opportunity: self.execution.opportunity.clone(),
            buy_leg: self.execution.buy_leg.clone(),
            sell_leg: self.execution.sell_leg.clone(),
            state: self.execution.state.clone(),
            dry_run: self.execution.dry_run,
            delta_tolerance: self.execution.delta_tolerance,
            exit_spread_bps: self.exit_spread_bps,
            max_hold_secs: self.max_hold.as_secs(),
        })
        .unwrap_or_default()
    }
}

/// Everything needed to rebuild a [`SpotFuturesArbitrageTask`] after a restart.
/// Legs are reconciled against live exchange state before the task resumes
/// ticking - a crash-persisted fill quantity is a hint, not a source of truth.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PersistedExecution {
    pub opportunity: ArbitrageOpportunity,
    pub buy_leg: crate::execution::Leg,
    pub sell_leg: crate::execution::Leg,
    pub state: ExecutionState,
    pub dry_run: bool,
    pub delta_tolerance: Decimal,
    pub exit_spread_bps: Decimal,
    pub max_hold_secs: u64,
}

impl SpotFuturesArbitrageTask {
    /// Rebuild a task from a persisted snapshot plus freshly-fetched open
    /// orders and balances on both venues, reconciling leg fill state
    /// against what the exchanges actually report rather than trusting the
    /// pre-crash snapshot. Never places a fresh entry order: a task
    /// recovered mid-MONITORING resumes in MONITORING, it does not re-enter.
    #[allow(clippy::too_many_arguments)]
    pub async fn from_snapshot(
        id: TaskId,
        persisted: &serde_json::Value,
        buy_client: ExchangeHandle,
        sell_client: ExchangeHandle,
        buy_tracker: Arc<PrivateStateTracker>,
        sell_tracker: Arc<PrivateStateTracker>,
        hub: Arc<MarketDataHub>,
        limits: RiskLimits,
    ) -> Result<Self, serde_json::Error> {
        let persisted: PersistedExecution = serde_json::from_value(persisted.clone())?;

        let mut execution = ArbitrageExecution::new(persisted.opportunity, persisted.dry_run, persisted.delta_tolerance);
        execution.buy_leg = persisted.buy_leg;
        execution.sell_leg = persisted.sell_leg;
        execution.state = persisted.state;

        if let Ok(open_orders) = buy_client.fetch_open_orders().await {
            reconcile_leg(&mut execution.buy_leg, &open_orders);
        }
        if let Ok(open_orders) = sell_client.fetch_open_orders().await {
            reconcile_leg(&mut execution.sell_leg, &open_orders);
        }

        info!(task_id = %id, state = ?execution.state, "reconciled spot/futures arbitrage task from persisted snapshot");

        Ok(Self {
            id,
            execution,
            buy_client,
            sell_client,
            buy_tracker,
            sell_tracker,
            hub,
            limits,
            running: true,
            exit_spread_bps: persisted.exit_spread_bps,
            max_hold: Duration::from_secs(persisted.max_hold_secs),
        })
    }
}

/// Overwrites `leg`'s fill state with whatever the exchange's open-orders
/// snapshot reports for the order id the leg was last known to be tracking.
/// An order no longer present in the open-orders list is treated as fully
/// resolved (filled or otherwise terminal) and the leg's last-known fill is
/// kept as-is.
fn reconcile_leg(leg: &mut crate::execution::Leg, open_orders: &[arc_execution::Order]) {
    let Some(order_id) = &leg.order_id else { return };
    if let Some(order) = open_orders.iter().find(|o| &o.order_id == order_id) {
        leg.filled_quantity = order.filled_quantity;
        leg.status = order.status;
        if let Some(price) = order.avg_price {
            leg.price = price;
        }
    }
}

/// Periodic REST reconciliation of balances and open orders against a single
/// exchange - the simplest task, and the one the Task Manager's recovery path
/// exercises most often since it has no in-flight orders to reconcile.
pub struct BalanceSyncTask {
    id: TaskId,
    client: ExchangeHandle,
    tracker: Arc<PrivateStateTracker>,
    interval: Duration,
    running: bool,
}

impl BalanceSyncTask {
    pub fn new(client: ExchangeHandle, tracker: Arc<PrivateStateTracker>, interval: Duration, timestamp_ms: i64) -> Self {
        let exchange = client.exchange();
        let id = TaskId(format!("{timestamp_ms}_balance_sync_{exchange}"));
        Self {
            id,
            client,
            tracker,
            interval,
            running: false,
        }
    }
}

#[async_trait]
impl Task for BalanceSyncTask {
    fn id(&self) -> &TaskId {
        &self.id
    }

    fn task_type(&self) -> &'static str {
        "balance_sync"
    }

    fn start(&mut self) {
        self.running = true;
    }

    fn pause(&mut self) {
        self.running = false;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn update(&mut self, _deltas: ContextDeltas) {}

    async fn execute_once(&mut self) -> TaskStepOutcome {
        if self.running {
            match self.client.fetch_balances().await {
                Ok(balances) => self.tracker.resync_balances(balances),
                Err(error) => warn!(%error, task_id = %self.id, "balance sync failed, keeping stale snapshot"),
            }
        }

        TaskStepOutcome {
            next_delay: self.interval,
            should_continue: true,
            state: "running".to_string(),
        }
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({ "exchange": self.client.exchange().to_string() })
    }
}

/// Splits one large order into slices tracking top-of-book depth, so each child order
/// doesn't move the market more than the venue can absorb.
pub struct IcebergTask {
    id: TaskId,
    client: ExchangeHandle,
    symbol: Symbol,
    side: Side,
    total_quantity: Decimal,
    slice_quantity: Decimal,
    filled_quantity: Decimal,
    limit_price: Decimal,
    hub: Arc<MarketDataHub>,
    running: bool,
}

impl IcebergTask {
    pub fn new(
        client: ExchangeHandle,
        symbol: Symbol,
        side: Side,
        total_quantity: Decimal,
        slice_quantity: Decimal,
        limit_price: Decimal,
        hub: Arc<MarketDataHub>,
        timestamp_ms: i64,
    ) -> Self {
        let id = TaskId::new(timestamp_ms, "iceberg", &symbol, side);
        Self {
            id,
            client,
            symbol,
            side,
            total_quantity,
            slice_quantity,
            filled_quantity: Decimal::ZERO,
            limit_price,
            hub,
            running: false,
        }
    }

    fn remaining(&self) -> Decimal {
        (self.total_quantity - self.filled_quantity).max(Decimal::ZERO)
    }
}

#[async_trait]
impl Task for IcebergTask {
    fn id(&self) -> &TaskId {
        &self.id
    }

    fn task_type(&self) -> &'static str {
        "iceberg"
    }

    fn start(&mut self) {
        self.running = true;
    }

    fn pause(&mut self) {
        self.running = false;
    }

    fn stop(&mut self) {
        self.running = false;
        self.filled_quantity = self.total_quantity;
    }

    fn update(&mut self, _deltas: ContextDeltas) {}

    async fn execute_once(&mut self) -> TaskStepOutcome {
        if !self.running || self.remaining().is_zero() {
            return TaskStepOutcome {
                next_delay: Duration::ZERO,
                should_continue: !self.remaining().is_zero() && self.running,
                state: if self.remaining().is_zero() { "complete".to_string() } else { "paused".to_string() },
            };
        }

        let depth = self
            .hub
            .best_bid_ask(self.client.exchange(), &self.symbol)
            .map(|(bid, ask)| match self.side {
                Side::Buy => ask.size,
                Side::Sell => bid.size,
            })
            .unwrap_or(Decimal::ZERO);

        let slice = self.slice_quantity.min(depth).min(self.remaining());
        if slice.is_zero() {
            return TaskStepOutcome {
                next_delay: Duration::from_millis(500),
                should_continue: true,
                state: "waiting_for_depth".to_string(),
            };
        }

        let request = OrderRequest::limit(self.symbol.clone(), self.side, slice, self.limit_price);
        match self.client.place_order(request).await {
            Ok(order) if order.status == OrderStatus::Filled || order.status == OrderStatus::PartiallyFilled => {
                self.filled_quantity += order.filled_quantity;
            }
            Ok(_) => {}
            Err(error) => warn!(%error, task_id = %self.id, "iceberg slice order failed"),
        }

        let done = self.remaining().is_zero();
        if done {
            info!(task_id = %self.id, "iceberg task filled its total quantity");
        }

        TaskStepOutcome {
            next_delay: Duration::from_millis(250),
            should_continue: !done,
            state: format!("filled {}/{}", self.filled_quantity, self.total_quantity),
        }
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "symbol": self.symbol,
            "side": self.side.to_string(),
            "total_quantity": self.total_quantity,
            "filled_quantity": self.filled_quantity,
        })
    }
}

/// Maintains delta-neutral inventory across two venues by comparing the tracked net
/// position to zero and placing corrective orders. Shares the same rebalancing idea as
/// [`crate::execution::ArbitrageExecution::rebalance_if_needed`] but runs indefinitely
/// rather than as part of one bounded trade.
pub struct DeltaNeutralTask {
    id: TaskId,
    symbol: Symbol,
    long_client: ExchangeHandle,
    short_client: ExchangeHandle,
    long_quantity: Decimal,
    short_quantity: Decimal,
    tolerance: Decimal,
    running: bool,
}

impl DeltaNeutralTask {
    pub fn new(
        symbol: Symbol,
        long_client: ExchangeHandle,
        short_client: ExchangeHandle,
        tolerance: Decimal,
        timestamp_ms: i64,
    ) -> Self {
        let id = TaskId::new(timestamp_ms, "delta_neutral", &symbol, Side::Buy);
        Self {
            id,
            symbol,
            long_client,
            short_client,
            long_quantity: Decimal::ZERO,
            short_quantity: Decimal::ZERO,
            tolerance,
            running: false,
        }
    }
}

#[async_trait]
impl Task for DeltaNeutralTask {
    fn id(&self) -> &TaskId {
        &self.id
    }

    fn task_type(&self) -> &'static str {
        "delta_neutral"
    }

    fn start(&mut self) {
        self.running = true;
    }

    fn pause(&mut self) {
        self.running = false;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn update(&mut self, deltas: ContextDeltas) {
        if let Some(qty) = deltas.get("long_quantity").and_then(|v| v.as_str()).and_then(|s| s.parse().ok()) {
            self.long_quantity = qty;
        }
        if let Some(qty) = deltas.get("short_quantity").and_then(|v| v.as_str()).and_then(|s| s.parse().ok()) {
            self.short_quantity = qty;
        }
    }

    async fn execute_once(&mut self) -> TaskStepOutcome {
        if !self.running {
            return TaskStepOutcome {
                next_delay: Duration::from_millis(500),
                should_continue: true,
                state: "paused".to_string(),
            };
        }

        let delta = (self.long_quantity - self.short_quantity).abs();
        if delta > self.tolerance {
            let (client, side, quantity) = if self.long_quantity > self.short_quantity {
                (&self.short_client, Side::Sell, delta)
            } else {
                (&self.long_client, Side::Buy, delta)
            };
            let request = OrderRequest::market(self.symbol.clone(), side, quantity);
            match client.place_order(request).await {
                Ok(order) => match side {
                    Side::Buy => self.long_quantity += order.filled_quantity,
                    Side::Sell => self.short_quantity += order.filled_quantity,
                },
                Err(error) => warn!(%error, task_id = %self.id, "delta-neutral rebalance order failed"),
            }
        }

        TaskStepOutcome {
            next_delay: Duration::from_millis(500),
            should_continue: true,
            state: format!("long={} short={}", self.long_quantity, self.short_quantity),
        }
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "symbol": self.symbol,
            "long_quantity": self.long_quantity,
            "short_quantity": self.short_quantity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_task_id_format_is_greppable() {
        let id = TaskId::new(1_700_000_000_000, "iceberg", &Symbol::spot("btc", "usdt"), Side::Buy);
        assert_eq!(id.0, "1700000000000_iceberg_btc_usdt_buy");
    }

    fn sample_opportunity() -> ArbitrageOpportunity {
        ArbitrageOpportunity {
            opportunity_id: "opp-1".to_string(),
            symbol: Symbol::spot("btc", "usdt"),
            buy_exchange: ExchangeId::GateioSpot,
            sell_exchange: ExchangeId::MexcSpot,
            buy_price: dec!(100.0),
            sell_price: dec!(100.5),
            spread: dec!(0.5),
            spread_pct: dec!(0.5),
            max_quantity: dec!(1.0),
            estimated_profit: dec!(0.3),
            confidence: dec!(0.9),
            timestamp: chrono::Utc::now(),
            expiry: chrono::Utc::now() + chrono::Duration::milliseconds(200),
        }
    }

    // A task that crashed mid-MONITORING persists its opportunity, legs, and
    // state; PersistedExecution must round-trip through JSON exactly so
    // from_snapshot can rebuild an equivalent ArbitrageExecution.
    #[test]
    fn test_persisted_execution_round_trips_through_json() {
        let mut execution = ArbitrageExecution::new(sample_opportunity(), false, dec!(0.001));
        execution.state = ExecutionState::Monitoring;
        execution.buy_leg.filled_quantity = dec!(1.0);
        execution.buy_leg.order_id = Some(arc_execution::OrderId(smol_str::SmolStr::new("gio-1")));
        execution.sell_leg.filled_quantity = dec!(1.0);
        execution.sell_leg.order_id = Some(arc_execution::OrderId(smol_str::SmolStr::new("mx-1")));

        let persisted = PersistedExecution {
            opportunity: execution.opportunity.clone(),
            buy_leg: execution.buy_leg.clone(),
            sell_leg: execution.sell_leg.clone(),
            state: execution.state.clone(),
            dry_run: execution.dry_run,
            delta_tolerance: execution.delta_tolerance,
            exit_spread_bps: dec!(5),
            max_hold_secs: 3600,
        };

        let json = serde_json::to_value(&persisted).unwrap();
        let restored: PersistedExecution = serde_json::from_value(json).unwrap();

        assert_eq!(restored.state, ExecutionState::Monitoring);
        assert_eq!(restored.buy_leg.filled_quantity, dec!(1.0));
        assert_eq!(restored.sell_leg.order_id, Some(arc_execution::OrderId(smol_str::SmolStr::new("mx-1"))));
        assert_eq!(restored.opportunity.opportunity_id, "opp-1");
    }

    // Recovery must not duplicate orders: a leg whose order is still open
    // gets its fill state overwritten from the exchange's own report, and a
    // leg whose order_id the exchange no longer lists keeps its last-known
    // fill rather than being treated as unfilled.
    #[test]
    fn test_reconcile_leg_prefers_live_exchange_state() {
        let mut leg = crate::execution::Leg::new(
            ExchangeId::GateioSpot,
            Side::Buy,
            dec!(1.0),
            dec!(100.0),
        );
        leg.order_id = Some(arc_execution::OrderId(smol_str::SmolStr::new("gio-1")));
        leg.filled_quantity = dec!(0.4);

        let live_order = arc_execution::Order {
            symbol: Symbol::spot("btc", "usdt"),
            order_id: arc_execution::OrderId(smol_str::SmolStr::new("gio-1")),
            client_order_id: None,
            side: Side::Buy,
            order_type: arc_execution::OrderType::Limit,
            quantity: dec!(1.0),
            price: Some(dec!(100.0)),
            filled_quantity: dec!(1.0),
            status: OrderStatus::Filled,
            timestamp: chrono::Utc::now(),
            avg_price: Some(dec!(100.1)),
            fee: None,
            time_in_force: arc_execution::TimeInForce::GoodTilCancel,
        };

        reconcile_leg(&mut leg, &[live_order]);

        assert_eq!(leg.filled_quantity, dec!(1.0));
        assert_eq!(leg.status, OrderStatus::Filled);
        assert_eq!(leg.price, dec!(100.1));

        let mut unmatched_leg = crate::execution::Leg::new(ExchangeId::MexcSpot, Side::Sell, dec!(1.0), dec!(100.5));
        unmatched_leg.order_id = Some(arc_execution::OrderId(smol_str::SmolStr::new("mx-stale")));
        unmatched_leg.filled_quantity = dec!(0.7);
        reconcile_leg(&mut unmatched_leg, &[]);
        assert_eq!(unmatched_leg.filled_quantity, dec!(0.7));
    }

    #[tokio::test]
    async fn test_balance_sync_task_reports_running_state() {
        let client = ExchangeHandle::Gateio(Arc::new(
            arc_execution::client::gateio::GateioExecutionClient::new(
                "key".to_string(),
                "secret".to_string(),
                Arc::new(arc_data::exchange::gateio::symbol::GateioSymbolMapper::default()),
            ),
        ));
        let tracker = Arc::new(PrivateStateTracker::default());
        let mut task = BalanceSyncTask::new(client, tracker, Duration::from_secs(30), 1_700_000_000_000);
        task.start();
        let outcome = task.execute_once().await;
        assert_eq!(outcome.state, "running");
        assert!(outcome.should_continue);
        let _ = dec!(0);
    }
}
