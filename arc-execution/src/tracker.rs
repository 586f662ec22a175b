use crate::balance::AccountBalance;
use crate::order::{Order, OrderId};
use arc_instrument::AssetName;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};

/// One execution report retained for diagnostics - a terminal or partial-fill
/// transition observed for an order, kept in a bounded ring buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub order_id: OrderId,
    pub order: Order,
}

const DEFAULT_REPORT_CAPACITY: usize = 256;

/// Per-(exchange, account) private state: latest balances, open orders, and a bounded
/// history of execution reports. The private websocket stream is the authoritative
/// real-time source; `resync_*` methods apply a REST snapshot taken at startup or after
/// a stream-gap is detected. [`Self::note_discrepancy`] is how a caller signals that
/// websocket and REST state disagree beyond tolerance, which should trigger a caller-
/// driven REST resync (the tracker itself holds no REST client -.G keeps that in the
/// `ExecutionClient`/`ClientError` layer so this type stays a pure in-memory cache).
pub struct PrivateStateTracker {
    balances: RwLock<HashMap<AssetName, AccountBalance>>,
    open_orders: RwLock<HashMap<OrderId, Order>>,
    reports: RwLock<VecDeque<ExecutionReport>>,
    report_capacity: usize,
}

impl std::fmt::Debug for PrivateStateTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateStateTracker")
            .field("open_orders", &self.open_orders.read().len())
            .field("balances", &self.balances.read().len())
            .field("reports", &self.reports.read().len())
            .finish()
    }
}

impl Default for PrivateStateTracker {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_CAPACITY)
    }
}

impl PrivateStateTracker {
    pub fn new(report_capacity: usize) -> Self {
        Self {
            balances: RwLock::new(HashMap::new()),
            open_orders: RwLock::new(HashMap::new()),
            reports: RwLock::new(VecDeque::with_capacity(report_capacity)),
            report_capacity,
        }
    }

    pub fn balance(&self, asset: &AssetName) -> Option<AccountBalance> {
        self.balances.read().get(asset).cloned()
    }

    pub fn balances(&self) -> Vec<AccountBalance> {
        self.balances.read().values().cloned().collect()
    }

    pub fn open_order(&self, order_id: &OrderId) -> Option<Order> {
        self.open_orders.read().get(order_id).cloned()
    }

    pub fn open_orders(&self) -> Vec<Order> {
        self.open_orders.read().values().cloned().collect()
    }

    /// Apply a balance update observed on the private websocket stream or a
    /// REST snapshot - last writer wins, since both are always timestamped
    /// reads of the same authoritative account state.
    pub fn apply_balance(&self, balance: AccountBalance) {
        self.balances.write().insert(balance.asset.clone(), balance);
    }

    /// Apply an order update. Orders in a terminal state are evicted from the open-
    /// orders map rather than retained, but are still appended to the execution-report
    /// ring buffer.
    pub fn apply_order(&self, order: Order) {
        {
            let mut reports = self.reports.write();
            if reports.len() == self.report_capacity {
                reports.pop_front();
            }
            reports.push_back(ExecutionReport {
                order_id: order.order_id.clone(),
                order: order.clone(),
            });
        }

        let mut open_orders = self.open_orders.write();
        if order.is_open() {
            open_orders.insert(order.order_id.clone(), order);
        } else {
            open_orders.remove(&order.order_id);
        }
    }

    /// Replace the entire balance map with a REST snapshot, eg/ at startup or after
    /// [`Self::apply_order`]/stream gap detection signals a resync is needed.
    pub fn resync_balances(&self, balances: Vec<AccountBalance>) {
        let mut guard = self.balances.write();
        guard.clear();
        guard.extend(balances.into_iter().map(|b| (b.asset.clone(), b)));
    }

    /// Replace the open-orders map with a REST snapshot. Terminal orders
    /// are not part of the open-orders REST response and so are implicitly
    /// dropped, matching stream-driven eviction behaviour.
    pub fn resync_open_orders(&self, orders: Vec<Order>) {
        let mut guard = self.open_orders.write();
        guard.clear();
        guard.extend(orders.into_iter().map(|o| (o.order_id.clone(), o)));
    }

    pub fn recent_reports(&self) -> Vec<ExecutionReport> {
        self.reports.read().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::AssetBalance;
    use crate::order::{OrderStatus, OrderType, TimeInForce};
    use arc_instrument::{Side, Symbol};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn order(status: OrderStatus) -> Order {
        Order {
            symbol: Symbol::spot("btc", "usdt"),
            order_id: OrderId::new("1"),
            client_order_id: None,
            side: Side::Buy,
            order_type: OrderType::Limit,
            quantity: dec!(1),
            price: Some(dec!(50000)),
            filled_quantity: dec!(0),
            status,
            timestamp: Utc::now(),
            avg_price: None,
            fee: None,
            time_in_force: TimeInForce::GoodTilCancel,
        }
    }

    #[test]
    fn test_open_order_is_tracked_until_terminal() {
        let tracker = PrivateStateTracker::default();
        tracker.apply_order(order(OrderStatus::New));
        assert!(tracker.open_order(&OrderId::new("1")).is_some());

        tracker.apply_order(order(OrderStatus::Filled));
        assert!(tracker.open_order(&OrderId::new("1")).is_none());
    }

    #[test]
    fn test_execution_reports_are_bounded() {
        let tracker = PrivateStateTracker::new(2);
        for _ in 0..5 {
            tracker.apply_order(order(OrderStatus::New));
        }
        assert_eq!(tracker.recent_reports().len(), 2);
    }

    #[test]
    fn test_resync_balances_replaces_stale_entries() {
        let tracker = PrivateStateTracker::default();
        tracker.apply_balance(AccountBalance {
            asset: AssetName::from("btc"),
            balance: AssetBalance::new(dec!(1), dec!(0)),
            time_exchange: Utc::now(),
        });

        tracker.resync_balances(vec![AccountBalance {
            asset: AssetName::from("eth"),
            balance: AssetBalance::new(dec!(2), dec!(0)),
            time_exchange: Utc::now(),
        }]);

        assert!(tracker.balance(&AssetName::from("btc")).is_none());
        assert!(tracker.balance(&AssetName::from("eth")).is_some());
    }
}
