use arc_instrument::Symbol;
use derive_more::Constructor;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A pre-trade gate that would have been breached by a candidate trade: risk
/// checks cover sufficient balance on both exchanges, staying under the
/// position limit, and not being in dry-run-abort mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Constructor)]
pub enum RiskViolation {
    PositionLimit { symbol: Symbol, size_usd: Decimal, limit_usd: Decimal },
    InsufficientBalance { symbol: Symbol, required_usd: Decimal, available_usd: Decimal },
    ProfitMarginTooLow { symbol: Symbol, margin_bps: Decimal, required_bps: Decimal },
    ConcurrentTaskLimit { count: usize, limit: usize },
    OrderNotionalTooLarge { symbol: Symbol, notional_usd: Decimal, limit_usd: Decimal },
}

/// Receives [`RiskViolation`]s as they're raised, decoupling the checks
/// that detect them from however the caller wants to surface them (log,
/// metric, abort the task).
pub trait RiskAlertHook: Send + Sync {
    fn alert(&self, violation: RiskViolation);
}

/// Accumulates alerts in-process - used by tests and by the Task Manager to
/// attach the triggering violations to a FAILED/ABORTED task's record.
#[derive(Debug, Default)]
pub struct VecAlertHook {
    pub alerts: Mutex<Vec<RiskViolation>>,
}

impl RiskAlertHook for VecAlertHook {
    fn alert(&self, violation: RiskViolation) {
        self.alerts.lock().push(violation);
    }
}
