use crate::alert::RiskViolation;
use crate::limits::RiskLimits;
use arc_instrument::Symbol;
use rust_decimal::Decimal;

/// Everything one candidate trade's risk checks need to read. Built fresh per
/// opportunity; never retained.
#[derive(Debug, Clone)]
pub struct RiskCheckContext {
    pub symbol: Symbol,
    pub order_notional_usd: Decimal,
    pub projected_position_usd: Decimal,
    pub available_balance_buy_usd: Decimal,
    pub available_balance_sell_usd: Decimal,
    pub profit_margin_bps: Decimal,
    pub concurrent_tasks: usize,
}

/// One independently-evaluable pre-trade gate. Implementations are pure and
/// side-effect-free; the caller decides what to do with a returned
/// [`RiskViolation`] (abort the task, log, alert).
pub trait RiskCheck: Send + Sync {
    fn check(&self, ctx: &RiskCheckContext) -> Option<RiskViolation>;
}

/// Rejects if the combined post-trade position for `ctx.symbol` would
/// exceed [`RiskLimits::max_position_size_usd`].
pub struct PositionLimitCheck<'a>(pub &'a RiskLimits);

impl RiskCheck for PositionLimitCheck<'_> {
    fn check(&self, ctx: &RiskCheckContext) -> Option<RiskViolation> {
        if ctx.projected_position_usd.abs() > self.0.max_position_size_usd {
            Some(RiskViolation::PositionLimit {
                symbol: ctx.symbol.clone(),
                size_usd: ctx.projected_position_usd.abs(),
                limit_usd: self.0.max_position_size_usd,
            })
        } else {
            None
        }
    }
}

/// Rejects if either leg's available balance can't cover the order notional.
pub struct BalanceSufficiencyCheck;

impl RiskCheck for BalanceSufficiencyCheck {
    fn check(&self, ctx: &RiskCheckContext) -> Option<RiskViolation> {
        let available = ctx.available_balance_buy_usd.min(ctx.available_balance_sell_usd);
        if available < ctx.order_notional_usd {
            Some(RiskViolation::InsufficientBalance {
                symbol: ctx.symbol.clone(),
                required_usd: ctx.order_notional_usd,
                available_usd: available,
            })
        } else {
            None
        }
    }
}

/// Rejects an opportunity whose net spread doesn't clear
/// [`RiskLimits::min_profit_margin_bps`] - a last-line check independent of
/// whatever the scanner already filtered on, in case limits changed since.
pub struct ProfitMarginCheck<'a>(pub &'a RiskLimits);

impl RiskCheck for ProfitMarginCheck<'_> {
    fn check(&self, ctx: &RiskCheckContext) -> Option<RiskViolation> {
        if ctx.profit_margin_bps < self.0.min_profit_margin_bps {
            Some(RiskViolation::ProfitMarginTooLow {
                symbol: ctx.symbol.clone(),
                margin_bps: ctx.profit_margin_bps,
                required_bps: self.0.min_profit_margin_bps,
            })
        } else {
            None
        }
    }
}

/// Rejects if the Task Manager is already at capacity.
pub struct ConcurrentTaskLimitCheck<'a>(pub &'a RiskLimits);

impl RiskCheck for ConcurrentTaskLimitCheck<'_> {
    fn check(&self, ctx: &RiskCheckContext) -> Option<RiskViolation> {
        if ctx.concurrent_tasks >= self.0.max_concurrent_tasks {
            Some(RiskViolation::ConcurrentTaskLimit {
                count: ctx.concurrent_tasks,
                limit: self.0.max_concurrent_tasks,
            })
        } else {
            None
        }
    }
}

/// Rejects if a single order's notional exceeds
/// [`RiskLimits::max_order_notional_usd`], independent of aggregate
/// position.
pub struct OrderNotionalCheck<'a>(pub &'a RiskLimits);

impl RiskCheck for OrderNotionalCheck<'_> {
    fn check(&self, ctx: &RiskCheckContext) -> Option<RiskViolation> {
        if ctx.order_notional_usd > self.0.max_order_notional_usd {
            Some(RiskViolation::OrderNotionalTooLarge {
                symbol: ctx.symbol.clone(),
                notional_usd: ctx.order_notional_usd,
                limit_usd: self.0.max_order_notional_usd,
            })
        } else {
            None
        }
    }
}

/// The full IDLE→VALIDATING gate: runs every standard check and returns every violation
/// found, rather than stopping at the first - the Execution Engine logs the complete
/// set before transitioning to ABORTED.
pub fn run_standard_checks(limits: &RiskLimits, ctx: &RiskCheckContext) -> Vec<RiskViolation> {
    let checks: Vec<Box<dyn RiskCheck + '_>> = vec![
        Box::new(PositionLimitCheck(limits)),
        Box::new(BalanceSufficiencyCheck),
        Box::new(ProfitMarginCheck(limits)),
        Box::new(ConcurrentTaskLimitCheck(limits)),
        Box::new(OrderNotionalCheck(limits)),
    ];

    checks.iter().filter_map(|check| check.check(ctx)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn limits() -> RiskLimits {
        RiskLimits {
            max_position_size_usd: dec!(10000),
            min_profit_margin_bps: dec!(5),
            max_concurrent_tasks: 3,
            max_order_notional_usd: dec!(5000),
        }
    }

    fn passing_ctx() -> RiskCheckContext {
        RiskCheckContext {
            symbol: Symbol::spot("btc", "usdt"),
            order_notional_usd: dec!(1000),
            projected_position_usd: dec!(1000),
            available_balance_buy_usd: dec!(2000),
            available_balance_sell_usd: dec!(2000),
            profit_margin_bps: dec!(10),
            concurrent_tasks: 1,
        }
    }

    #[test]
    fn test_all_checks_pass_for_a_healthy_opportunity() {
        assert!(run_standard_checks(&limits(), &passing_ctx()).is_empty());
    }

    #[test]
    fn test_position_limit_check_rejects_oversized_position() {
        let mut ctx = passing_ctx();
        ctx.projected_position_usd = dec!(20000);
        let violations = run_standard_checks(&limits(), &ctx);
        assert!(violations
            .iter()
            .any(|v| matches!(v, RiskViolation::PositionLimit { .. })));
    }

    #[test]
    fn test_balance_sufficiency_check_rejects_insufficient_balance() {
        let mut ctx = passing_ctx();
        ctx.available_balance_sell_usd = dec!(10);
        let violations = run_standard_checks(&limits(), &ctx);
        assert!(violations
            .iter()
            .any(|v| matches!(v, RiskViolation::InsufficientBalance { .. })));
    }

    #[test]
    fn test_profit_margin_check_rejects_thin_spread() {
        let mut ctx = passing_ctx();
        ctx.profit_margin_bps = dec!(1);
        let violations = run_standard_checks(&limits(), &ctx);
        assert!(violations
            .iter()
            .any(|v| matches!(v, RiskViolation::ProfitMarginTooLow { .. })));
    }

    #[test]
    fn test_concurrent_task_limit_check_rejects_at_capacity() {
        let mut ctx = passing_ctx();
        ctx.concurrent_tasks = 3;
        let violations = run_standard_checks(&limits(), &ctx);
        assert!(violations
            .iter()
            .any(|v| matches!(v, RiskViolation::ConcurrentTaskLimit { .. })));
    }
}
