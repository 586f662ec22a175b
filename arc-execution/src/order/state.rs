use serde::{Deserialize, Serialize};

/// Order lifecycle status.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
}

impl OrderStatus {
    /// Terminal states: `Filled`, `Canceled`, `Rejected`, `Expired`. A terminal order
    /// is evicted from the Private-State Tracker's open-orders map.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected | OrderStatus::Expired
        )
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum OrderType {
    Limit,
    Market,
    LimitMaker,
    ImmediateOrCancel,
    FillOrKill,
    StopLimit,
    StopMarket,
    /// Futures-only.
    ReduceOnly,
    /// Futures-only.
    ClosePosition,
}

impl OrderType {
    /// Gate.io spot `type` field - Gate.io folds `IMMEDIATE_OR_CANCEL` / `FILL_OR_KILL`
    /// into `time_in_force` rather than `type`, so only the limit/market axis is
    /// distinguished here.
    pub fn as_gateio_str(self) -> &'static str {
        match self {
            OrderType::Market => "market",
            OrderType::LimitMaker => "limit_maker",
            _ => "limit",
        }
    }

    /// MEXC `type` field.
    pub fn as_mexc_str(self) -> &'static str {
        match self {
            OrderType::Limit => "LIMIT",
            OrderType::Market => "MARKET",
            OrderType::LimitMaker => "LIMIT_MAKER",
            OrderType::ImmediateOrCancel => "IMMEDIATE_OR_CANCEL",
            OrderType::FillOrKill => "FILL_OR_KILL",
            OrderType::StopLimit => "STOP_LIMIT",
            OrderType::StopMarket => "STOP_MARKET",
            OrderType::ReduceOnly => "REDUCE_ONLY",
            OrderType::ClosePosition => "CLOSE_POSITION",
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum TimeInForce {
    GoodTilCancel,
    ImmediateOrCancel,
    FillOrKill,
}

impl TimeInForce {
    /// Exchange-native string.
    pub fn as_gateio_str(self) -> &'static str {
        match self {
            TimeInForce::GoodTilCancel => "gtc",
            TimeInForce::ImmediateOrCancel => "ioc",
            TimeInForce::FillOrKill => "fok",
        }
    }

    pub fn as_mexc_str(self) -> &'static str {
        match self {
            TimeInForce::GoodTilCancel => "GTC",
            TimeInForce::ImmediateOrCancel => "IOC",
            TimeInForce::FillOrKill => "FOK",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Canceled.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(OrderStatus::Expired.is_terminal());
        assert!(!OrderStatus::New.is_terminal());
        assert!(!OrderStatus::PartiallyFilled.is_terminal());
    }
}
