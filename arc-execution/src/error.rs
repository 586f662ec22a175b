use arc_instrument::{AssetName, ExchangeId, Symbol};
use thiserror::Error;

/// Top-level execution error taxonomy. `Retryable` errors are already exhausted their
/// transport-layer retries by the time they reach here; everything else is terminal for
/// the call that produced it.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connectivity: {0}")]
    Connectivity(#[from] ConnectivityError),

    #[error("exchange API: {0}")]
    Api(#[from] ApiError),

    #[error("failed to fetch account snapshot: {0}")]
    AccountSnapshot(String),

    #[error("order parameters invalid: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum ConnectivityError {
    #[error("exchange {0} offline")]
    ExchangeOffline(ExchangeId),

    #[error("request timed out")]
    Timeout,

    #[error("transport: {0}")]
    Transport(#[from] arc_integration::SocketError),
}

/// Exchange-reported errors, mapped from HTTP status and decoded exchange-specific
/// error code/label.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("rate limit exceeded")]
    RateLimit,

    #[error("authentication rejected")]
    AuthRejected,

    #[error("symbol {0} is not currently tradable")]
    TradingDisabled(Symbol),

    #[error("insufficient position on {symbol} to place this order")]
    InsufficientPosition { symbol: Symbol },

    #[error("asset {asset} balance insufficient: {detail}")]
    OversoldError { asset: AssetName, detail: String },

    #[error("order already cancelled")]
    OrderAlreadyCancelled,

    #[error("order already fully filled")]
    OrderAlreadyFullyFilled,

    #[error("exchange error (code={code:?}): {message}")]
    UnknownExchangeError { code: Option<String>, message: String },
}

impl ApiError {
    /// Map Gate.io's `label` field and MEXC's numeric `code` to the specialised
    /// [`ApiError`] variants.
    pub fn from_gateio_label(label: &str, message: &str, symbol: Option<&Symbol>) -> Self {
        match label {
            "BALANCE_NOT_ENOUGH" => ApiError::OversoldError {
                asset: symbol
                    .map(|s| s.base.clone())
                    .unwrap_or_else(|| AssetName::from("unknown")),
                detail: message.to_string(),
            },
            "INVALID_KEY" | "INVALID_SIGNATURE" => ApiError::AuthRejected,
            "ORDER_NOT_FOUND" => ApiError::OrderAlreadyCancelled,
            other => ApiError::UnknownExchangeError {
                code: Some(other.to_string()),
                message: message.to_string(),
            },
        }
    }

    pub fn from_mexc_code(code: i64, message: &str, symbol: Option<&Symbol>) -> Self {
        match code {
            10007 => ApiError::TradingDisabled(
                symbol.cloned().unwrap_or_else(|| Symbol::spot("unknown", "unknown")),
            ),
            30004 => ApiError::InsufficientPosition {
                symbol: symbol.cloned().unwrap_or_else(|| Symbol::spot("unknown", "unknown")),
            },
            30005 | 30002 => ApiError::OversoldError {
                asset: symbol
                    .map(|s| s.base.clone())
                    .unwrap_or_else(|| AssetName::from("unknown")),
                detail: message.to_string(),
            },
            other => ApiError::UnknownExchangeError {
                code: Some(other.to_string()),
                message: message.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateio_balance_not_enough_maps_to_oversold() {
        let error = ApiError::from_gateio_label(
            "BALANCE_NOT_ENOUGH",
            "insufficient",
            Some(&Symbol::spot("btc", "usdt")),
        );
        assert!(matches!(error, ApiError::OversoldError { .. }));
    }

    #[test]
    fn test_mexc_code_10007_maps_to_trading_disabled() {
        let error = ApiError::from_mexc_code(10007, "disabled", Some(&Symbol::spot("btc", "usdt")));
        assert!(matches!(error, ApiError::TradingDisabled(_)));
    }

    #[test]
    fn test_mexc_code_30005_and_30002_map_to_oversold() {
        assert!(matches!(
            ApiError::from_mexc_code(30005, "x", None),
            ApiError::OversoldError { .. }
        ));
        assert!(matches!(
            ApiError::from_mexc_code(30002, "x", None),
            ApiError::OversoldError { .. }
        ));
    }

    #[test]
    fn test_unrecognized_code_maps_to_unknown_exchange_error() {
        assert!(matches!(
            ApiError::from_mexc_code(99999, "x", None),
            ApiError::UnknownExchangeError { .. }
        ));
    }
}
