use crate::asset::AssetName;
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified trading pair identifier, normalised across exchanges. Two [`Symbol`]s are
/// equal iff `base`, `quote` and `is_futures` all match.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Display, Deserialize, Serialize)]
#[display("{base}_{quote}{}", if *is_futures { "-PERP" } else { "" })]
pub struct Symbol {
    pub base: AssetName,
    pub quote: AssetName,
    pub is_futures: bool,
}

impl Symbol {
    pub fn spot(base: impl Into<AssetName>, quote: impl Into<AssetName>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
            is_futures: false,
        }
    }

    pub fn futures(base: impl Into<AssetName>, quote: impl Into<AssetName>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
            is_futures: true,
        }
    }
}

/// Static-for-the-session exchange metadata for one [`Symbol`]. Fetched once at startup
/// and treated as immutable configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SymbolInfo {
    pub symbol: Symbol,
    pub base_precision: u32,
    pub quote_precision: u32,
    pub min_base_amount: Decimal,
    pub min_quote_amount: Decimal,
    pub maker_fee: Decimal,
    pub taker_fee: Decimal,
    pub active: bool,
}

/// Errors raised while normalising an exchange-native pair string into a [`Symbol`], or
/// vice versa.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum SymbolMapError {
    #[error("unrecognized pair string: {0}")]
    UnrecognizedPair(String),

    #[error("quote asset {quote} is not supported on this exchange")]
    UnsupportedQuote { quote: AssetName },
}

/// Bidirectional, cached, allocation-aware conversion between a [`Symbol`] and one
/// exchange's native pair string representation. Implementations hold no I/O resources
/// - parsing is pure and is safe to call from the message decode hot path.
pub trait SymbolMapper {
    /// Convert a unified [`Symbol`] into this exchange's native pair string,
    /// eg/ Gate.io: `"BTC_USDT"`, MEXC: `"BTCUSDT"`.
    fn to_pair(&self, symbol: &Symbol) -> Result<String, SymbolMapError>;

    /// Parse this exchange's native pair string back into a unified
    /// [`Symbol`].
    fn to_symbol(&self, pair: &str) -> Result<Symbol, SymbolMapError>;

    /// `true` iff `pair` both parses and quotes against a supported asset.
    fn is_supported_pair(&self, pair: &str) -> bool {
        self.to_symbol(pair).is_ok()
    }

    /// `true` iff `symbol`'s quote asset is in this exchange's supported set.
    fn validate_symbol(&self, symbol: &Symbol) -> bool {
        self.to_pair(symbol).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_equality_requires_all_fields() {
        let spot = Symbol::spot("btc", "usdt");
        let futures = Symbol::futures("btc", "usdt");
        assert_ne!(spot, futures);
        assert_eq!(spot, Symbol::spot("BTC", "USDT"));
    }
}
