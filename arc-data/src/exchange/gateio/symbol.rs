use arc_instrument::{AssetName, Symbol, SymbolMapError, SymbolMapper};
use std::collections::HashSet;

/// Gate.io [`SymbolMapper`]: native pair strings are `BASE_QUOTE`, eg/ `"BTC_USDT"`.
#[derive(Debug, Clone)]
pub struct GateioSymbolMapper {
    supported_quotes: HashSet<AssetName>,
}

impl GateioSymbolMapper {
    pub fn new(supported_quotes: impl IntoIterator<Item = AssetName>) -> Self {
        Self {
            supported_quotes: supported_quotes.into_iter().collect(),
        }
    }
}

impl Default for GateioSymbolMapper {
    fn default() -> Self {
        Self::new(["usdt", "usdc", "btc", "eth"].map(AssetName::from))
    }
}

impl SymbolMapper for GateioSymbolMapper {
    fn to_pair(&self, symbol: &Symbol) -> Result<String, SymbolMapError> {
        if !self.supported_quotes.contains(&symbol.quote) {
            return Err(SymbolMapError::UnsupportedQuote {
                quote: symbol.quote.clone(),
            });
        }
        Ok(format!(
            "{}_{}",
            symbol.base.as_ref().to_uppercase(),
            symbol.quote.as_ref().to_uppercase()
        ))
    }

    fn to_symbol(&self, pair: &str) -> Result<Symbol, SymbolMapError> {
        let (base, quote) = pair
            .split_once('_')
            .ok_or_else(|| SymbolMapError::UnrecognizedPair(pair.to_string()))?;

        if base.is_empty() || quote.is_empty() {
            return Err(SymbolMapError::UnrecognizedPair(pair.to_string()));
        }

        let quote = AssetName::from(quote);
        if !self.supported_quotes.contains(&quote) {
            return Err(SymbolMapError::UnsupportedQuote { quote });
        }

        Ok(Symbol::spot(AssetName::from(base), quote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Round trip: to_symbol(to_pair(s)) == s.
    #[test]
    fn test_round_trip_to_symbol_to_pair() {
        let mapper = GateioSymbolMapper::default();
        let symbol = Symbol::spot("btc", "usdt");
        let pair = mapper.to_pair(&symbol).unwrap();
        assert_eq!(pair, "BTC_USDT");
        assert_eq!(mapper.to_symbol(&pair).unwrap(), symbol);
    }

    #[test]
    fn test_unrecognized_pair_without_separator() {
        let mapper = GateioSymbolMapper::default();
        assert!(matches!(
            mapper.to_symbol("BTCUSDT"),
            Err(SymbolMapError::UnrecognizedPair(_))
        ));
    }

    #[test]
    fn test_unsupported_quote_rejected() {
        let mapper = GateioSymbolMapper::default();
        assert!(matches!(
            mapper.to_symbol("BTC_XYZ"),
            Err(SymbolMapError::UnsupportedQuote { .. })
        ));
    }
}
