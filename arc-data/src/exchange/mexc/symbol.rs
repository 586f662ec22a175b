use arc_instrument::{AssetName, Symbol, SymbolMapError, SymbolMapper};

/// MEXC [`SymbolMapper`]: native pair strings are `BASEQUOTE` with no separator, eg/
/// `"BTCUSDT"`. Disambiguating base from quote requires a known quote-asset suffix
/// list, tried longest-first so `"USDT"` is preferred over a shorter false match.
#[derive(Debug, Clone)]
pub struct MexcSymbolMapper {
    supported_quotes: Vec<AssetName>,
}

impl MexcSymbolMapper {
    pub fn new(mut supported_quotes: Vec<AssetName>) -> Self {
        supported_quotes.sort_unstable_by_key(|q| std::cmp::Reverse(q.as_str().len()));
        Self { supported_quotes }
    }
}

impl Default for MexcSymbolMapper {
    fn default() -> Self {
        Self::new(["usdt", "usdc", "btc", "eth", "usd"].map(AssetName::from).to_vec())
    }
}

impl SymbolMapper for MexcSymbolMapper {
    fn to_pair(&self, symbol: &Symbol) -> Result<String, SymbolMapError> {
        if !self.supported_quotes.contains(&symbol.quote) {
            return Err(SymbolMapError::UnsupportedQuote {
                quote: symbol.quote.clone(),
            });
        }
        Ok(format!(
            "{}{}",
            symbol.base.as_ref().to_uppercase(),
            symbol.quote.as_ref().to_uppercase()
        ))
    }

    fn to_symbol(&self, pair: &str) -> Result<Symbol, SymbolMapError> {
        let lower = pair.to_lowercase();
        let quote = self
            .supported_quotes
            .iter()
            .find(|quote| lower.ends_with(quote.as_str()) && lower.len() > quote.as_str().len())
            .cloned()
            .ok_or_else(|| SymbolMapError::UnrecognizedPair(pair.to_string()))?;

        let base = &lower[..lower.len() - quote.as_str().len()];
        Ok(Symbol::spot(AssetName::from(base), quote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_to_symbol_to_pair() {
        let mapper = MexcSymbolMapper::default();
        let symbol = Symbol::spot("btc", "usdt");
        let pair = mapper.to_pair(&symbol).unwrap();
        assert_eq!(pair, "BTCUSDT");
        assert_eq!(mapper.to_symbol(&pair).unwrap(), symbol);
    }

    #[test]
    fn test_prefers_longest_matching_quote_suffix() {
        let mapper = MexcSymbolMapper::default();
        // "ETHUSDT" ends in both "usdt" (4 chars) and no shorter false match here,
        // but "BTCUSDC" must not be misparsed as quote "usdc" -> base "btc", which
        // is correct; guard against e.g. "USDCUSDT" matching quote "usdt" -> base "usdc".
        assert_eq!(
            mapper.to_symbol("USDCUSDT").unwrap(),
            Symbol::spot("usdc", "usdt")
        );
    }

    #[test]
    fn test_unrecognized_pair_without_known_quote_suffix() {
        let mapper = MexcSymbolMapper::default();
        assert!(matches!(
            mapper.to_symbol("GIBBERISH"),
            Err(SymbolMapError::UnrecognizedPair(_))
        ));
    }
}
