use crate::config::ArbitragePairConfig;
use arc_instrument::{AssetName, ExchangeId, Symbol, SymbolInfo};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// `ArbitragePairConfig` once every configured exchange's `SymbolInfo` has been
/// attached, per-exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedArbitragePair {
    pub id: String,
    pub symbol: Symbol,
    pub per_exchange: HashMap<ExchangeId, SymbolInfo>,
    pub min_profit_bps: rust_decimal::Decimal,
    pub max_exposure_usd: rust_decimal::Decimal,
    pub priority: u8,
}

impl ResolvedArbitragePair {
    pub fn exchanges(&self) -> impl Iterator<Item = ExchangeId> + '_ {
        self.per_exchange.keys().copied()
    }
}

/// Builds the `(base, quote) -> ExchangeId -> SymbolInfo` lookup table and resolves
/// each configured [`ArbitragePairConfig`] against it. Constructed once at startup;
/// immutable for the session.
#[derive(Debug)]
pub struct SymbolResolver {
    table: HashMap<(AssetName, AssetName), HashMap<ExchangeId, SymbolInfo>>,
}

impl SymbolResolver {
    /// `exchange_symbols` is one `Vec<SymbolInfo>` per enabled exchange, as fetched
    /// from each [`arc_execution::ExecutionClient::fetch_symbol_info`].
    pub fn build(exchange_symbols: impl IntoIterator<Item = (ExchangeId, Vec<SymbolInfo>)>) -> Self {
        let mut table: HashMap<(AssetName, AssetName), HashMap<ExchangeId, SymbolInfo>> = HashMap::new();

        for (exchange, symbols) in exchange_symbols {
            for info in symbols {
                // Any non-tradable signal maps to inactive; inactive symbols
                // still populate the table (so they can be logged as a skip
                // reason) but are never selected by `resolve`.
                let key = (info.symbol.base.clone(), info.symbol.quote.clone());
                table.entry(key).or_default().insert(exchange, info);
            }
        }

        Self { table }
    }

    /// Resolve one configured pair: require at least two configured exchanges present
    /// AND active.
    pub fn resolve(&self, config: &ArbitragePairConfig) -> Option<ResolvedArbitragePair> {
        let key = (AssetName::from(config.base_asset.as_str()), AssetName::from(config.quote_asset.as_str()));
        let Some(per_exchange_all) = self.table.get(&key) else {
            warn!(pair_id = %config.id, "arbitrage pair has no symbol-info on any exchange - skipping");
            return None;
        };

        let per_exchange: HashMap<ExchangeId, SymbolInfo> = config
            .exchanges
            .iter()
            .filter_map(|exchange| per_exchange_all.get(exchange).map(|info| (*exchange, info.clone())))
            .filter(|(_, info)| info.active)
            .collect();

        if per_exchange.len() < 2 {
            warn!(
                pair_id = %config.id,
                resolved_exchanges = per_exchange.len(),
                "arbitrage pair resolved on fewer than 2 active exchanges - skipping"
            );
            return None;
        }

        info!(pair_id = %config.id, exchanges = per_exchange.len(), "resolved arbitrage pair");

        Some(ResolvedArbitragePair {
            id: config.id.clone(),
            symbol: Symbol::spot(config.base_asset.as_str(), config.quote_asset.as_str()),
            per_exchange,
            min_profit_bps: config.min_profit_bps,
            max_exposure_usd: config.max_exposure_usd,
            priority: config.priority,
        })
    }

    pub fn resolve_all(&self, configs: &[ArbitragePairConfig]) -> Vec<ResolvedArbitragePair> {
        configs
            .iter()
            .filter(|config| config.enabled)
            .filter_map(|config| self.resolve(config))
            .collect()
    }

    /// Symbols present (with active `SymbolInfo`) on every exchange passed in -
    /// precomputed once for opportunistic scanning beyond the explicitly configured
    /// pairs.
    pub fn common_symbols(&self, exchanges: &[ExchangeId]) -> HashSet<Symbol> {
        self.table
            .iter()
            .filter(|(_, per_exchange)| {
                exchanges
                    .iter()
                    .all(|exchange| per_exchange.get(exchange).map(|info| info.active).unwrap_or(false))
            })
            .map(|((base, quote), _)| Symbol::spot(base.clone(), quote.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn info(symbol: Symbol, active: bool) -> SymbolInfo {
        SymbolInfo {
            symbol,
            base_precision: 6,
            quote_precision: 2,
            min_base_amount: dec!(0.001),
            min_quote_amount: dec!(10),
            maker_fee: dec!(0.001),
            taker_fee: dec!(0.002),
            active,
        }
    }

    fn config() -> ArbitragePairConfig {
        ArbitragePairConfig {
            id: "btc-usdt".to_string(),
            base_asset: "btc".to_string(),
            quote_asset: "usdt".to_string(),
            exchanges: vec![ExchangeId::GateioSpot, ExchangeId::MexcSpot],
            min_profit_bps: dec!(10),
            max_exposure_usd: dec!(5000),
            enabled: true,
            priority: 1,
        }
    }

    #[test]
    fn test_resolves_when_two_exchanges_active() {
        let resolver = SymbolResolver::build([
            (ExchangeId::GateioSpot, vec![info(Symbol::spot("btc", "usdt"), true)]),
            (ExchangeId::MexcSpot, vec![info(Symbol::spot("btc", "usdt"), true)]),
        ]);

        let resolved = resolver.resolve(&config()).expect("should resolve");
        assert_eq!(resolved.per_exchange.len(), 2);
    }

    #[test]
    fn test_skips_when_only_one_exchange_active() {
        let resolver = SymbolResolver::build([
            (ExchangeId::GateioSpot, vec![info(Symbol::spot("btc", "usdt"), true)]),
            (ExchangeId::MexcSpot, vec![info(Symbol::spot("btc", "usdt"), false)]),
        ]);

        assert!(resolver.resolve(&config()).is_none());
    }

    #[test]
    fn test_common_symbols_requires_all_exchanges_active() {
        let resolver = SymbolResolver::build([
            (ExchangeId::GateioSpot, vec![info(Symbol::spot("btc", "usdt"), true), info(Symbol::spot("eth", "usdt"), true)]),
            (ExchangeId::MexcSpot, vec![info(Symbol::spot("btc", "usdt"), true)]),
        ]);

        let common = resolver.common_symbols(&[ExchangeId::GateioSpot, ExchangeId::MexcSpot]);
        assert_eq!(common.len(), 1);
        assert!(common.contains(&Symbol::spot("btc", "usdt")));
    }
}
