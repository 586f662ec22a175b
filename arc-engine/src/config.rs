use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One configured arbitrage pair, prior to Symbol Resolution. `exchanges` lists every
/// venue this pair should be resolved against; the resolver requires at least two to be
/// present and active before a fully-resolved
/// [`crate::resolver::ResolvedArbitragePair`] is produced.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ArbitragePairConfig {
    pub id: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub exchanges: Vec<arc_instrument::ExchangeId>,
    pub min_profit_bps: Decimal,
    pub max_exposure_usd: Decimal,
    pub enabled: bool,
    pub priority: u8,
}

/// Credentials for one exchange, read verbatim from the environment - not
/// validated here, since the client that consumes them reports auth failures
/// from the exchange itself.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExchangeCredentials {
    pub api_key: String,
    pub api_secret: String,
}

/// Fully-constructed engine configuration - the typed struct `main` hands to the rest
/// of the workspace. Building one from environment variables is the only parsing this
/// crate does; no file formats, no CLI flags.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub gateio_credentials: Option<ExchangeCredentials>,
    pub mexc_credentials: Option<ExchangeCredentials>,
    pub pairs: Vec<ArbitragePairConfig>,
    pub risk_limits: arc_risk::RiskLimits,
    pub scan_interval: Duration,
    pub market_data_staleness: Duration,
    pub order_ack_timeout: Duration,
    pub delta_tolerance: Decimal,
    pub dry_run: bool,
    pub task_store_dir: std::path::PathBuf,
}

/// Errors that can occur while assembling an [`EngineConfig`] from the
/// process environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("environment variable {0} has an invalid value: {1}")]
    InvalidVar(&'static str, String),
    #[error("invalid arbitrage pair configuration: {0}")]
    InvalidPairs(String),
}

impl EngineConfig {
    /// Reads exchange credentials from the environment
    /// (`ARCFLUX_GATEIO_API_KEY`/`_SECRET`, `ARCFLUX_MEXC_API_KEY`/`_SECRET`) and
    /// everything else from caller-supplied defaults - arbitrage pairs, risk limits,
    /// and timing parameters are not environment-driven.
    pub fn from_env(
        pairs: Vec<ArbitragePairConfig>,
        risk_limits: arc_risk::RiskLimits,
        task_store_dir: std::path::PathBuf,
    ) -> Result<Self, ConfigError> {
        let gateio_credentials = optional_credentials("ARCFLUX_GATEIO_API_KEY", "ARCFLUX_GATEIO_API_SECRET")?;
        let mexc_credentials = optional_credentials("ARCFLUX_MEXC_API_KEY", "ARCFLUX_MEXC_API_SECRET")?;
        let dry_run = std::env::var("ARCFLUX_DRY_RUN")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(true);

        validate_pairs(&pairs)?;

        Ok(Self {
            gateio_credentials,
            mexc_credentials,
            pairs,
            risk_limits,
            scan_interval: Duration::from_millis(100),
            market_data_staleness: Duration::from_millis(100),
            order_ack_timeout: Duration::from_millis(500),
            delta_tolerance: Decimal::new(1, 3),
            dry_run,
            task_store_dir,
        })
    }
}

/// Rejects configuration that would make every pair unreachable: duplicate ids, fewer
/// than two venues (arbitrage needs a buy side and a sell side), or a non-positive
/// exposure cap.
fn validate_pairs(pairs: &[ArbitragePairConfig]) -> Result<(), ConfigError> {
    let mut seen_ids = std::collections::HashSet::new();
    let mut errors = Vec::new();

    for pair in pairs {
        if !seen_ids.insert(pair.id.as_str()) {
            errors.push(format!("duplicate pair id {:?}", pair.id));
        }
        if pair.exchanges.len() < 2 {
            errors.push(format!("pair {:?} names fewer than two exchanges", pair.id));
        }
        if pair.max_exposure_usd <= Decimal::ZERO {
            errors.push(format!("pair {:?} has a non-positive max_exposure_usd", pair.id));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::InvalidPairs(errors.join("; ")))
    }
}

fn optional_credentials(key_var: &'static str, secret_var: &'static str) -> Result<Option<ExchangeCredentials>, ConfigError> {
    match (std::env::var(key_var), std::env::var(secret_var)) {
        (Ok(api_key), Ok(api_secret)) if !api_key.is_empty() && !api_secret.is_empty() => {
            Ok(Some(ExchangeCredentials { api_key, api_secret }))
        }
        (Ok(_), Err(_)) => Err(ConfigError::MissingVar(secret_var)),
        (Err(_), Ok(_)) => Err(ConfigError::MissingVar(key_var)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_defaults_to_dry_run_without_flag_set() {
        // SAFETY: test-only removal of an env var this process may have set;
        // no other test in this module depends on it being present.
        unsafe {
            std::env::remove_var("ARCFLUX_DRY_RUN");
        }
        let config = EngineConfig::from_env(Vec::new(), default_limits(), std::path::PathBuf::from("/tmp")).unwrap();
        assert!(config.dry_run);
    }

    #[test]
    fn test_from_env_rejects_duplicate_pair_ids() {
        use rust_decimal_macros::dec;
        let pair = ArbitragePairConfig {
            id: "btc-usdt".to_string(),
            base_asset: "btc".to_string(),
            quote_asset: "usdt".to_string(),
            exchanges: vec![arc_instrument::ExchangeId::GateioSpot, arc_instrument::ExchangeId::MexcSpot],
            min_profit_bps: dec!(10),
            max_exposure_usd: dec!(5000),
            enabled: true,
            priority: 1,
        };

        let error = EngineConfig::from_env(
            vec![pair.clone(), pair],
            default_limits(),
            std::path::PathBuf::from("/tmp"),
        )
        .unwrap_err();

        assert!(matches!(error, ConfigError::InvalidPairs(_)));
    }

    fn default_limits() -> arc_risk::RiskLimits {
        use rust_decimal_macros::dec;
        arc_risk::RiskLimits {
            max_position_size_usd: dec!(10000),
            min_profit_margin_bps: dec!(10),
            max_concurrent_tasks: 4,
            max_order_notional_usd: dec!(5000),
        }
    }
}
