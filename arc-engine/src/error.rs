use arc_instrument::{ExchangeId, Symbol};
use thiserror::Error;

/// Top-level error taxonomy for the running engine process, tying together the
/// component-specific error types surfaced by every other crate in the workspace.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("execution client: {0}")]
    Client(#[from] arc_execution::error::ClientError),

    #[error("market data: {0}")]
    Data(#[from] arc_data::DataError),

    #[error("configuration: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("risk check failed for {symbol}: {violation:?}")]
    RiskViolation {
        symbol: Symbol,
        violation: arc_risk::RiskViolation,
    },

    #[error("order placement on {exchange} for {symbol} timed out awaiting acknowledgement")]
    OrderAckTimeout { exchange: ExchangeId, symbol: Symbol },

    #[error("task {task_id} entered an inconsistent state: {detail}")]
    InvariantViolation { task_id: String, detail: String },

    #[error("persistence error for task {task_id}: {source}")]
    Persistence {
        task_id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error for task {task_id}: {source}")]
    Serialization {
        task_id: String,
        #[source]
        source: serde_json::Error,
    },
}
