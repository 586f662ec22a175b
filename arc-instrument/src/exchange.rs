use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Identifies one of the venues this engine is wired to speak to. Wire protocols are
/// defined for exactly these two exchanges; adding a third is an additive variant plus
/// a new `arc-data::exchange::<name>` module, not a rewrite of this type.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Display, Deserialize, Serialize,
)]
pub enum ExchangeId {
    #[display("gateio_spot")]
    GateioSpot,
    #[display("mexc_spot")]
    MexcSpot,
}

impl ExchangeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::GateioSpot => "gateio_spot",
            ExchangeId::MexcSpot => "mexc_spot",
        }
    }
}

/// Opaque, exchange-namespaced account identifier, used by the Private-State Tracker to
/// key per-(exchange, account) state.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Display, Deserialize, Serialize)]
pub struct ExchangeName(String);

impl ExchangeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl From<ExchangeId> for ExchangeName {
    fn from(value: ExchangeId) -> Self {
        Self::new(value.as_str())
    }
}
