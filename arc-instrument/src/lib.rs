#![warn(
    unused,
    clippy::cognitive_complexity,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity)]

//! # Arc-Instrument Core data structures shared across the Arcflux workspace: the
//! normalised [`symbol::Symbol`] and [`asset::AssetName`] identifiers exchanges are
//! mapped onto, and the [`symbol::SymbolMapper`] trait each exchange implements to
//! translate between its native pair strings and the unified model.

pub mod asset;
pub mod exchange;
pub mod symbol;
pub mod trade;

pub use asset::AssetName;
pub use exchange::{ExchangeId, ExchangeName};
pub use symbol::{Symbol, SymbolInfo, SymbolMapError, SymbolMapper};
pub use trade::{Side, Trade};
