use arc_instrument::SymbolMapError;
use thiserror::Error;

/// Errors raised while decoding exchange wire payloads into the unified data model, or
/// while maintaining an [`crate::books::OrderBook`].
#[derive(Debug, Error)]
pub enum DataError {
    #[error("transport error: {0}")]
    Transport(#[from] arc_integration::SocketError),

    #[error("symbol mapping error: {0}")]
    Symbol(#[from] SymbolMapError),

    #[error("malformed wire payload: {0}")]
    Parse(String),

    #[error("order book sequence gap: {0}")]
    SequenceGap(#[from] crate::books::SequenceGap),

    #[error("order book invariant violated: {0}")]
    InvariantViolation(String),

    #[error("subscription rejected by exchange: {0}")]
    Subscribe(String),

    #[error("unrecognised message kind, dropping: {0}")]
    UnknownMessageKind(String),
}

impl DataError {
    /// `true` iff the failure is a `ParseError` rather than one warranting a resync.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, DataError::Parse(_))
    }
}
