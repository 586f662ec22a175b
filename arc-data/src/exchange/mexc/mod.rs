/// Reuse-until-reject listen-key lifecycle for the private user-data stream.
pub mod listen_key;
/// Wire message shapes for MEXC's JSON-encoded spot WebSocket channels.
pub mod message;
/// REST snapshot fetch and listen-key lifecycle.
pub mod rest;
/// [`crate::client::ExchangeWsProtocol`] implementation for MEXC's
/// `SUBSCRIPTION`-method channels.
pub mod subscription;
/// [`arc_instrument::SymbolMapper`] implementation for MEXC's concatenated `BASEQUOTE`
/// pair strings.
pub mod symbol;

pub use subscription::MexcProtocol;
pub use symbol::MexcSymbolMapper;
