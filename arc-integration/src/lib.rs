#![warn(
    unused,
    clippy::cognitive_complexity,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity)]

//! # Arc-Integration Transport plumbing shared by every exchange-specific REST and
//! WebSocket client in the workspace: the [`error::SocketError`] taxonomy root,
//! [`rate_limit`]'s token-bucket limiter, and the [`protocol::http`] /
//! [`protocol::websocket`] primitives.

pub mod error;
pub mod protocol;
pub mod rate_limit;

pub use error::SocketError;
pub use rate_limit::{EndpointLimit, EndpointRateLimitTable, Priority, RateLimiter};
