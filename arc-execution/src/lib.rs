#![warn(
    unused,
    clippy::cognitive_complexity,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity)]

//! # Arc-Execution Order placement clients for each exchange, the private-account
//! domain model ([`balance`], [`position`], [`order`]), and the
//! [`tracker::PrivateStateTracker`] that reconciles websocket and REST account state.

pub mod balance;
pub mod client;
pub mod error;
pub mod order;
pub mod position;
pub mod tracker;

pub use balance::{AccountBalance, AssetBalance};
pub use client::ExecutionClient;
pub use error::{ApiError, ClientError, ConnectivityError};
pub use order::{ClientOrderId, Order, OrderId, OrderRequest, OrderStatus, OrderType, TimeInForce};
pub use position::Position;
pub use tracker::PrivateStateTracker;
