//! Core domain types for the DEX settlement operator.
//!
//! This crate provides the types exchanged between the matching engine,
//! the operator and the order/trade services:
//! - `Order`, `Trade`, `StopOrder`: matched exchange objects with hashing and signing
//! - `PendingTradeEntry`: the unit queued per signer wallet
//! - `OperatorMessage`: status envelope published on the operator topic

pub mod error;
pub mod message;
pub mod order;
pub mod signature;
pub mod stop_order;
pub mod trade;
pub mod wire;

use std::future::Future;
use std::pin::Pin;

pub use error::{CoreError, CoreResult};
pub use message::{OperatorMessage, OperatorMessageType};
pub use order::{Order, OrderSide, OrderStatus, OrderType};
pub use signature::Signature;
pub use stop_order::{StopOrder, StopOrderStatus, StopOrderType};
pub use trade::{PendingTradeEntry, Trade, TradeStatus};

/// Boxed future type for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
