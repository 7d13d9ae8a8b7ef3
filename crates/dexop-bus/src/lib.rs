//! Message bus for the settlement operator.
//!
//! The matching engine publishes matched pairs on [`TRADES_TOPIC`]; the
//! operator publishes status envelopes on [`OPERATOR_TOPIC`]. Handlers are
//! registered per topic and run on a dedicated worker fed by a bounded
//! channel.

pub mod bus;
pub mod error;
pub mod memory;

pub use bus::{
    handler_fn, DynMessageBus, DynMessageHandler, FnHandler, MessageBus, MessageHandler,
    MockBus, Subscription, OPERATOR_TOPIC, TRADES_TOPIC,
};
pub use error::{BusError, BusResult};
pub use memory::{InMemoryBus, DEFAULT_TOPIC_CAPACITY};
