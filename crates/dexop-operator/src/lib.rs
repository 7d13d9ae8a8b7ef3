//! Settlement operator for matched DEX trades.
//!
//! One [`TxQueue`] per signer wallet drains its own FIFO of pending
//! (order, trade) pairs strictly sequentially: submit, wait for mining,
//! report status on the operator topic, then convert any stop orders the
//! trade triggered. The [`Operator`] owns the queue pool and routes every
//! incoming trade to the shortest queue.
//!
//! Per-trade status flow:
//! `PENDING -> EXECUTING -> SENT -> SUCCESS | ERROR`, with no retry path.

pub mod config;
pub mod error;
pub mod halt;
pub mod journal;
pub mod operator;
pub mod services;
pub mod status;
pub mod store;
pub mod txqueue;

pub use config::{OperatorConfig, StoreConfig, TieBreak};
pub use error::{OperatorError, OperatorResult, ServiceError, ServiceResult, StoreError, StoreResult};
pub use halt::HaltLatch;
pub use journal::JournalTradeStore;
pub use operator::Operator;
pub use services::{
    status_handler, DynOrderService, DynTradeService, InMemoryOrderService, InMemoryTradeService,
    OrderService, TradeService,
};
pub use status::StatusPublisher;
pub use store::{DynTradeStore, MemoryTradeStore, PendingTradeStore};
pub use txqueue::{QueueDeps, QueueTiming, TxQueue, QUEUE_NAME_PREFIX};
