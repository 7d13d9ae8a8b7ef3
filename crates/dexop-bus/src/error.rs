//! Message bus error types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The bus is shut down or the topic worker has exited.
    #[error("Topic closed: {0}")]
    Closed(String),

    /// The broker cannot be reached.
    #[error("Bus unavailable: {0}")]
    Unavailable(String),

    #[error("Topic already has a subscriber: {0}")]
    AlreadySubscribed(String),

    #[error("Handler failed: {0}")]
    Handler(String),
}

pub type BusResult<T> = Result<T, BusError>;
