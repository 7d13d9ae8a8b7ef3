//! Operator error types.

use std::time::Duration;

use alloy::primitives::{Address, B256};
use dexop_bus::BusError;
use dexop_chain::ChainError;
use dexop_core::CoreError;
use thiserror::Error;

/// Pending-trade store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Nothing pending.
    #[error("Queue is empty")]
    EmptyQueue,

    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Order/trade service errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(B256),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum OperatorError {
    #[error("No signer wallets available")]
    NoWallets,

    #[error("Wallet assigned to more than one queue: {0}")]
    DuplicateWallet(Address),

    #[error("No queues configured")]
    NoQueues,

    #[error("Invalid operator config: {0}")]
    InvalidConfig(String),

    /// Enqueue or pop failed; the trade is not queued.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Bus unreachable.
    #[error("Transport error: {0}")]
    Transport(#[from] BusError),

    /// Signing, nonce lookup or broadcast failed; the trade never reached the chain.
    #[error("Submission failed: {0}")]
    Submission(ChainError),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Transaction {tx_hash} not mined within {timeout:?}")]
    MiningTimeout { tx_hash: B256, timeout: Duration },

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Operator is shutting down")]
    Shutdown,
}

pub type OperatorResult<T> = Result<T, OperatorError>;
