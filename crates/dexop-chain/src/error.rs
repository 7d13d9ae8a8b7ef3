//! Chain error types.

use alloy::primitives::{Address, B256};
use thiserror::Error;

/// Key loading errors.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Failed to decode hex: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Address mismatch: expected {expected}, got {actual}")]
    AddressMismatch { expected: Address, actual: Address },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from wallets, the exchange client and the provider.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("No signer wallets available")]
    NoWallets,

    #[error("Sender is not a registered operator: {0}")]
    NotOperator(Address),

    #[error("Nonce mismatch for {account}: expected {expected}, got {got}")]
    NonceMismatch {
        account: Address,
        expected: u64,
        got: u64,
    },

    #[error("Signer {signer} does not match sender {from}")]
    SignerMismatch { signer: Address, from: Address },

    #[error("Submission rejected: {0}")]
    Rejected(String),

    #[error("Signing failed: {0}")]
    Signing(#[from] dexop_core::CoreError),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Unknown transaction: {0}")]
    UnknownTransaction(B256),
}

pub type ChainResult<T> = Result<T, ChainError>;
