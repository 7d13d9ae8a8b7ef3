//! Blockchain-facing collaborators of the settlement operator.
//!
//! - `Wallet`, `KeySource`, `WalletService`: signer identities, one per queue
//! - `NonceTracker`: per-wallet nonce reservation
//! - `ExchangeClient`: submits matched pairs to the exchange contract
//! - `EthereumProvider`: receipt polling and pending nonce lookups
//! - `SimulatedChain`: in-process exchange contract used by the server's
//!   simulated mode and by tests

pub mod client;
pub mod error;
pub mod factory;
pub mod nonce;
pub mod provider;
pub mod simulated;
pub mod wallet;

pub use client::{DynExchangeClient, ExchangeClient, SignOpts, Transaction};
pub use error::{ChainError, ChainResult, KeyError};
pub use factory::{OrderFactory, SIM_BASE_TOKEN, SIM_QUOTE_TOKEN};
pub use nonce::NonceTracker;
pub use provider::{
    describe_error_id, DynEthereumProvider, EthereumProvider, LogError, Receipt,
    DEFAULT_POLL_INTERVAL, ERR_INVALID_SIGNATURE, ERR_TRADE_INVALID, MIN_POLL_INTERVAL,
};
pub use simulated::SimulatedChain;
pub use wallet::{DynWalletService, KeySource, StaticWalletService, Wallet, WalletService};
