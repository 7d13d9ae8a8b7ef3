//! Exchange contract client.

use std::fmt;
use std::sync::Arc;

use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;
use dexop_core::{BoxFuture, Order, Trade};

use crate::error::ChainResult;
use crate::wallet::Wallet;

/// Signing context for one submission.
#[derive(Clone)]
pub struct SignOpts {
    pub from: Address,
    pub nonce: u64,
    pub signer: Arc<PrivateKeySigner>,
}

impl SignOpts {
    pub fn new(wallet: &Wallet, nonce: u64) -> Self {
        Self {
            from: wallet.address(),
            nonce,
            signer: Arc::clone(wallet.signer()),
        }
    }
}

impl fmt::Debug for SignOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignOpts")
            .field("from", &self.from)
            .field("nonce", &self.nonce)
            .finish_non_exhaustive()
    }
}

/// A broadcast transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub hash: B256,
    pub from: Address,
    pub to: Address,
    pub nonce: u64,
}

/// Submits matched pairs to the exchange contract.
pub trait ExchangeClient: Send + Sync {
    /// Sign and broadcast a `trade` call for `order`/`trade` with `opts`.
    ///
    /// Resolves once the node accepted the transaction; it is not mined yet.
    fn trade<'a>(
        &'a self,
        order: &'a Order,
        trade: &'a Trade,
        opts: &'a SignOpts,
    ) -> BoxFuture<'a, ChainResult<Transaction>>;
}

/// Arc wrapper for ExchangeClient trait objects.
pub type DynExchangeClient = Arc<dyn ExchangeClient>;
