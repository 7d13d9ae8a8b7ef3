//! Chain provider: receipts, pending nonces and mining waits.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Log, B256};
use alloy::sol;
use alloy::sol_types::SolEvent;
use dexop_core::BoxFuture;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use crate::error::ChainResult;

/// Receipt polling interval used when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Shorter polling intervals are raised to this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// `LogError` id: maker or taker signature does not recover to its owner.
pub const ERR_INVALID_SIGNATURE: u8 = 2;

/// `LogError` id: trade already settled or no longer fillable.
pub const ERR_TRADE_INVALID: u8 = 10;

sol! {
    /// Emitted by the exchange contract when it refuses a trade.
    event LogError(uint8 errorId, bytes32 makerOrderHash, bytes32 takerOrderHash);
}

/// Human-readable label for a `LogError` id.
pub fn describe_error_id(err_id: u8) -> &'static str {
    match err_id {
        ERR_INVALID_SIGNATURE => "invalid signature",
        ERR_TRADE_INVALID => "trade no longer valid",
        0 => "reverted without error log",
        _ => "unknown exchange error",
    }
}

/// Mined transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: B256,
    pub block_number: u64,
    /// `false` when the transaction reverted.
    pub status: bool,
    pub logs: Vec<Log>,
}

impl Receipt {
    /// Exchange error id, if the contract refused the trade.
    ///
    /// The contract reports refusals through a `LogError` event on a
    /// successful transaction; a reverted transaction without one reports 0.
    #[must_use]
    pub fn error_id(&self) -> Option<u8> {
        let logged = self
            .logs
            .iter()
            .find_map(|log| LogError::decode_log_data(&log.data, true).ok())
            .map(|event| event.errorId);

        match logged {
            Some(id) => Some(id),
            None if !self.status => Some(0),
            None => None,
        }
    }
}

/// Read access to the chain.
pub trait EthereumProvider: Send + Sync {
    /// Receipt for `tx_hash`, `None` while the transaction is pending.
    fn transaction_receipt(&self, tx_hash: B256) -> BoxFuture<'_, ChainResult<Option<Receipt>>>;

    /// Next nonce for `address` including pending transactions.
    fn pending_nonce_at(&self, address: Address) -> BoxFuture<'_, ChainResult<u64>>;

    /// Poll every `poll_interval` (at least 1ms) until `tx_hash` is mined.
    ///
    /// Lookup errors are retried. There is no deadline; callers that need
    /// one wrap the future in a timeout or select against shutdown.
    fn wait_mined(&self, tx_hash: B256, poll_interval: Duration) -> BoxFuture<'_, ChainResult<Receipt>> {
        Box::pin(async move {
            let mut ticker = tokio::time::interval(poll_interval.max(MIN_POLL_INTERVAL));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match self.transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return Ok(receipt),
                    Ok(None) => trace!(%tx_hash, "Transaction pending"),
                    Err(e) => debug!(%tx_hash, error = %e, "Receipt lookup failed, retrying"),
                }
            }
        })
    }
}

/// Arc wrapper for EthereumProvider trait objects.
pub type DynEthereumProvider = Arc<dyn EthereumProvider>;
