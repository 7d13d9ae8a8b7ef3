//! Matched trades and the pending-trade queue entry.

use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::order::Order;
use crate::signature::Signature;
use crate::wire;

/// Settlement status of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    /// Matched, not yet confirmed on chain.
    #[default]
    Pending,
    /// Mined without revert.
    Success,
    /// Rejected on chain.
    Error,
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// A match between a resting maker order and an incoming taker order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    #[serde(with = "wire::b256")]
    pub hash: B256,
    #[serde(with = "wire::address")]
    pub maker: Address,
    #[serde(with = "wire::address")]
    pub taker: Address,
    #[serde(with = "wire::address")]
    pub base_token: Address,
    #[serde(with = "wire::address")]
    pub quote_token: Address,
    #[serde(with = "wire::b256")]
    pub maker_order_hash: B256,
    #[serde(with = "wire::b256")]
    pub taker_order_hash: B256,
    #[serde(with = "wire::opt_b256", default)]
    pub tx_hash: Option<B256>,
    #[serde(default)]
    pub pair_name: String,
    #[serde(with = "wire::u256_dec")]
    pub pricepoint: U256,
    #[serde(with = "wire::u256_dec")]
    pub amount: U256,
    #[serde(default)]
    pub status: TradeStatus,
    #[serde(default)]
    pub signature: Option<Signature>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Trade {
    /// Build an unsigned trade matching `taker_order` against `maker_order`
    /// at the maker's price.
    pub fn new(maker_order: &Order, taker_order: &Order, amount: U256) -> Self {
        let now = Utc::now();
        Self {
            hash: B256::ZERO,
            maker: maker_order.user_address,
            taker: taker_order.user_address,
            base_token: maker_order.base_token,
            quote_token: maker_order.quote_token,
            maker_order_hash: maker_order.hash,
            taker_order_hash: taker_order.hash,
            tx_hash: None,
            pair_name: maker_order.pair_name.clone(),
            pricepoint: maker_order.pricepoint,
            amount,
            status: TradeStatus::Pending,
            signature: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Hash of the fields covered by the taker's signature.
    pub fn compute_hash(&self) -> B256 {
        let mut data = Vec::with_capacity(2 * 32 + 20 + 2 * 32);
        data.extend_from_slice(self.maker_order_hash.as_slice());
        data.extend_from_slice(self.taker_order_hash.as_slice());
        data.extend_from_slice(self.taker.as_slice());
        data.extend_from_slice(&self.amount.to_be_bytes::<32>());
        data.extend_from_slice(&self.pricepoint.to_be_bytes::<32>());
        keccak256(&data)
    }

    /// Recompute the hash and sign it. The exchange expects the taker's key.
    pub fn sign(&mut self, signer: &PrivateKeySigner) -> CoreResult<()> {
        self.hash = self.compute_hash();
        self.signature = Some(Signature::sign(self.hash, signer)?);
        Ok(())
    }

    /// Check that the hash matches the fields and the signature recovers to the taker.
    pub fn verify_signature(&self) -> CoreResult<bool> {
        let signature = self.signature.ok_or(CoreError::MissingSignature)?;
        if self.hash != self.compute_hash() {
            return Ok(false);
        }
        Ok(signature.recover(self.hash)? == self.taker)
    }
}

/// An (order, trade) pair awaiting settlement on one signer wallet.
///
/// `order` is the taker order the trade was produced for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTradeEntry {
    pub order: Order,
    pub trade: Trade,
}

impl PendingTradeEntry {
    pub fn new(order: Order, trade: Trade) -> Self {
        Self { order, trade }
    }

    /// Decode a `{"order": ..., "trade": ...}` payload.
    pub fn from_json(payload: &[u8]) -> CoreResult<Self> {
        Ok(serde_json::from_slice(payload)?)
    }

    pub fn to_json(&self) -> CoreResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}
