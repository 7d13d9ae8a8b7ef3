//! Exchange orders.

use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::signature::Signature;
use crate::wire;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Numeric encoding used in order hashes (BUY = 0, SELL = 1).
    fn hash_word(&self) -> U256 {
        match self {
            Self::Buy => U256::ZERO,
            Self::Sell => U256::from(1u8),
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderType {
    /// Limit order.
    #[default]
    #[serde(rename = "LO")]
    Limit,
    /// Market order.
    #[serde(rename = "MO")]
    Market,
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Open,
    PartialFilled,
    Filled,
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::PartialFilled => write!(f, "PARTIAL_FILLED"),
            Self::Filled => write!(f, "FILLED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A signed exchange order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(with = "wire::b256")]
    pub hash: B256,
    #[serde(with = "wire::address")]
    pub user_address: Address,
    #[serde(with = "wire::address")]
    pub exchange_address: Address,
    #[serde(with = "wire::address")]
    pub base_token: Address,
    #[serde(with = "wire::address")]
    pub quote_token: Address,
    pub side: OrderSide,
    #[serde(rename = "type", default)]
    pub order_type: OrderType,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(with = "wire::u256_dec")]
    pub amount: U256,
    #[serde(with = "wire::u256_dec", default)]
    pub filled_amount: U256,
    #[serde(with = "wire::u256_dec")]
    pub pricepoint: U256,
    #[serde(with = "wire::u256_dec")]
    pub nonce: U256,
    #[serde(with = "wire::u256_dec", default)]
    pub make_fee: U256,
    #[serde(with = "wire::u256_dec", default)]
    pub take_fee: U256,
    #[serde(default)]
    pub signature: Option<Signature>,
    #[serde(default)]
    pub pair_name: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Create an unsigned open limit order.
    pub fn new(
        user_address: Address,
        exchange_address: Address,
        base_token: Address,
        quote_token: Address,
        side: OrderSide,
        amount: U256,
        pricepoint: U256,
    ) -> Self {
        let now = Utc::now();
        Self {
            hash: B256::ZERO,
            user_address,
            exchange_address,
            base_token,
            quote_token,
            side,
            order_type: OrderType::Limit,
            status: OrderStatus::Open,
            amount,
            filled_amount: U256::ZERO,
            pricepoint,
            nonce: U256::ZERO,
            make_fee: U256::ZERO,
            take_fee: U256::ZERO,
            signature: None,
            pair_name: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Hash of the fields covered by the user's signature.
    pub fn compute_hash(&self) -> B256 {
        let mut data = Vec::with_capacity(4 * 20 + 6 * 32);
        data.extend_from_slice(self.exchange_address.as_slice());
        data.extend_from_slice(self.user_address.as_slice());
        data.extend_from_slice(self.base_token.as_slice());
        data.extend_from_slice(self.quote_token.as_slice());
        data.extend_from_slice(&self.amount.to_be_bytes::<32>());
        data.extend_from_slice(&self.pricepoint.to_be_bytes::<32>());
        data.extend_from_slice(&self.side.hash_word().to_be_bytes::<32>());
        data.extend_from_slice(&self.nonce.to_be_bytes::<32>());
        data.extend_from_slice(&self.make_fee.to_be_bytes::<32>());
        data.extend_from_slice(&self.take_fee.to_be_bytes::<32>());
        keccak256(&data)
    }

    /// Recompute the hash and sign it with `signer`.
    pub fn sign(&mut self, signer: &PrivateKeySigner) -> CoreResult<()> {
        self.hash = self.compute_hash();
        self.signature = Some(Signature::sign(self.hash, signer)?);
        Ok(())
    }

    /// Check that the hash matches the fields and the signature recovers to the user.
    pub fn verify_signature(&self) -> CoreResult<bool> {
        let signature = self.signature.ok_or(CoreError::MissingSignature)?;
        if self.hash != self.compute_hash() {
            return Ok(false);
        }
        Ok(signature.recover(self.hash)? == self.user_address)
    }

    /// Remaining unfilled amount.
    #[must_use]
    pub fn remaining_amount(&self) -> U256 {
        self.amount.saturating_sub(self.filled_amount)
    }
}
