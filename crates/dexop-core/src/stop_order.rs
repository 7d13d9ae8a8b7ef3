//! Stop orders: conditional orders that become live once a trade crosses
//! their stop price.

use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::order::{Order, OrderSide, OrderStatus, OrderType};
use crate::signature::Signature;
use crate::wire;

/// Stop order kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StopOrderType {
    /// Becomes a market order priced at the stop price.
    #[serde(rename = "SMO")]
    StopMarket,
    /// Becomes a limit order priced at the limit price.
    #[serde(rename = "SLO")]
    StopLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopOrderStatus {
    #[default]
    Pending,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopOrder {
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
    #[serde(rename = "type")]
    pub stop_type: StopOrderType,
    #[serde(default)]
    pub status: StopOrderStatus,
    #[serde(with = "wire::u256_dec")]
    pub stop_price: U256,
    #[serde(with = "wire::u256_dec", default)]
    pub limit_price: U256,
    #[serde(with = "wire::u256_dec")]
    pub amount: U256,
    #[serde(with = "wire::u256_dec", default)]
    pub filled_amount: U256,
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

impl StopOrder {
    /// Whether a trade at `price` satisfies the stop condition.
    ///
    /// Buy stops fire when the market rises to the stop price, sell stops
    /// when it falls to it.
    #[must_use]
    pub fn is_triggered_by(&self, price: U256) -> bool {
        if self.status != StopOrderStatus::Pending {
            return false;
        }
        match self.side {
            OrderSide::Buy => price >= self.stop_price,
            OrderSide::Sell => price <= self.stop_price,
        }
    }

    /// Convert into the live order submitted once triggered.
    ///
    /// The order keeps this stop order's hash and signature so the user's
    /// original authorisation travels with it.
    pub fn to_order(&self) -> CoreResult<Order> {
        if self.status == StopOrderStatus::Done {
            return Err(CoreError::StopOrderDone(self.hash));
        }

        let (order_type, pricepoint) = match self.stop_type {
            StopOrderType::StopMarket => (OrderType::Market, self.stop_price),
            StopOrderType::StopLimit => (OrderType::Limit, self.limit_price),
        };

        let now = Utc::now();
        Ok(Order {
            hash: self.hash,
            user_address: self.user_address,
            exchange_address: self.exchange_address,
            base_token: self.base_token,
            quote_token: self.quote_token,
            side: self.side,
            order_type,
            status: OrderStatus::Open,
            amount: self.amount,
            filled_amount: U256::ZERO,
            pricepoint,
            nonce: self.nonce,
            make_fee: self.make_fee,
            take_fee: self.take_fee,
            signature: self.signature,
            pair_name: self.pair_name.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn compute_hash(&self) -> B256 {
        let mut data = Vec::with_capacity(4 * 20 + 8 * 32);
        data.extend_from_slice(self.exchange_address.as_slice());
        data.extend_from_slice(self.user_address.as_slice());
        data.extend_from_slice(self.base_token.as_slice());
        data.extend_from_slice(self.quote_token.as_slice());
        data.extend_from_slice(&self.amount.to_be_bytes::<32>());
        data.extend_from_slice(&self.stop_price.to_be_bytes::<32>());
        data.extend_from_slice(&self.limit_price.to_be_bytes::<32>());
        let side = match self.side {
            OrderSide::Buy => U256::ZERO,
            OrderSide::Sell => U256::from(1u8),
        };
        data.extend_from_slice(&side.to_be_bytes::<32>());
        data.extend_from_slice(&self.nonce.to_be_bytes::<32>());
        data.extend_from_slice(&self.make_fee.to_be_bytes::<32>());
        data.extend_from_slice(&self.take_fee.to_be_bytes::<32>());
        keccak256(&data)
    }

    pub fn sign(&mut self, signer: &PrivateKeySigner) -> CoreResult<()> {
        self.hash = self.compute_hash();
        self.signature = Some(Signature::sign(self.hash, signer)?);
        Ok(())
    }
}
