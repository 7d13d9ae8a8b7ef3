//! Signed order and trade builders for simulated trading and tests.

use std::sync::atomic::{AtomicU64, Ordering};

use alloy::primitives::{Address, B256, U256};
use chrono::Utc;
use dexop_core::{Order, OrderSide, StopOrder, StopOrderStatus, StopOrderType, Trade};

use crate::error::ChainResult;
use crate::wallet::Wallet;

/// Default base/quote tokens of the simulated pair.
pub const SIM_BASE_TOKEN: Address = Address::new([0xba; 20]);
pub const SIM_QUOTE_TOKEN: Address = Address::new([0x9e; 20]);

/// Builds orders signed by one user wallet, with increasing nonces.
pub struct OrderFactory {
    wallet: Wallet,
    exchange: Address,
    base_token: Address,
    quote_token: Address,
    nonce: AtomicU64,
}

impl OrderFactory {
    pub fn new(wallet: Wallet, exchange: Address) -> Self {
        Self {
            wallet,
            exchange,
            base_token: SIM_BASE_TOKEN,
            quote_token: SIM_QUOTE_TOKEN,
            nonce: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_pair(mut self, base_token: Address, quote_token: Address) -> Self {
        self.base_token = base_token;
        self.quote_token = quote_token;
        self
    }

    #[must_use]
    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    fn next_nonce(&self) -> U256 {
        U256::from(self.nonce.fetch_add(1, Ordering::Relaxed))
    }

    /// A signed limit order.
    pub fn new_order(&self, side: OrderSide, amount: U256, pricepoint: U256) -> ChainResult<Order> {
        let mut order = Order::new(
            self.wallet.address(),
            self.exchange,
            self.base_token,
            self.quote_token,
            side,
            amount,
            pricepoint,
        );
        order.nonce = self.next_nonce();
        order.pair_name = "BASE/QUOTE".to_string();
        order.sign(self.wallet.signer())?;
        Ok(order)
    }

    /// A signed stop order in PENDING status.
    pub fn new_stop_order(
        &self,
        side: OrderSide,
        stop_type: StopOrderType,
        amount: U256,
        stop_price: U256,
        limit_price: U256,
    ) -> ChainResult<StopOrder> {
        let now = Utc::now();
        let mut stop = StopOrder {
            hash: B256::ZERO,
            user_address: self.wallet.address(),
            exchange_address: self.exchange,
            base_token: self.base_token,
            quote_token: self.quote_token,
            side,
            stop_type,
            status: StopOrderStatus::Pending,
            stop_price,
            limit_price,
            amount,
            filled_amount: U256::ZERO,
            nonce: self.next_nonce(),
            make_fee: U256::ZERO,
            take_fee: U256::ZERO,
            signature: None,
            pair_name: "BASE/QUOTE".to_string(),
            created_at: now,
            updated_at: now,
        };
        stop.sign(self.wallet.signer())?;
        Ok(stop)
    }

    /// Match a fresh taker order from this factory against a fresh maker
    /// order from `maker`, returning the taker order and the taker-signed trade.
    pub fn matched_trade(
        &self,
        maker: &OrderFactory,
        amount: U256,
        pricepoint: U256,
    ) -> ChainResult<(Order, Trade)> {
        let maker_order = maker.new_order(OrderSide::Sell, amount, pricepoint)?;
        let taker_order = self.new_order(OrderSide::Buy, amount, pricepoint)?;

        let mut trade = Trade::new(&maker_order, &taker_order, amount);
        trade.sign(self.wallet.signer())?;
        Ok((taker_order, trade))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_are_signed_with_increasing_nonces() {
        let factory = OrderFactory::new(Wallet::dev(1).unwrap(), Address::repeat_byte(0xee));

        let a = factory
            .new_order(OrderSide::Buy, U256::from(1u64), U256::from(1u64))
            .unwrap();
        let b = factory
            .new_order(OrderSide::Buy, U256::from(1u64), U256::from(1u64))
            .unwrap();

        assert!(a.verify_signature().unwrap());
        assert!(b.verify_signature().unwrap());
        assert_ne!(a.hash, b.hash);
        assert_eq!(b.nonce, a.nonce + U256::from(1u64));
    }

    #[test]
    fn test_matched_trade_is_taker_signed() {
        let exchange = Address::repeat_byte(0xee);
        let maker = OrderFactory::new(Wallet::dev(1).unwrap(), exchange);
        let taker = OrderFactory::new(Wallet::dev(2).unwrap(), exchange);

        let (order, trade) = taker
            .matched_trade(&maker, U256::from(5u64), U256::from(20u64))
            .unwrap();

        assert_eq!(order.hash, trade.taker_order_hash);
        assert_eq!(trade.taker, taker.wallet().address());
        assert_eq!(trade.maker, maker.wallet().address());
        assert!(trade.verify_signature().unwrap());
    }

    #[test]
    fn test_stop_order_pair_and_signature() {
        let factory = OrderFactory::new(Wallet::dev(3).unwrap(), Address::repeat_byte(0xee))
            .with_pair(Address::repeat_byte(1), Address::repeat_byte(2));

        let stop = factory
            .new_stop_order(
                OrderSide::Sell,
                StopOrderType::StopLimit,
                U256::from(3u64),
                U256::from(90u64),
                U256::from(88u64),
            )
            .unwrap();

        assert_eq!(stop.base_token, Address::repeat_byte(1));
        assert_eq!(stop.hash, stop.compute_hash());
        assert!(stop.signature.is_some());
    }
}
