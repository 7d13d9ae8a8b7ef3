//! Order and trade services the operator calls into.
//!
//! The operator only needs a narrow slice of each service; the traits below
//! are that slice. The in-memory implementations back the standalone server
//! and the tests, and also consume the operator's own status messages so
//! their records follow settlement.

use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use chrono::Utc;
use dashmap::{DashMap, DashSet};
use dexop_bus::{handler_fn, BusError, DynMessageHandler};
use dexop_core::{
    BoxFuture, OperatorMessage, OperatorMessageType, Order, OrderStatus, StopOrder, Trade,
    TradeStatus,
};
use tracing::{debug, warn};

use crate::error::{ServiceError, ServiceResult};

// =============================================================================
// Traits
// =============================================================================

pub trait OrderService: Send + Sync {
    fn get_by_hash(&self, hash: B256) -> BoxFuture<'_, ServiceResult<Option<Order>>>;

    /// Accept a new live order. Re-submitting a known hash is a no-op.
    fn new_order(&self, order: Order) -> BoxFuture<'_, ServiceResult<()>>;

    /// Replace the stored stop order `hash`.
    fn update_stop_order(&self, hash: B256, stop_order: StopOrder)
        -> BoxFuture<'_, ServiceResult<()>>;

    /// PENDING stop orders on the pair whose condition `price` satisfies.
    fn get_triggered_stop_orders(
        &self,
        base_token: Address,
        quote_token: Address,
        price: U256,
    ) -> BoxFuture<'_, ServiceResult<Vec<StopOrder>>>;
}

/// Arc wrapper for OrderService trait objects.
pub type DynOrderService = Arc<dyn OrderService>;

pub trait TradeService: Send + Sync {
    fn get_by_hash(&self, hash: B256) -> BoxFuture<'_, ServiceResult<Option<Trade>>>;

    /// Record the settlement transaction of `trade`.
    fn update_trade_tx_hash<'a>(
        &'a self,
        trade: &'a Trade,
        tx_hash: B256,
    ) -> BoxFuture<'a, ServiceResult<()>>;
}

/// Arc wrapper for TradeService trait objects.
pub type DynTradeService = Arc<dyn TradeService>;

// =============================================================================
// InMemoryOrderService
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryOrderService {
    orders: DashMap<B256, Order>,
    stop_orders: DashMap<B256, StopOrder>,
    /// Orders whose submission fails (test hook).
    rejected: DashSet<B256>,
}

impl InMemoryOrderService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_order(&self, order: Order) {
        self.orders.insert(order.hash, order);
    }

    pub fn add_stop_order(&self, stop_order: StopOrder) {
        self.stop_orders.insert(stop_order.hash, stop_order);
    }

    #[must_use]
    pub fn order(&self, hash: &B256) -> Option<Order> {
        self.orders.get(hash).map(|o| o.clone())
    }

    #[must_use]
    pub fn stop_order(&self, hash: &B256) -> Option<StopOrder> {
        self.stop_orders.get(hash).map(|o| o.clone())
    }

    #[must_use]
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Make [`OrderService::new_order`] fail for `hash`.
    pub fn reject_new_order(&self, hash: B256) {
        self.rejected.insert(hash);
    }

    /// Apply a successful fill to both sides of the trade.
    pub fn handle_operator_message(&self, message: &OperatorMessage) {
        if message.message_type != OperatorMessageType::TradeSuccess {
            return;
        }
        let trade = &message.trade;
        for hash in [trade.maker_order_hash, trade.taker_order_hash] {
            if let Some(mut order) = self.orders.get_mut(&hash) {
                order.filled_amount = order.filled_amount.saturating_add(trade.amount);
                order.status = if order.filled_amount >= order.amount {
                    OrderStatus::Filled
                } else {
                    OrderStatus::PartialFilled
                };
                order.updated_at = Utc::now();
            }
        }
    }
}

impl OrderService for InMemoryOrderService {
    fn get_by_hash(&self, hash: B256) -> BoxFuture<'_, ServiceResult<Option<Order>>> {
        Box::pin(async move { Ok(self.order(&hash)) })
    }

    fn new_order(&self, order: Order) -> BoxFuture<'_, ServiceResult<()>> {
        Box::pin(async move {
            if self.rejected.contains(&order.hash) {
                return Err(ServiceError::Storage(format!(
                    "order {} rejected",
                    order.hash
                )));
            }
            match self.orders.entry(order.hash) {
                dashmap::mapref::entry::Entry::Occupied(_) => {
                    debug!(order_hash = %order.hash, "Order already known");
                }
                dashmap::mapref::entry::Entry::Vacant(slot) => {
                    slot.insert(order);
                }
            }
            Ok(())
        })
    }

    fn update_stop_order(
        &self,
        hash: B256,
        stop_order: StopOrder,
    ) -> BoxFuture<'_, ServiceResult<()>> {
        Box::pin(async move {
            let mut stored = self
                .stop_orders
                .get_mut(&hash)
                .ok_or(ServiceError::NotFound(hash))?;
            *stored = stop_order;
            Ok(())
        })
    }

    fn get_triggered_stop_orders(
        &self,
        base_token: Address,
        quote_token: Address,
        price: U256,
    ) -> BoxFuture<'_, ServiceResult<Vec<StopOrder>>> {
        Box::pin(async move {
            let mut triggered: Vec<StopOrder> = self
                .stop_orders
                .iter()
                .filter(|s| {
                    s.base_token == base_token
                        && s.quote_token == quote_token
                        && s.is_triggered_by(price)
                })
                .map(|s| s.clone())
                .collect();
            triggered.sort_by_key(|s| s.created_at);
            Ok(triggered)
        })
    }
}

// =============================================================================
// InMemoryTradeService
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryTradeService {
    trades: DashMap<B256, Trade>,
}

impl InMemoryTradeService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_trade(&self, trade: Trade) {
        self.trades.insert(trade.hash, trade);
    }

    #[must_use]
    pub fn trade(&self, hash: &B256) -> Option<Trade> {
        self.trades.get(hash).map(|t| t.clone())
    }

    /// Follow a trade through SENT and its terminal status.
    pub fn handle_operator_message(&self, message: &OperatorMessage) {
        let status = match message.message_type {
            OperatorMessageType::TradeSent => TradeStatus::Pending,
            OperatorMessageType::TradeSuccess => TradeStatus::Success,
            OperatorMessageType::TradeError => TradeStatus::Error,
        };

        let mut trade = self
            .trades
            .entry(message.trade.hash)
            .or_insert_with(|| message.trade.clone());
        trade.status = status;
        if message.trade.tx_hash.is_some() {
            trade.tx_hash = message.trade.tx_hash;
        }
        trade.updated_at = Utc::now();
    }
}

impl TradeService for InMemoryTradeService {
    fn get_by_hash(&self, hash: B256) -> BoxFuture<'_, ServiceResult<Option<Trade>>> {
        Box::pin(async move { Ok(self.trade(&hash)) })
    }

    fn update_trade_tx_hash<'a>(
        &'a self,
        trade: &'a Trade,
        tx_hash: B256,
    ) -> BoxFuture<'a, ServiceResult<()>> {
        Box::pin(async move {
            let mut stored = self
                .trades
                .entry(trade.hash)
                .or_insert_with(|| trade.clone());
            stored.tx_hash = Some(tx_hash);
            stored.updated_at = Utc::now();
            Ok(())
        })
    }
}

/// Operator-topic handler feeding status messages into both services.
pub fn status_handler(
    orders: Arc<InMemoryOrderService>,
    trades: Arc<InMemoryTradeService>,
) -> DynMessageHandler {
    handler_fn(move |payload: Vec<u8>| {
        let orders = Arc::clone(&orders);
        let trades = Arc::clone(&trades);
        async move {
            let message = OperatorMessage::from_json(&payload).map_err(|e| {
                warn!(error = %e, "Undecodable operator message");
                BusError::Handler(e.to_string())
            })?;
            debug!(
                message_type = %message.message_type,
                trade_hash = %message.trade.hash,
                "Applying operator message"
            );
            trades.handle_operator_message(&message);
            orders.handle_operator_message(&message);
            Ok(())
        }
    })
}
