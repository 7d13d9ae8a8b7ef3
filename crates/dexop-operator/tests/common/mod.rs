//! Shared wiring for operator integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use dexop_bus::{handler_fn, InMemoryBus, MessageBus, OPERATOR_TOPIC, TRADES_TOPIC};
use dexop_chain::{OrderFactory, SimulatedChain, Wallet};
use dexop_core::{OperatorMessage, Order, PendingTradeEntry, Trade};
use dexop_operator::{
    InMemoryOrderService, InMemoryTradeService, Operator, OperatorConfig, QueueDeps,
    StatusPublisher, StoreConfig,
};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

pub const EXCHANGE: Address = Address::new([0xee; 20]);

pub struct Harness {
    pub bus: Arc<InMemoryBus>,
    pub chain: Arc<SimulatedChain>,
    pub orders: Arc<InMemoryOrderService>,
    pub trades: Arc<InMemoryTradeService>,
    pub operator: Arc<Operator>,
    pub maker: OrderFactory,
    pub taker: OrderFactory,
    pub shutdown: CancellationToken,
    messages: mpsc::UnboundedReceiver<OperatorMessage>,
}

impl Harness {
    /// Operator over dev wallets `0..queues`, memory stores, auto-mining chain.
    pub fn new(queues: usize) -> Self {
        Self::with_store(queues, StoreConfig::Memory)
    }

    pub fn with_store(queues: usize, store: StoreConfig) -> Self {
        let shutdown = CancellationToken::new();
        let bus = Arc::new(InMemoryBus::new(256, shutdown.clone()));
        let chain = Arc::new(SimulatedChain::new(EXCHANGE, true));
        let orders = Arc::new(InMemoryOrderService::new());
        let trades = Arc::new(InMemoryTradeService::new());

        let wallets: Vec<Wallet> = (0..queues).map(|i| Wallet::dev(i).unwrap()).collect();
        for wallet in &wallets {
            chain.register_operator(wallet.address());
        }

        let deps = QueueDeps {
            exchange: chain.clone(),
            provider: chain.clone(),
            order_service: orders.clone(),
            trade_service: trades.clone(),
            status: StatusPublisher::new(bus.clone()),
        };
        let config = OperatorConfig {
            store,
            ..OperatorConfig::default()
        }
        .with_poll_interval(Duration::from_millis(10));
        let operator = Arc::new(Operator::new(wallets, deps, &config, &shutdown).unwrap());

        let (tx, messages) = mpsc::unbounded_channel();
        let collector = handler_fn(move |payload: Vec<u8>| {
            let tx = tx.clone();
            async move {
                if let Ok(message) = OperatorMessage::from_json(&payload) {
                    let _ = tx.send(message);
                }
                Ok(())
            }
        });
        bus.subscribe(OPERATOR_TOPIC, collector).unwrap();

        Self {
            bus,
            chain,
            orders,
            trades,
            operator,
            maker: OrderFactory::new(Wallet::dev(3).unwrap(), EXCHANGE),
            taker: OrderFactory::new(Wallet::dev(4).unwrap(), EXCHANGE),
            shutdown,
            messages,
        }
    }

    /// A fresh valid matched pair.
    pub fn trade(&self) -> (Order, Trade) {
        self.taker
            .matched_trade(&self.maker, U256::from(1u64), U256::from(100u64))
            .unwrap()
    }

    /// A matched pair whose trade carries a signature from the wrong key.
    pub fn wrong_signed_trade(&self) -> (Order, Trade) {
        let (order, mut trade) = self.trade();
        trade.sign(Wallet::dev(5).unwrap().signer()).unwrap();
        (order, trade)
    }

    /// Publish on the trade topic as the matching engine would.
    pub async fn publish_trade(&self, order: &Order, trade: &Trade) {
        let payload = PendingTradeEntry::new(order.clone(), trade.clone())
            .to_json()
            .unwrap();
        self.bus.publish(TRADES_TOPIC, payload).await.unwrap();
    }

    /// Wait for exactly `n` status messages.
    pub async fn collect(&mut self, n: usize) -> Vec<OperatorMessage> {
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            let message = timeout(Duration::from_secs(5), self.messages.recv())
                .await
                .expect("timed out waiting for operator messages")
                .expect("operator topic closed");
            out.push(message);
        }
        out
    }

    /// Messages that arrive within `window`.
    pub async fn drain_for(&mut self, window: Duration) -> Vec<OperatorMessage> {
        let mut out = Vec::new();
        while let Ok(Some(message)) = timeout(window, self.messages.recv()).await {
            out.push(message);
        }
        out
    }

    pub async fn stop(&self) {
        self.operator.shutdown().await;
        self.shutdown.cancel();
    }
}
