//! Per-wallet transaction queue.
//!
//! A queue owns one signer wallet and one pending-trade store. A single
//! worker task drains the store strictly in FIFO order and never starts the
//! next trade before the previous one is mined, so the wallet's nonces are
//! consumed sequentially.
//!
//! Every execution-time outcome is reported on the operator topic; nothing
//! is retried. A trade whose submission fails is dropped after logging.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::B256;
use chrono::Utc;
use dexop_chain::{
    describe_error_id, DynEthereumProvider, DynExchangeClient, NonceTracker, Receipt, SignOpts,
    Transaction, Wallet,
};
use dexop_core::{Order, PendingTradeEntry, StopOrder, StopOrderStatus, Trade, TradeStatus};
use dexop_telemetry::Metrics;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{OperatorError, OperatorResult, StoreError, StoreResult};
use crate::halt::HaltLatch;
use crate::services::{DynOrderService, DynTradeService};
use crate::status::StatusPublisher;
use crate::store::DynTradeStore;

/// Queue names are this prefix followed by the wallet address.
pub const QUEUE_NAME_PREFIX: &str = "TX_QUEUES:";

/// Collaborators shared by every queue of an operator.
#[derive(Clone)]
pub struct QueueDeps {
    pub exchange: DynExchangeClient,
    pub provider: DynEthereumProvider,
    pub order_service: DynOrderService,
    pub trade_service: DynTradeService,
    pub status: StatusPublisher,
}

/// Per-queue timing.
#[derive(Debug, Clone, Copy)]
pub struct QueueTiming {
    pub poll_interval: Duration,
    pub mining_timeout: Option<Duration>,
}

pub struct TxQueue {
    name: String,
    wallet: Wallet,
    store: DynTradeStore,
    deps: QueueDeps,
    timing: QueueTiming,
    nonces: NonceTracker,
    halt: Arc<HaltLatch>,
    shutdown: CancellationToken,
    /// Signalled on enqueue so an idle worker picks the entry up.
    wake: Notify,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TxQueue {
    pub fn new(
        wallet: Wallet,
        store: DynTradeStore,
        deps: QueueDeps,
        timing: QueueTiming,
        halt: Arc<HaltLatch>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            name: Self::queue_name(&wallet),
            wallet,
            store,
            deps,
            timing,
            nonces: NonceTracker::new(),
            halt,
            shutdown,
            wake: Notify::new(),
            worker: Mutex::new(None),
        }
    }

    /// Queue name for `wallet`; also the store key.
    #[must_use]
    pub fn queue_name(wallet: &Wallet) -> String {
        format!("{QUEUE_NAME_PREFIX}{}", wallet.address())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    // =========================================================================
    // Store access
    // =========================================================================

    /// Number of pending trades.
    pub fn try_length(&self) -> StoreResult<usize> {
        self.store.len()
    }

    /// Number of pending trades. A store failure reads as empty.
    #[must_use]
    pub fn length(&self) -> usize {
        match self.try_length() {
            Ok(len) => len,
            Err(e) => {
                warn!(queue = %self.name, error = %e, "Failed to read queue length");
                0
            }
        }
    }

    /// Append an (order, trade) pair at the tail.
    pub fn publish_pending_trade(&self, order: &Order, trade: &Trade) -> OperatorResult<()> {
        let entry = PendingTradeEntry::new(order.clone(), trade.clone());
        self.store.publish(&entry)?;
        Metrics::queue_length(&self.name, self.length());
        debug!(queue = %self.name, trade_hash = %trade.hash, "Trade enqueued");
        Ok(())
    }

    /// Remove and return the head pair.
    pub fn pop_pending_trade(&self) -> StoreResult<PendingTradeEntry> {
        let entry = self.store.pop()?;
        Metrics::queue_length(&self.name, self.length());
        Ok(entry)
    }

    /// Drop every pending trade. A trade already executing is unaffected.
    pub fn purge(&self) -> OperatorResult<()> {
        let dropped = self.length();
        self.store.purge()?;
        Metrics::queue_length(&self.name, 0);
        info!(queue = %self.name, dropped, "Queue purged");
        Ok(())
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Enqueue a trade and make sure the worker is running.
    pub fn queue_trade(self: &Arc<Self>, order: &Order, trade: &Trade) -> OperatorResult<()> {
        if self.shutdown.is_cancelled() {
            return Err(OperatorError::Shutdown);
        }
        self.publish_pending_trade(order, trade)?;
        Metrics::trade_queued(&self.name);
        self.ensure_worker();
        Ok(())
    }

    /// Spawn the worker unless one is alive, then wake it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn ensure_worker(self: &Arc<Self>) {
        {
            let mut worker = self.worker.lock();
            let running = worker.as_ref().is_some_and(|h| !h.is_finished());
            if !running && !self.shutdown.is_cancelled() {
                *worker = Some(tokio::spawn(Arc::clone(self).run()));
            }
        }
        self.wake.notify_one();
    }

    /// Whether a worker task is alive.
    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Detach the worker handle, for joining on shutdown.
    pub fn take_worker(&self) -> Option<JoinHandle<()>> {
        self.worker.lock().take()
    }

    async fn run(self: Arc<Self>) {
        info!(queue = %self.name, wallet = %self.wallet.address(), "Queue worker started");

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            if self.halt.is_halted() {
                let resumed = self.halt.resumed();
                if self.halt.is_halted() {
                    debug!(queue = %self.name, "Queue waiting for resume");
                    tokio::select! {
                        _ = self.shutdown.cancelled() => break,
                        _ = resumed => {}
                    }
                }
                continue;
            }

            match self.pop_pending_trade() {
                Ok(entry) => {
                    let trade_hash = entry.trade.hash;
                    if let Err(e) = self.execute_trade(entry.order, entry.trade).await {
                        if matches!(e, OperatorError::Shutdown) {
                            break;
                        }
                        warn!(queue = %self.name, %trade_hash, error = %e, "Trade execution failed");
                    }
                }
                Err(StoreError::EmptyQueue) => {
                    tokio::select! {
                        _ = self.shutdown.cancelled() => break,
                        _ = self.wake.notified() => {}
                    }
                }
                Err(e) => {
                    error!(queue = %self.name, error = %e, "Failed to pop pending trade");
                    tokio::select! {
                        _ = self.shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.timing.poll_interval) => {}
                    }
                }
            }
        }

        info!(queue = %self.name, "Queue worker stopped");
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Submit one trade, wait for it to be mined and report the outcome.
    ///
    /// Publishes SENT once the transaction is accepted, then exactly one of
    /// SUCCESS or ERROR. A submission failure publishes nothing.
    pub async fn execute_trade(&self, order: Order, mut trade: Trade) -> OperatorResult<Transaction> {
        info!(
            queue = %self.name,
            trade_hash = %trade.hash,
            order_hash = %order.hash,
            "Executing trade"
        );

        let tx = match self.submit(&order, &trade).await {
            Ok(tx) => tx,
            Err(e) => {
                self.nonces.reset();
                Metrics::submission_failed(&self.name);
                error!(queue = %self.name, trade_hash = %trade.hash, error = %e, "Trade submission failed");
                return Err(e);
            }
        };

        trade.tx_hash = Some(tx.hash);
        if let Err(e) = self
            .deps
            .trade_service
            .update_trade_tx_hash(&trade, tx.hash)
            .await
        {
            warn!(queue = %self.name, trade_hash = %trade.hash, error = %e, "Failed to record trade tx hash");
        }

        if let Err(e) = self.deps.status.trade_sent(&order, &trade).await {
            warn!(queue = %self.name, trade_hash = %trade.hash, error = %e, "Failed to publish TRADE_SENT");
        }
        Metrics::trade_sent(&self.name);

        let started = Instant::now();
        let receipt = self.wait_mined(tx.hash).await.map_err(|e| {
            error!(queue = %self.name, tx_hash = %tx.hash, error = %e, "Mining wait aborted");
            e
        })?;
        Metrics::mining_wait(&self.name, started.elapsed().as_secs_f64());

        match receipt.error_id() {
            Some(err_id) => {
                warn!(
                    queue = %self.name,
                    trade_hash = %trade.hash,
                    tx_hash = %tx.hash,
                    err_id,
                    reason = describe_error_id(err_id),
                    "Trade rejected on chain"
                );
                trade.status = TradeStatus::Error;
                Metrics::trade_error(&self.name, err_id);
                if let Err(e) = self.deps.status.trade_error(&order, &trade, err_id).await {
                    error!(queue = %self.name, trade_hash = %trade.hash, error = %e, "Failed to publish TRADE_ERROR");
                }
            }
            None => {
                info!(
                    queue = %self.name,
                    trade_hash = %trade.hash,
                    tx_hash = %tx.hash,
                    block_number = receipt.block_number,
                    "Trade settled"
                );
                trade.status = TradeStatus::Success;
                Metrics::trade_success(&self.name);
                if let Err(e) = self.deps.status.trade_success(&order, &trade).await {
                    error!(queue = %self.name, trade_hash = %trade.hash, error = %e, "Failed to publish TRADE_SUCCESS");
                }
                self.trigger_stop_orders(std::slice::from_ref(&trade)).await;
            }
        }

        Ok(tx)
    }

    async fn submit(&self, order: &Order, trade: &Trade) -> OperatorResult<Transaction> {
        let chain_pending = self
            .deps
            .provider
            .pending_nonce_at(self.wallet.address())
            .await
            .map_err(OperatorError::Submission)?;
        let nonce = self.nonces.reserve(chain_pending);
        let opts = SignOpts::new(&self.wallet, nonce);

        debug!(queue = %self.name, nonce, "Submitting trade");
        self.deps
            .exchange
            .trade(order, trade, &opts)
            .await
            .map_err(OperatorError::Submission)
    }

    async fn wait_mined(&self, tx_hash: B256) -> OperatorResult<Receipt> {
        let wait = self
            .deps
            .provider
            .wait_mined(tx_hash, self.timing.poll_interval);

        let bounded = async {
            match self.timing.mining_timeout {
                Some(timeout) => tokio::time::timeout(timeout, wait)
                    .await
                    .map_err(|_| OperatorError::MiningTimeout { tx_hash, timeout })?
                    .map_err(OperatorError::Chain),
                None => wait.await.map_err(OperatorError::Chain),
            }
        };

        tokio::select! {
            _ = self.shutdown.cancelled() => Err(OperatorError::Shutdown),
            receipt = bounded => receipt,
        }
    }

    // =========================================================================
    // Stop orders
    // =========================================================================

    /// Convert every stop order the given trades trigger into a live order.
    ///
    /// Each stop order is handled at most once per call. Failures are logged
    /// per stop order and do not stop the others.
    pub async fn trigger_stop_orders(&self, trades: &[Trade]) {
        let mut handled: HashSet<B256> = HashSet::new();

        for trade in trades {
            let triggered = match self
                .deps
                .order_service
                .get_triggered_stop_orders(trade.base_token, trade.quote_token, trade.pricepoint)
                .await
            {
                Ok(triggered) => triggered,
                Err(e) => {
                    Metrics::stop_order_failed();
                    error!(trade_hash = %trade.hash, error = %e, "Failed to look up triggered stop orders");
                    continue;
                }
            };

            for stop_order in triggered {
                if !handled.insert(stop_order.hash) {
                    continue;
                }
                let hash = stop_order.hash;
                match self.handle_stop_order(stop_order).await {
                    Ok(()) => {
                        Metrics::stop_order_triggered();
                        info!(stop_order_hash = %hash, trade_hash = %trade.hash, "Stop order triggered");
                    }
                    Err(e) => {
                        Metrics::stop_order_failed();
                        error!(stop_order_hash = %hash, error = %e, "Failed to handle stop order");
                    }
                }
            }
        }
    }

    /// Submit the order a stop order converts to, then mark it DONE.
    pub async fn handle_stop_order(&self, mut stop_order: StopOrder) -> OperatorResult<()> {
        let order = stop_order.to_order()?;
        self.deps.order_service.new_order(order).await?;

        stop_order.status = StopOrderStatus::Done;
        stop_order.updated_at = Utc::now();
        let hash = stop_order.hash;
        self.deps
            .order_service
            .update_stop_order(hash, stop_order)
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for TxQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxQueue")
            .field("name", &self.name)
            .field("wallet", &self.wallet.address())
            .field("length", &self.length())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceResult;
    use crate::services::{InMemoryOrderService, InMemoryTradeService, OrderService};
    use crate::store::MemoryTradeStore;
    use dexop_core::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use alloy::primitives::{Address, U256};
    use dexop_bus::{MockBus, OPERATOR_TOPIC};
    use dexop_chain::{OrderFactory, SimulatedChain, ERR_INVALID_SIGNATURE};
    use dexop_core::{OperatorMessage, OperatorMessageType, OrderSide, StopOrderType};

    const EXCHANGE: Address = Address::new([0xee; 20]);

    struct Fixture {
        queue: Arc<TxQueue>,
        chain: Arc<SimulatedChain>,
        bus: Arc<MockBus>,
        orders: Arc<InMemoryOrderService>,
        trades: Arc<InMemoryTradeService>,
        maker: OrderFactory,
        taker: OrderFactory,
        shutdown: CancellationToken,
    }

    fn fixture(auto_mine: bool, mining_timeout: Option<Duration>) -> Fixture {
        let chain = Arc::new(SimulatedChain::new(EXCHANGE, auto_mine));
        let wallet = Wallet::dev(0).unwrap();
        chain.register_operator(wallet.address());

        let bus = Arc::new(MockBus::new());
        let orders = Arc::new(InMemoryOrderService::new());
        let trades = Arc::new(InMemoryTradeService::new());
        let deps = QueueDeps {
            exchange: chain.clone(),
            provider: chain.clone(),
            order_service: orders.clone(),
            trade_service: trades.clone(),
            status: StatusPublisher::new(bus.clone()),
        };
        let shutdown = CancellationToken::new();
        let queue = Arc::new(TxQueue::new(
            wallet,
            Arc::new(MemoryTradeStore::new()),
            deps,
            QueueTiming {
                poll_interval: Duration::from_millis(10),
                mining_timeout,
            },
            Arc::new(HaltLatch::new()),
            shutdown.clone(),
        ));

        Fixture {
            queue,
            chain,
            bus,
            orders,
            trades,
            maker: OrderFactory::new(Wallet::dev(3).unwrap(), EXCHANGE),
            taker: OrderFactory::new(Wallet::dev(4).unwrap(), EXCHANGE),
            shutdown,
        }
    }

    fn messages(bus: &MockBus) -> Vec<OperatorMessage> {
        bus.published_on(OPERATOR_TOPIC)
            .iter()
            .map(|p| OperatorMessage::from_json(p).unwrap())
            .collect()
    }

    fn matched(f: &Fixture, price: u64) -> (Order, Trade) {
        f.taker
            .matched_trade(&f.maker, U256::from(1u64), U256::from(price))
            .unwrap()
    }

    #[test]
    fn test_store_operations_without_worker() {
        let f = fixture(true, None);
        let (order, trade) = matched(&f, 10);

        f.queue.publish_pending_trade(&order, &trade).unwrap();
        f.queue.publish_pending_trade(&order, &trade).unwrap();
        assert_eq!(f.queue.length(), 2);
        assert!(!f.queue.is_draining());

        let entry = f.queue.pop_pending_trade().unwrap();
        assert_eq!(entry.trade.hash, trade.hash);

        f.queue.purge().unwrap();
        assert_eq!(f.queue.length(), 0);
        assert!(matches!(
            f.queue.pop_pending_trade(),
            Err(StoreError::EmptyQueue)
        ));
    }

    #[test]
    fn test_queue_name_uses_wallet_address() {
        let wallet = Wallet::dev(0).unwrap();
        let name = TxQueue::queue_name(&wallet);
        assert!(name.starts_with(QUEUE_NAME_PREFIX));
        assert!(name.ends_with(&wallet.address().to_string()));
    }

    #[tokio::test]
    async fn test_execute_trade_success() {
        let f = fixture(true, None);
        let (order, trade) = matched(&f, 10);

        let tx = f.queue.execute_trade(order, trade.clone()).await.unwrap();

        let sent = messages(&f.bus);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].message_type, OperatorMessageType::TradeSent);
        assert_eq!(sent[0].trade.tx_hash, Some(tx.hash));
        assert_eq!(sent[1].message_type, OperatorMessageType::TradeSuccess);
        assert_eq!(sent[1].trade.hash, trade.hash);

        assert!(f.chain.is_settled(trade.hash));
        assert_eq!(f.trades.trade(&trade.hash).unwrap().tx_hash, Some(tx.hash));
    }

    #[tokio::test]
    async fn test_execute_trade_invalid_signature() {
        let f = fixture(true, None);
        let (order, mut trade) = matched(&f, 10);
        trade.sign(Wallet::dev(5).unwrap().signer()).unwrap();

        f.queue.execute_trade(order, trade).await.unwrap();

        let sent = messages(&f.bus);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].message_type, OperatorMessageType::TradeError);
        assert_eq!(sent[1].err_id, ERR_INVALID_SIGNATURE);
    }

    #[tokio::test]
    async fn test_submission_failure_publishes_nothing() {
        let f = fixture(true, None);
        let (order, trade) = matched(&f, 10);
        f.queue.nonces.reserve(0);
        f.chain.reject_next_submission("insufficient funds");

        let result = f.queue.execute_trade(order.clone(), trade.clone()).await;

        assert!(matches!(result, Err(OperatorError::Submission(_))));
        assert!(messages(&f.bus).is_empty());
        assert_eq!(f.queue.nonces.peek(), 0);

        // The unconsumed nonce is reused.
        let tx = f.queue.execute_trade(order, trade).await.unwrap();
        assert_eq!(tx.nonce, 0);
    }

    #[tokio::test]
    async fn test_sent_publish_failure_does_not_abort() {
        let f = fixture(true, None);
        let (order, trade) = matched(&f, 10);
        f.bus.set_fail_publish(true);

        f.queue.execute_trade(order, trade.clone()).await.unwrap();

        assert!(f.chain.is_settled(trade.hash));
    }

    #[tokio::test]
    async fn test_mining_timeout() {
        let f = fixture(false, Some(Duration::from_millis(50)));
        let (order, trade) = matched(&f, 10);

        let result = f.queue.execute_trade(order, trade).await;

        assert!(matches!(result, Err(OperatorError::MiningTimeout { .. })));
        let sent = messages(&f.bus);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message_type, OperatorMessageType::TradeSent);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_mining_wait() {
        let f = fixture(false, None);
        let (order, trade) = matched(&f, 10);

        let queue = Arc::clone(&f.queue);
        let handle = tokio::spawn(async move { queue.execute_trade(order, trade).await });
        tokio::time::sleep(Duration::from_millis(30)).await;
        f.shutdown.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(OperatorError::Shutdown)));
    }

    #[tokio::test]
    async fn test_success_triggers_stop_orders_once() {
        let f = fixture(true, None);
        let user = OrderFactory::new(Wallet::dev(6).unwrap(), EXCHANGE);
        let stop = user
            .new_stop_order(
                OrderSide::Buy,
                StopOrderType::StopLimit,
                U256::from(2u64),
                U256::from(10u64),
                U256::from(11u64),
            )
            .unwrap();
        f.orders.add_stop_order(stop.clone());

        let (order, trade) = matched(&f, 10);
        f.queue.execute_trade(order, trade.clone()).await.unwrap();

        let converted = f.orders.order(&stop.hash).unwrap();
        assert_eq!(converted.pricepoint, U256::from(11u64));
        assert_eq!(
            f.orders.stop_order(&stop.hash).unwrap().status,
            StopOrderStatus::Done
        );

        // Same price again: the stop order is DONE and not re-triggered.
        f.queue.trigger_stop_orders(&[trade.clone(), trade]).await;
        assert_eq!(f.orders.order_count(), 1);
    }

    #[tokio::test]
    async fn test_stop_order_failure_is_isolated() {
        let f = fixture(true, None);
        let user = OrderFactory::new(Wallet::dev(6).unwrap(), EXCHANGE);
        let failing = user
            .new_stop_order(
                OrderSide::Buy,
                StopOrderType::StopMarket,
                U256::from(1u64),
                U256::from(5u64),
                U256::ZERO,
            )
            .unwrap();
        let ok = user
            .new_stop_order(
                OrderSide::Buy,
                StopOrderType::StopMarket,
                U256::from(1u64),
                U256::from(6u64),
                U256::ZERO,
            )
            .unwrap();
        f.orders.add_stop_order(failing.clone());
        f.orders.add_stop_order(ok.clone());
        f.orders.reject_new_order(failing.hash);

        let (_, trade) = matched(&f, 10);
        f.queue.trigger_stop_orders(&[trade]).await;

        assert_eq!(
            f.orders.stop_order(&failing.hash).unwrap().status,
            StopOrderStatus::Pending
        );
        assert_eq!(
            f.orders.stop_order(&ok.hash).unwrap().status,
            StopOrderStatus::Done
        );
    }

    #[tokio::test]
    async fn test_worker_drains_in_order() {
        let f = fixture(true, None);
        let first = matched(&f, 10);
        let second = matched(&f, 11);

        f.queue.queue_trade(&first.0, &first.1).unwrap();
        f.queue.queue_trade(&second.0, &second.1).unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            while messages(&f.bus).len() < 4 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        let sent = messages(&f.bus);
        let order: Vec<_> = sent.iter().map(|m| (m.message_type, m.trade.hash)).collect();
        assert_eq!(
            order,
            vec![
                (OperatorMessageType::TradeSent, first.1.hash),
                (OperatorMessageType::TradeSuccess, first.1.hash),
                (OperatorMessageType::TradeSent, second.1.hash),
                (OperatorMessageType::TradeSuccess, second.1.hash),
            ]
        );
        assert_eq!(f.queue.length(), 0);

        f.shutdown.cancel();
        if let Some(handle) = f.queue.take_worker() {
            tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .unwrap()
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_queue_trade_after_shutdown() {
        let f = fixture(true, None);
        let (order, trade) = matched(&f, 10);
        f.shutdown.cancel();

        assert!(matches!(
            f.queue.queue_trade(&order, &trade),
            Err(OperatorError::Shutdown)
        ));
        assert_eq!(f.queue.length(), 0);
    }

    /// Order service that always reports the same PENDING stop order and
    /// counts conversions.
    struct RecordingOrders {
        stop: StopOrder,
        new_orders: AtomicUsize,
        stop_updates: AtomicUsize,
    }

    impl OrderService for RecordingOrders {
        fn get_by_hash(&self, _hash: B256) -> BoxFuture<'_, ServiceResult<Option<Order>>> {
            Box::pin(async { Ok(None) })
        }

        fn new_order(&self, _order: Order) -> BoxFuture<'_, ServiceResult<()>> {
            self.new_orders.fetch_add(1, AtomicOrdering::SeqCst);
            Box::pin(async { Ok(()) })
        }

        fn update_stop_order(
            &self,
            _hash: B256,
            _stop_order: StopOrder,
        ) -> BoxFuture<'_, ServiceResult<()>> {
            self.stop_updates.fetch_add(1, AtomicOrdering::SeqCst);
            Box::pin(async { Ok(()) })
        }

        fn get_triggered_stop_orders(
            &self,
            _base_token: Address,
            _quote_token: Address,
            _price: U256,
        ) -> BoxFuture<'_, ServiceResult<Vec<StopOrder>>> {
            let stop = self.stop.clone();
            Box::pin(async move { Ok(vec![stop]) })
        }
    }

    #[tokio::test]
    async fn test_stop_order_handled_once_per_batch() {
        let f = fixture(true, None);
        let user = OrderFactory::new(Wallet::dev(6).unwrap(), EXCHANGE);
        let stop = user
            .new_stop_order(
                OrderSide::Buy,
                StopOrderType::StopLimit,
                U256::from(2u64),
                U256::from(10u64),
                U256::from(11u64),
            )
            .unwrap();
        let orders = Arc::new(RecordingOrders {
            stop,
            new_orders: AtomicUsize::new(0),
            stop_updates: AtomicUsize::new(0),
        });

        let mut deps = f.queue.deps.clone();
        deps.order_service = orders.clone();
        let queue = TxQueue::new(
            Wallet::dev(1).unwrap(),
            Arc::new(MemoryTradeStore::new()),
            deps,
            f.queue.timing,
            Arc::new(HaltLatch::new()),
            f.shutdown.clone(),
        );

        let (_, first) = matched(&f, 10);
        let (_, second) = matched(&f, 12);
        queue.trigger_stop_orders(&[first, second]).await;

        assert_eq!(orders.new_orders.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(orders.stop_updates.load(AtomicOrdering::SeqCst), 1);
    }
}
