//! Trade dispatcher over the pool of transaction queues.
//!
//! # Architecture
//! ```text
//! "trade" topic ──▶ Operator::handle_trades ──▶ shortest TxQueue ──▶ worker
//!                                                    │
//!                                  exchange + provider ◀┘──▶ "operator" topic
//! ```
//!
//! The pool is fixed at construction: one queue per signer wallet.

use std::collections::HashSet;
use std::sync::Arc;

use dexop_bus::{handler_fn, BusError, MessageBus, Subscription, TRADES_TOPIC};
use dexop_chain::{Wallet, WalletService};
use dexop_core::{Order, PendingTradeEntry, Trade};
use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{OperatorConfig, TieBreak};
use crate::error::{OperatorError, OperatorResult};
use crate::halt::HaltLatch;
use crate::txqueue::{QueueDeps, QueueTiming, TxQueue};

pub struct Operator {
    queues: Vec<Arc<TxQueue>>,
    tie_break: TieBreak,
    halt: Arc<HaltLatch>,
    shutdown: CancellationToken,
}

impl Operator {
    /// Build one queue per wallet.
    ///
    /// Queue workers stop when `shutdown` (or [`Operator::shutdown`]) is
    /// cancelled.
    ///
    /// # Errors
    /// - `NoWallets` if `wallets` is empty
    /// - `DuplicateWallet` if an address appears twice
    /// - `InvalidConfig` if the poll interval is zero
    /// - `Store` if a queue's store cannot be opened
    pub fn new(
        wallets: Vec<Wallet>,
        deps: QueueDeps,
        config: &OperatorConfig,
        shutdown: &CancellationToken,
    ) -> OperatorResult<Self> {
        if wallets.is_empty() {
            return Err(OperatorError::NoWallets);
        }
        if config.poll_interval().is_zero() {
            return Err(OperatorError::InvalidConfig(
                "poll interval must be at least 1ms".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = wallets.iter().find(|w| !seen.insert(w.address())) {
            return Err(OperatorError::DuplicateWallet(dup.address()));
        }

        let shutdown = shutdown.child_token();
        let halt = Arc::new(HaltLatch::new());
        let timing = QueueTiming {
            poll_interval: config.poll_interval(),
            mining_timeout: config.mining_timeout(),
        };

        let queues = wallets
            .into_iter()
            .map(|wallet| {
                let store = config.store.open(&TxQueue::queue_name(&wallet))?;
                Ok(Arc::new(TxQueue::new(
                    wallet,
                    store,
                    deps.clone(),
                    timing,
                    Arc::clone(&halt),
                    shutdown.clone(),
                )))
            })
            .collect::<OperatorResult<Vec<_>>>()?;

        info!(
            queues = queues.len(),
            tie_break = ?config.tie_break,
            mining_timeout = ?timing.mining_timeout,
            "Operator initialized"
        );

        Ok(Self {
            queues,
            tie_break: config.tie_break,
            halt,
            shutdown,
        })
    }

    /// Build from the wallet service's signer pool.
    pub fn from_wallet_service(
        wallets: &dyn WalletService,
        deps: QueueDeps,
        config: &OperatorConfig,
        shutdown: &CancellationToken,
    ) -> OperatorResult<Self> {
        let pool = wallets.operator_wallets()?;
        Self::new(pool, deps, config, shutdown)
    }

    /// Start workers for queues that already hold entries.
    ///
    /// Returns the number of queues started.
    pub fn start(&self) -> usize {
        let mut started = 0;
        for queue in &self.queues {
            let backlog = queue.length();
            if backlog > 0 {
                info!(queue = %queue.name(), backlog, "Resuming queue backlog");
                queue.ensure_worker();
                started += 1;
            }
        }
        started
    }

    #[must_use]
    pub fn queues(&self) -> &[Arc<TxQueue>] {
        &self.queues
    }

    #[must_use]
    pub fn queue_lengths(&self) -> Vec<usize> {
        self.queues.iter().map(|q| q.length()).collect()
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Queue with the fewest pending trades, and its length.
    ///
    /// A queue whose store cannot report a length ranks last.
    pub fn get_shortest_queue(&self) -> OperatorResult<(Arc<TxQueue>, usize)> {
        let mut best: Option<(&Arc<TxQueue>, usize)> = None;

        for queue in &self.queues {
            let length = match queue.try_length() {
                Ok(length) => length,
                Err(e) => {
                    warn!(queue = %queue.name(), error = %e, "Queue length unavailable");
                    usize::MAX
                }
            };
            let better = match (best, self.tie_break) {
                (None, _) => true,
                (Some((_, min)), TieBreak::LowestIndex) => length < min,
                (Some((_, min)), TieBreak::HighestIndex) => length <= min,
            };
            if better {
                best = Some((queue, length));
            }
        }

        best.map(|(q, len)| (Arc::clone(q), len))
            .ok_or(OperatorError::NoQueues)
    }

    /// Enqueue on the shortest queue.
    pub fn queue_trade(&self, order: &Order, trade: &Trade) -> OperatorResult<()> {
        let (queue, length) = self.get_shortest_queue()?;
        debug!(
            queue = %queue.name(),
            length,
            trade_hash = %trade.hash,
            "Dispatching trade"
        );
        queue.queue_trade(order, trade)
    }

    /// Decode a `{order, trade}` payload from the trade topic and enqueue it.
    pub fn handle_trades(&self, payload: &[u8]) -> OperatorResult<()> {
        let entry = PendingTradeEntry::from_json(payload)?;
        self.queue_trade(&entry.order, &entry.trade)
    }

    /// Register [`Operator::handle_trades`] on the trade topic.
    pub fn subscribe(self: &Arc<Self>, bus: &dyn MessageBus) -> OperatorResult<Subscription> {
        let operator = Arc::clone(self);
        let handler = handler_fn(move |payload: Vec<u8>| {
            let operator = Arc::clone(&operator);
            async move {
                operator.handle_trades(&payload).map_err(|e| {
                    warn!(error = %e, "Failed to queue incoming trade");
                    BusError::Handler(e.to_string())
                })
            }
        });

        let subscription = bus.subscribe(TRADES_TOPIC, handler)?;
        info!(topic = TRADES_TOPIC, "Operator subscribed");
        Ok(subscription)
    }

    /// Discard every pending trade. In-flight transactions are not cancelled.
    pub fn purge_queues(&self) -> OperatorResult<()> {
        for queue in &self.queues {
            queue.purge()?;
        }
        Ok(())
    }

    // =========================================================================
    // Control
    // =========================================================================

    pub fn halt(&self, reason: &str) {
        self.halt.halt(reason);
    }

    pub fn resume(&self) {
        self.halt.resume();
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halt.is_halted()
    }

    /// Stop every worker and wait for them to exit.
    ///
    /// A worker waiting on a mining receipt stops without reporting.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let workers: Vec<_> = self.queues.iter().filter_map(|q| q.take_worker()).collect();
        let count = workers.len();
        for result in join_all(workers).await {
            if let Err(e) = result {
                warn!(error = %e, "Queue worker ended abnormally");
            }
        }
        info!(workers = count, "Operator stopped");
    }
}

impl std::fmt::Debug for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operator")
            .field("queues", &self.queues)
            .field("tie_break", &self.tie_break)
            .field("halted", &self.is_halted())
            .finish()
    }
}
