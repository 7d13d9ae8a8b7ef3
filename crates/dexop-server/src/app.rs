//! Application wiring and main loop.

use std::sync::Arc;
use std::time::Duration;

use dexop_bus::{InMemoryBus, MessageBus, OPERATOR_TOPIC};
use dexop_chain::{SimulatedChain, StaticWalletService, Wallet, WalletService};
use dexop_operator::{
    status_handler, InMemoryOrderService, InMemoryTradeService, Operator, QueueDeps,
    StatusPublisher,
};
use dexop_telemetry::Metrics;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::AppResult;

/// Main application.
pub struct Application {
    config: AppConfig,
    bus: Arc<InMemoryBus>,
    chain: Arc<SimulatedChain>,
    orders: Arc<InMemoryOrderService>,
    trades: Arc<InMemoryTradeService>,
    operator: Arc<Operator>,
    shutdown: CancellationToken,
}

impl Application {
    /// Build every component. Fails if no signer wallet can be loaded.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        let shutdown = CancellationToken::new();

        let wallets = Self::load_wallets(&config)?;

        let bus = Arc::new(InMemoryBus::new(config.bus.capacity, shutdown.clone()));
        let chain = Arc::new(SimulatedChain::new(
            config.chain.exchange,
            config.chain.auto_mine,
        ));
        for wallet in wallets.operator_wallets()? {
            chain.register_operator(wallet.address());
        }

        let orders = Arc::new(InMemoryOrderService::new());
        let trades = Arc::new(InMemoryTradeService::new());
        let deps = QueueDeps {
            exchange: chain.clone(),
            provider: chain.clone(),
            order_service: orders.clone(),
            trade_service: trades.clone(),
            status: StatusPublisher::new(bus.clone()),
        };
        let operator = Arc::new(Operator::from_wallet_service(
            &wallets,
            deps,
            &config.operator,
            &shutdown,
        )?);

        Ok(Self {
            config,
            bus,
            chain,
            orders,
            trades,
            operator,
            shutdown,
        })
    }

    fn load_wallets(config: &AppConfig) -> AppResult<StaticWalletService> {
        let mut wallets: Vec<Wallet> = config
            .wallets
            .iter()
            .map(|source| Wallet::load(source, None))
            .collect::<Result<_, _>>()?;
        for index in 0..config.chain.dev_wallets {
            wallets.push(Wallet::dev(index)?);
        }
        Ok(StaticWalletService::new(wallets))
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<InMemoryBus> {
        &self.bus
    }

    #[must_use]
    pub fn operator(&self) -> &Arc<Operator> {
        &self.operator
    }

    #[must_use]
    pub fn trade_service(&self) -> &Arc<InMemoryTradeService> {
        &self.trades
    }

    #[must_use]
    pub fn order_service(&self) -> &Arc<InMemoryOrderService> {
        &self.orders
    }

    /// Cancelling this token stops the application as ctrl-c does.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run until ctrl-c or the shutdown token is cancelled.
    pub async fn run(self) -> AppResult<()> {
        let status_sub = self.bus.subscribe(
            OPERATOR_TOPIC,
            status_handler(Arc::clone(&self.orders), Arc::clone(&self.trades)),
        )?;
        let trade_sub = self.operator.subscribe(self.bus.as_ref())?;

        let resumed = self.operator.start();
        info!(
            queues = self.operator.queues().len(),
            resumed,
            exchange = %self.config.chain.exchange,
            "Operator running"
        );

        let block_producer = (!self.config.chain.auto_mine).then(|| self.spawn_block_producer());
        let status_logger = (self.config.status_interval_secs > 0).then(|| self.spawn_status_logger());

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Shutdown signal received");
            }
            _ = self.shutdown.cancelled() => {
                info!("Shutdown requested");
            }
        }

        self.operator.shutdown().await;
        self.shutdown.cancel();
        trade_sub.join().await;
        status_sub.join().await;
        if let Some(handle) = block_producer {
            join_background("block_producer", handle).await;
        }
        if let Some(handle) = status_logger {
            join_background("status_logger", handle).await;
        }

        info!(
            queue_lengths = ?self.operator.queue_lengths(),
            "Shutdown complete"
        );
        Ok(())
    }

    fn spawn_block_producer(&self) -> tokio::task::JoinHandle<()> {
        let chain = Arc::clone(&self.chain);
        let shutdown = self.shutdown.clone();
        let block_time = Duration::from_millis(self.config.chain.block_time_ms);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(block_time);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let mined = chain.commit();
                        if mined > 0 {
                            debug!(mined, block_number = chain.block_number(), "Block produced");
                        }
                    }
                }
            }
        })
    }

    fn spawn_status_logger(&self) -> tokio::task::JoinHandle<()> {
        let operator = Arc::clone(&self.operator);
        let shutdown = self.shutdown.clone();
        let interval = Duration::from_secs(self.config.status_interval_secs);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let lengths = operator.queue_lengths();
                        for (queue, length) in operator.queues().iter().zip(&lengths) {
                            Metrics::queue_length(queue.name(), *length);
                        }
                        info!(
                            queue_lengths = ?lengths,
                            halted = operator.is_halted(),
                            "Operator status"
                        );
                    }
                }
            }
        })
    }
}

/// Await a background task, logging an abnormal exit. Returns whether it ended cleanly.
async fn join_background(task: &str, handle: tokio::task::JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            warn!(task, error = %e, "Background task ended abnormally");
            false
        }
    }
}
