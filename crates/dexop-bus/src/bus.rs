//! Message bus traits.
//!
//! Provides a trait-based abstraction over the broker so that:
//! - The operator can be wired against an in-memory bus or a real broker
//! - Tests can record publishes and inject transport failures

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dexop_core::BoxFuture;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::error::{BusError, BusResult};

/// Matched (order, trade) pairs from the matching engine.
pub const TRADES_TOPIC: &str = "trade";

/// Settlement status envelopes from the operator.
pub const OPERATOR_TOPIC: &str = "operator";

/// Callback invoked for every message delivered on a topic.
pub trait MessageHandler: Send + Sync {
    fn handle(&self, payload: Vec<u8>) -> BoxFuture<'_, BusResult<()>>;
}

/// Arc wrapper for MessageHandler trait objects.
pub type DynMessageHandler = Arc<dyn MessageHandler>;

/// Publish/subscribe transport.
pub trait MessageBus: Send + Sync {
    /// Publish `payload` on `topic`.
    ///
    /// Resolves once the bus has accepted the message. Fails with
    /// `BusError::Unavailable` or `BusError::Closed` if it cannot.
    fn publish<'a>(&'a self, topic: &'a str, payload: Vec<u8>) -> BoxFuture<'a, BusResult<()>>;

    /// Register `handler` for every message on `topic`.
    fn subscribe(&self, topic: &str, handler: DynMessageHandler) -> BusResult<Subscription>;
}

/// Arc wrapper for MessageBus trait objects.
pub type DynMessageBus = Arc<dyn MessageBus>;

/// Handle to a registered subscription.
///
/// Dropping the handle leaves the subscription running; call
/// [`Subscription::abort`] to stop it early.
#[derive(Debug)]
pub struct Subscription {
    topic: String,
    worker: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(topic: impl Into<String>, worker: Option<JoinHandle<()>>) -> Self {
        Self {
            topic: topic.into(),
            worker,
        }
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Whether the delivery worker has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop delivering messages to this subscription.
    pub fn abort(&self) {
        if let Some(worker) = &self.worker {
            worker.abort();
        }
    }

    /// Wait for the delivery worker to exit.
    pub async fn join(self) {
        if let Some(worker) = self.worker {
            let _ = worker.await;
        }
    }
}

// =============================================================================
// Closure handlers
// =============================================================================

/// Adapter turning an async closure into a [`MessageHandler`].
pub struct FnHandler<F> {
    f: F,
}

impl<F, Fut> MessageHandler for FnHandler<F>
where
    F: Fn(Vec<u8>) -> Fut + Send + Sync,
    Fut: Future<Output = BusResult<()>> + Send + 'static,
{
    fn handle(&self, payload: Vec<u8>) -> BoxFuture<'_, BusResult<()>> {
        Box::pin((self.f)(payload))
    }
}

/// Wrap an async closure as a shareable handler.
pub fn handler_fn<F, Fut>(f: F) -> DynMessageHandler
where
    F: Fn(Vec<u8>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = BusResult<()>> + Send + 'static,
{
    Arc::new(FnHandler { f })
}

// =============================================================================
// Mock bus
// =============================================================================

/// Mock bus for testing.
///
/// Records every publish, can be switched to fail publishes, and delivers
/// messages to subscribed handlers inline.
#[derive(Default)]
pub struct MockBus {
    published: Mutex<Vec<(String, Vec<u8>)>>,
    handlers: Mutex<Vec<(String, DynMessageHandler)>>,
    fail_publish: AtomicBool,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent publishes fail with `BusError::Unavailable`.
    pub fn set_fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Get recorded publishes.
    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().clone()
    }

    /// Recorded payloads for one topic.
    pub fn published_on(&self, topic: &str) -> Vec<Vec<u8>> {
        self.published
            .lock()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.published.lock().clear();
    }

    /// Deliver `payload` to every handler subscribed to `topic`.
    pub async fn deliver(&self, topic: &str, payload: Vec<u8>) -> BusResult<()> {
        let handlers: Vec<DynMessageHandler> = self
            .handlers
            .lock()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, h)| Arc::clone(h))
            .collect();

        for handler in handlers {
            handler.handle(payload.clone()).await?;
        }
        Ok(())
    }
}

impl MessageBus for MockBus {
    fn publish<'a>(&'a self, topic: &'a str, payload: Vec<u8>) -> BoxFuture<'a, BusResult<()>> {
        Box::pin(async move {
            if self.fail_publish.load(Ordering::SeqCst) {
                return Err(BusError::Unavailable("mock publish failure".to_string()));
            }
            self.published.lock().push((topic.to_string(), payload));
            Ok(())
        })
    }

    fn subscribe(&self, topic: &str, handler: DynMessageHandler) -> BusResult<Subscription> {
        self.handlers.lock().push((topic.to_string(), handler));
        Ok(Subscription::new(topic, None))
    }
}
