//! In-process message bus.
//!
//! Each topic is a bounded mpsc channel. Publishing waits for channel
//! capacity, so a slow subscriber applies backpressure to producers instead
//! of accumulating unbounded tasks. Messages published before a subscriber
//! registers are buffered up to the channel capacity.
//!
//! A topic has at most one subscriber, which drains it on its own worker
//! task in publish order.

use std::collections::HashMap;

use dexop_core::BoxFuture;
use dexop_telemetry::Metrics;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::bus::{DynMessageHandler, MessageBus, Subscription};
use crate::error::{BusError, BusResult};

/// Default per-topic channel capacity.
pub const DEFAULT_TOPIC_CAPACITY: usize = 1024;

struct TopicChannel {
    sender: mpsc::Sender<Vec<u8>>,
    /// Taken by the first subscriber.
    receiver: Option<mpsc::Receiver<Vec<u8>>>,
}

/// Bounded in-memory bus.
pub struct InMemoryBus {
    capacity: usize,
    topics: Mutex<HashMap<String, TopicChannel>>,
    shutdown: CancellationToken,
}

impl InMemoryBus {
    /// Create a bus whose workers stop when `shutdown` is cancelled.
    pub fn new(capacity: usize, shutdown: CancellationToken) -> Self {
        Self {
            capacity: capacity.max(1),
            topics: Mutex::new(HashMap::new()),
            shutdown,
        }
    }

    fn sender(&self, topic: &str) -> mpsc::Sender<Vec<u8>> {
        let mut topics = self.topics.lock();
        topics
            .entry(topic.to_string())
            .or_insert_with(|| Self::channel(self.capacity))
            .sender
            .clone()
    }

    fn take_receiver(&self, topic: &str) -> BusResult<mpsc::Receiver<Vec<u8>>> {
        let mut topics = self.topics.lock();
        topics
            .entry(topic.to_string())
            .or_insert_with(|| Self::channel(self.capacity))
            .receiver
            .take()
            .ok_or_else(|| BusError::AlreadySubscribed(topic.to_string()))
    }

    fn channel(capacity: usize) -> TopicChannel {
        let (sender, receiver) = mpsc::channel(capacity);
        TopicChannel {
            sender,
            receiver: Some(receiver),
        }
    }

    /// Stop all subscription workers and reject further publishes.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Messages buffered on `topic` and not yet taken by its worker.
    #[must_use]
    pub fn pending(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .get(topic)
            .map_or(0, |t| self.capacity - t.sender.capacity())
    }
}

impl MessageBus for InMemoryBus {
    fn publish<'a>(&'a self, topic: &'a str, payload: Vec<u8>) -> BoxFuture<'a, BusResult<()>> {
        Box::pin(async move {
            if self.shutdown.is_cancelled() {
                return Err(BusError::Closed(topic.to_string()));
            }

            let sender = self.sender(topic);
            tokio::select! {
                _ = self.shutdown.cancelled() => Err(BusError::Closed(topic.to_string())),
                sent = sender.send(payload) => {
                    sent.map_err(|_| BusError::Closed(topic.to_string()))?;
                    Metrics::bus_published(topic);
                    Ok(())
                }
            }
        })
    }

    fn subscribe(&self, topic: &str, handler: DynMessageHandler) -> BusResult<Subscription> {
        let mut receiver = self.take_receiver(topic)?;
        let shutdown = self.shutdown.clone();
        let worker_topic = topic.to_string();

        let worker = tokio::spawn(async move {
            debug!(topic = %worker_topic, "Bus worker started");
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    message = receiver.recv() => {
                        let Some(payload) = message else { break };
                        if let Err(e) = handler.handle(payload).await {
                            Metrics::bus_handler_error(&worker_topic);
                            warn!(topic = %worker_topic, error = %e, "Message handler failed");
                        }
                    }
                }
            }
            debug!(topic = %worker_topic, "Bus worker stopped");
        });

        Ok(Subscription::new(topic, Some(worker)))
    }
}

impl std::fmt::Debug for InMemoryBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBus")
            .field("capacity", &self.capacity)
            .field("topics", &self.topics.lock().keys().cloned().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_CAPACITY, CancellationToken::new())
    }
}
