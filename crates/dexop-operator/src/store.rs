//! Durable FIFO of pending trades, one per transaction queue.

use std::collections::VecDeque;
use std::sync::Arc;

use dexop_core::PendingTradeEntry;
use parking_lot::Mutex;

use crate::error::{StoreError, StoreResult};

/// FIFO store behind one transaction queue.
///
/// Entries come back from [`pop`](PendingTradeStore::pop) in the order they
/// were [`publish`](PendingTradeStore::publish)ed. Calls are short and
/// synchronous; implementations serialize them internally.
pub trait PendingTradeStore: Send + Sync {
    /// Append an entry at the tail.
    fn publish(&self, entry: &PendingTradeEntry) -> StoreResult<()>;

    /// Remove and return the head entry, or [`StoreError::EmptyQueue`].
    fn pop(&self) -> StoreResult<PendingTradeEntry>;

    /// Number of pending entries.
    fn len(&self) -> StoreResult<usize>;

    /// Drop every pending entry.
    fn purge(&self) -> StoreResult<()>;

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// Arc wrapper for PendingTradeStore trait objects.
pub type DynTradeStore = Arc<dyn PendingTradeStore>;

/// Volatile store; backlog is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryTradeStore {
    entries: Mutex<VecDeque<PendingTradeEntry>>,
}

impl MemoryTradeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PendingTradeStore for MemoryTradeStore {
    fn publish(&self, entry: &PendingTradeEntry) -> StoreResult<()> {
        self.entries.lock().push_back(entry.clone());
        Ok(())
    }

    fn pop(&self) -> StoreResult<PendingTradeEntry> {
        self.entries.lock().pop_front().ok_or(StoreError::EmptyQueue)
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.entries.lock().len())
    }

    fn purge(&self) -> StoreResult<()> {
        self.entries.lock().clear();
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::entries;
    use super::*;

    #[test]
    fn test_fifo_order() {
        let store = MemoryTradeStore::new();
        let batch = entries(3);
        for entry in &batch {
            store.publish(entry).unwrap();
        }

        assert_eq!(store.len().unwrap(), 3);
        for expected in &batch {
            assert_eq!(store.pop().unwrap().trade.hash, expected.trade.hash);
        }
        assert!(matches!(store.pop(), Err(StoreError::EmptyQueue)));
    }

    #[test]
    fn test_purge() {
        let store = MemoryTradeStore::new();
        for entry in &entries(2) {
            store.publish(entry).unwrap();
        }
        tokio_test::assert_ok!(store.purge());
        assert!(store.is_empty().unwrap());
    }
}
