//! Per-wallet transaction nonce reservation.
//!
//! A queue submits at most one transaction at a time, but the node's pending
//! nonce can lag behind a transaction it has just accepted. The tracker keeps
//! the next locally known nonce and never hands out a value below the chain's
//! pending nonce.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic nonce source for one signer wallet.
///
/// # Guarantees
/// - Reserved nonces increase strictly until [`NonceTracker::reset`]
/// - Never below the chain's pending nonce passed to [`NonceTracker::reserve`]
/// - Thread-safe for concurrent access
#[derive(Debug, Default)]
pub struct NonceTracker {
    /// Next nonce to hand out if the chain is not ahead.
    next: AtomicU64,
}

impl NonceTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a nonce given the chain's pending nonce for the wallet.
    ///
    /// Returns `max(local_next, chain_pending)` and advances the local
    /// counter past it. Thread-safe via CAS loop.
    pub fn reserve(&self, chain_pending: u64) -> u64 {
        loop {
            let current = self.next.load(Ordering::Acquire);
            let nonce = current.max(chain_pending);

            match self.next.compare_exchange_weak(
                current,
                nonce.saturating_add(1),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return nonce,
                Err(_) => continue,
            }
        }
    }

    /// Forget local state so the next reservation follows the chain.
    ///
    /// Called after a failed submission, whose nonce was never consumed.
    pub fn reset(&self) {
        self.next.store(0, Ordering::Release);
    }

    /// Next locally known nonce (0 when unsynced).
    #[must_use]
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_follows_chain_when_ahead() {
        let tracker = NonceTracker::new();
        assert_eq!(tracker.reserve(5), 5);
        assert_eq!(tracker.reserve(9), 9);
        assert_eq!(tracker.peek(), 10);
    }

    #[test]
    fn test_stays_ahead_when_chain_lags() {
        let tracker = NonceTracker::new();
        assert_eq!(tracker.reserve(3), 3);
        // Node has not yet counted the pending transaction.
        assert_eq!(tracker.reserve(3), 4);
        assert_eq!(tracker.reserve(4), 5);
    }

    #[test]
    fn test_reset_resyncs_from_chain() {
        let tracker = NonceTracker::new();
        assert_eq!(tracker.reserve(7), 7);
        tracker.reset();
        assert_eq!(tracker.reserve(7), 7);
    }

    #[test]
    fn test_concurrent_reservations_unique() {
        let tracker = Arc::new(NonceTracker::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || (0..250).map(|_| tracker.reserve(0)).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for nonce in handle.join().unwrap() {
                assert!(seen.insert(nonce), "duplicate nonce {nonce}");
            }
        }
        assert_eq!(seen.len(), 1000);
    }
}
