//! Operator-wide halt latch.
//!
//! While halted, queue workers stop taking new trades off their stores; a
//! trade already executing runs to completion. Enqueuing keeps working, so
//! backlog accumulates until [`HaltLatch::resume`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use dexop_telemetry::Metrics;
use parking_lot::Mutex;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct HaltLatch {
    halted: AtomicBool,
    /// Reason for halting (set on first halt only).
    reason: Mutex<Option<String>>,
    /// Time of halting (set on first halt only).
    halted_at: Mutex<Option<Instant>>,
    resumed: Notify,
}

impl HaltLatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    /// Halt dispatch. A repeated halt keeps the first reason and time.
    pub fn halt(&self, reason: &str) {
        if !self.halted.swap(true, Ordering::AcqRel) {
            *self.reason.lock() = Some(reason.to_string());
            *self.halted_at.lock() = Some(Instant::now());
            Metrics::operator_halted(true);
            warn!(reason, "Operator halted");
        }
    }

    /// Resume dispatch and wake every waiting worker.
    pub fn resume(&self) {
        if self.halted.swap(false, Ordering::AcqRel) {
            let halted_for = self.elapsed_since_halt();
            *self.reason.lock() = None;
            *self.halted_at.lock() = None;
            Metrics::operator_halted(false);
            info!(?halted_for, "Operator resumed");
        }
        self.resumed.notify_waiters();
    }

    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.lock().clone()
    }

    #[must_use]
    pub fn elapsed_since_halt(&self) -> Option<Duration> {
        self.halted_at.lock().map(|t| t.elapsed())
    }

    /// Future completing on the next [`resume`](Self::resume).
    ///
    /// Registered on creation, so create it before re-checking
    /// [`is_halted`](Self::is_halted) to avoid missing a wakeup.
    pub fn resumed(&self) -> Notified<'_> {
        self.resumed.notified()
    }
}
