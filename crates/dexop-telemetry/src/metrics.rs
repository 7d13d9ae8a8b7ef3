//! Prometheus metrics for the settlement operator.
//!
//! Covers:
//! - Trade lifecycle per queue (queued, sent, success, error by ErrID)
//! - Submission failures that never reached the chain
//! - Stop-order cascades
//! - Queue backlog and mining latency
//! - Message bus throughput
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration failure
//! means duplicate metric names, which must crash at startup rather than
//! silently drop observability. These panics only happen during static
//! initialization.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge_vec, register_histogram_vec,
    register_int_gauge, Counter, CounterVec, Encoder, GaugeVec, HistogramVec, IntGauge,
    TextEncoder,
};

use crate::error::TelemetryResult;

/// Trades accepted into a queue.
pub static TRADES_QUEUED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dexop_trades_queued_total",
        "Trades accepted into a transaction queue",
        &["queue"]
    )
    .unwrap()
});

/// Trades broadcast to the exchange contract.
pub static TRADES_SENT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dexop_trades_sent_total",
        "Trades broadcast to the exchange contract",
        &["queue"]
    )
    .unwrap()
});

/// Trades mined without revert.
pub static TRADES_SUCCESS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dexop_trades_success_total",
        "Trades mined without revert",
        &["queue"]
    )
    .unwrap()
});

/// Trades rejected on chain.
/// Labels: queue, err_id (LogError code)
pub static TRADES_ERROR_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dexop_trades_error_total",
        "Trades rejected on chain by error id",
        &["queue", "err_id"]
    )
    .unwrap()
});

/// Trades dropped before reaching the chain (signing, nonce, broadcast).
pub static SUBMISSION_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dexop_submission_failures_total",
        "Trades abandoned because submission failed",
        &["queue"]
    )
    .unwrap()
});

pub static STOP_ORDERS_TRIGGERED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "dexop_stop_orders_triggered_total",
        "Stop orders converted into live orders"
    )
    .unwrap()
});

pub static STOP_ORDER_FAILURES_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "dexop_stop_order_failures_total",
        "Triggered stop orders that failed to convert or persist"
    )
    .unwrap()
});

/// Pending entries per queue.
pub static QUEUE_LENGTH: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "dexop_queue_length",
        "Pending trades per transaction queue",
        &["queue"]
    )
    .unwrap()
});

/// Time from broadcast to receipt in seconds.
pub static MINING_WAIT_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "dexop_mining_wait_seconds",
        "Time between broadcast and mined receipt",
        &["queue"],
        vec![0.5, 1.0, 2.0, 5.0, 10.0, 15.0, 30.0, 60.0, 120.0, 300.0]
    )
    .unwrap()
});

/// Operator halt latch state (1 = halted).
pub static OPERATOR_HALTED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "dexop_operator_halted",
        "Whether queue draining is halted (1=halted)"
    )
    .unwrap()
});

pub static BUS_PUBLISHED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dexop_bus_published_total",
        "Messages published on the message bus",
        &["topic"]
    )
    .unwrap()
});

pub static BUS_HANDLER_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dexop_bus_handler_errors_total",
        "Message handlers that returned an error",
        &["topic"]
    )
    .unwrap()
});

/// Metrics helper.
pub struct Metrics;

impl Metrics {
    /// Record a trade accepted into `queue`.
    pub fn trade_queued(queue: &str) {
        TRADES_QUEUED_TOTAL.with_label_values(&[queue]).inc();
    }

    /// Record a broadcast transaction.
    pub fn trade_sent(queue: &str) {
        TRADES_SENT_TOTAL.with_label_values(&[queue]).inc();
    }

    pub fn trade_success(queue: &str) {
        TRADES_SUCCESS_TOTAL.with_label_values(&[queue]).inc();
    }

    /// Record an on-chain rejection.
    pub fn trade_error(queue: &str, err_id: u8) {
        TRADES_ERROR_TOTAL
            .with_label_values(&[queue, &err_id.to_string()])
            .inc();
    }

    pub fn submission_failed(queue: &str) {
        SUBMISSION_FAILURES_TOTAL.with_label_values(&[queue]).inc();
    }

    pub fn stop_order_triggered() {
        STOP_ORDERS_TRIGGERED_TOTAL.inc();
    }

    pub fn stop_order_failed() {
        STOP_ORDER_FAILURES_TOTAL.inc();
    }

    /// Set current backlog for `queue`.
    pub fn queue_length(queue: &str, length: usize) {
        QUEUE_LENGTH.with_label_values(&[queue]).set(length as f64);
    }

    /// Record broadcast-to-receipt latency.
    pub fn mining_wait(queue: &str, seconds: f64) {
        MINING_WAIT_SECONDS
            .with_label_values(&[queue])
            .observe(seconds);
    }

    pub fn operator_halted(halted: bool) {
        OPERATOR_HALTED.set(i64::from(halted));
    }

    pub fn bus_published(topic: &str) {
        BUS_PUBLISHED_TOTAL.with_label_values(&[topic]).inc();
    }

    pub fn bus_handler_error(topic: &str) {
        BUS_HANDLER_ERRORS_TOTAL.with_label_values(&[topic]).inc();
    }

    /// Render the default registry in Prometheus text format.
    pub fn gather_text() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
