//! Prometheus metrics and structured logging for the settlement operator.
//!
//! - Prometheus counters for trade lifecycle events and stop-order cascades
//! - Per-queue length gauges and mining wait histograms
//! - Structured logging with tracing (JSON in production)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
