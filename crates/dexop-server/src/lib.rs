//! Standalone DEX settlement operator.
//!
//! Wires the operator to:
//! - An in-process message bus (`trade` in, `operator` out)
//! - The simulated exchange chain
//! - In-memory order and trade services following the status stream

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
