//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Key error: {0}")]
    Key(#[from] dexop_chain::KeyError),

    #[error("Chain error: {0}")]
    Chain(#[from] dexop_chain::ChainError),

    #[error("Bus error: {0}")]
    Bus(#[from] dexop_bus::BusError),

    #[error("Operator error: {0}")]
    Operator(#[from] dexop_operator::OperatorError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] dexop_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
