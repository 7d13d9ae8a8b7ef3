//! Application configuration.

use alloy::primitives::Address;
use dexop_bus::DEFAULT_TOPIC_CAPACITY;
use dexop_chain::KeySource;
use dexop_operator::OperatorConfig;
use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// Message bus configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BusConfig {
    /// Per-topic channel capacity. Publishers wait when a topic is full.
    #[serde(default = "default_bus_capacity")]
    pub capacity: usize,
}

fn default_bus_capacity() -> usize {
    DEFAULT_TOPIC_CAPACITY
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: default_bus_capacity(),
        }
    }
}

/// Simulated exchange chain configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// Exchange contract address.
    #[serde(with = "dexop_core::wire::address", default = "default_exchange")]
    pub exchange: Address,
    /// Mine every transaction on submission. Otherwise a block is produced
    /// every `block_time_ms`.
    #[serde(default = "default_auto_mine")]
    pub auto_mine: bool,
    #[serde(default = "default_block_time_ms")]
    pub block_time_ms: u64,
    /// Local development wallets (0-7) appended to the configured pool.
    #[serde(default)]
    pub dev_wallets: usize,
}

fn default_exchange() -> Address {
    Address::repeat_byte(0xee)
}

fn default_auto_mine() -> bool {
    true
}

fn default_block_time_ms() -> u64 {
    1_000
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            exchange: default_exchange(),
            auto_mine: default_auto_mine(),
            block_time_ms: default_block_time_ms(),
            dev_wallets: 0,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub operator: OperatorConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    /// Operator signer keys; one transaction queue per wallet.
    #[serde(default)]
    pub wallets: Vec<KeySource>,
    /// Interval for the periodic queue status log (seconds, 0 disables).
    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: u64,
}

fn default_status_interval_secs() -> u64 {
    30
}

impl AppConfig {
    /// Load and validate a TOML file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the operator cannot start with.
    pub fn validate(&self) -> AppResult<()> {
        if self.wallets.is_empty() && self.chain.dev_wallets == 0 {
            return Err(AppError::Config(
                "No operator wallets configured".to_string(),
            ));
        }
        if self.chain.dev_wallets > 8 {
            return Err(AppError::Config(format!(
                "dev_wallets must be at most 8, got {}",
                self.chain.dev_wallets
            )));
        }
        if self.operator.poll_interval_ms == 0 {
            return Err(AppError::Config(
                "operator.poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.bus.capacity == 0 {
            return Err(AppError::Config("bus.capacity must be positive".to_string()));
        }
        if !self.chain.auto_mine && self.chain.block_time_ms == 0 {
            return Err(AppError::Config(
                "chain.block_time_ms must be positive without auto_mine".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dexop_operator::{StoreConfig, TieBreak};
    use std::path::PathBuf;
    use std::time::Duration;

    const SAMPLE: &str = r#"
status_interval_secs = 10

[bus]
capacity = 64

[operator]
poll_interval_ms = 250
mining_timeout_secs = 120
tie_break = "highest_index"

[operator.store]
kind = "journal"
dir = "data/queues"

[chain]
exchange = "0x00000000000000000000000000000000000000aa"
auto_mine = false
block_time_ms = 500

[[wallets]]
source = "env"
var_name = "DEXOP_OPERATOR_KEY_0"

[[wallets]]
source = "file"
path = "/run/secrets/operator-1"
"#;

    #[test]
    fn test_full_config() {
        let config = AppConfig::from_toml(SAMPLE).unwrap();

        assert_eq!(config.bus.capacity, 64);
        assert_eq!(config.status_interval_secs, 10);
        assert_eq!(config.operator.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.operator.mining_timeout(), Some(Duration::from_secs(120)));
        assert_eq!(config.operator.tie_break, TieBreak::HighestIndex);
        assert_eq!(
            config.operator.store,
            StoreConfig::Journal {
                dir: PathBuf::from("data/queues")
            }
        );
        assert_eq!(config.chain.exchange, Address::with_last_byte(0xaa));
        assert!(!config.chain.auto_mine);
        assert_eq!(config.wallets.len(), 2);
    }

    #[test]
    fn test_defaults_with_dev_wallets() {
        let config = AppConfig::from_toml("[chain]\ndev_wallets = 3\n").unwrap();

        assert_eq!(config.bus.capacity, DEFAULT_TOPIC_CAPACITY);
        assert_eq!(config.operator.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.operator.mining_timeout(), None);
        assert_eq!(config.operator.store, StoreConfig::Memory);
        assert!(config.chain.auto_mine);
    }

    #[test]
    fn test_rejects_empty_wallet_pool() {
        let result = AppConfig::from_toml("");
        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("wallets")));
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let result = AppConfig::from_toml("[operator]\npoll_interval_ms = 0\n[chain]\ndev_wallets = 1\n");
        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("poll_interval_ms")));
    }

    #[test]
    fn test_rejects_unknown_key_source() {
        let err = tokio_test::assert_err!(AppConfig::from_toml("[[wallets]]\nsource = \"hsm\"\n"));
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/default.toml");
        AppConfig::from_file(path).unwrap();
    }
}
