//! Operator configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::journal::JournalTradeStore;
use crate::store::{DynTradeStore, MemoryTradeStore};

/// Which queue wins when several share the shortest length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Earliest-created queue (round-robin-like fill from the front).
    #[default]
    LowestIndex,
    /// Latest-created queue.
    HighestIndex,
}

/// Backing store for each queue's pending trades.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Volatile; backlog is lost on restart.
    #[default]
    Memory,
    /// One JSON Lines journal per queue under `dir`.
    Journal { dir: PathBuf },
}

impl StoreConfig {
    /// Open the store for queue `name`.
    pub fn open(&self, name: &str) -> StoreResult<DynTradeStore> {
        let store: DynTradeStore = match self {
            Self::Memory => Arc::new(MemoryTradeStore::new()),
            Self::Journal { dir } => Arc::new(JournalTradeStore::open(dir, name)?),
        };
        Ok(store)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Receipt poll interval while waiting for mining; also the retry
    /// delay after a store failure.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Abandon the mining wait after this long. Unset waits indefinitely.
    #[serde(default)]
    pub mining_timeout_secs: Option<u64>,

    #[serde(default)]
    pub tie_break: TieBreak,

    #[serde(default)]
    pub store: StoreConfig,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl OperatorConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn mining_timeout(&self) -> Option<Duration> {
        self.mining_timeout_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            mining_timeout_secs: None,
            tie_break: TieBreak::default(),
            store: StoreConfig::default(),
        }
    }
}
