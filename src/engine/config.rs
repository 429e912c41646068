//! Engine configuration options.

use serde::{Deserialize, Serialize};

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Maximum number of snapshots to retain in memory.
    pub max_snapshots: usize,
    /// Maximum number of trades to retain; the oldest are dropped first.
    pub max_trades: usize,
    /// Log every event at debug level.
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            max_snapshots: 10_000,
            max_trades: 100_000,
            verbose: false,
        }
    }
}
