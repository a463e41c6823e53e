//! Aggregator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Group sync settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupSyncConfig {
    /// Delay before a recomputed group state is written (milliseconds)
    pub debounce_ms: u64,
    /// Round numeric values copied from group definitions to this many digits
    pub round_to_digits: Option<u32>,
}

impl Default for GroupSyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 250,
            round_to_digits: None,
        }
    }
}

impl GroupSyncConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debounce_ms = delay.as_millis() as u64;
        self
    }
}
