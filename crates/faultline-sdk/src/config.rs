//! Configuration types for GovernanceService

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Governance configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// How long a mutation waits to enter its rule's section; `None` waits forever
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: Option<u64>,

    /// Largest batch a write API accepts
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

fn default_lock_timeout_ms() -> Option<u64> {
    Some(5_000)
}

fn default_max_batch_size() -> usize {
    100
}

impl GovernanceConfig {
    pub fn new() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
            max_batch_size: default_max_batch_size(),
        }
    }

    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_ms.map(Duration::from_millis)
    }

    pub fn with_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_timeout_ms = timeout.map(|t| t.as_millis() as u64);
        self
    }

    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self::new()
    }
}
