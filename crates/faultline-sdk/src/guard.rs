//! Per-key mutual exclusion
//!
//! [`KeyedLock`] hands out one async mutex per key. Mutations of the same
//! rule are totally ordered; different keys never contend. A key's mutex is
//! dropped from the map once its last holder or waiter is gone.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::{GovernanceError, Result};

type Sections = DashMap<String, Arc<Mutex<()>>>;

/// Map of per-key async mutexes
#[derive(Debug, Clone, Default)]
pub struct KeyedLock {
    sections: Arc<Sections>,
}

/// Exclusive section for one key; released on drop
#[derive(Debug)]
pub struct Section {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    sections: Arc<Sections>,
}

impl Section {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for Section {
    fn drop(&mut self) {
        // Release first so the map holds the only remaining reference
        self.guard.take();
        self.sections
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the section for `key`
    ///
    /// With a deadline, gives up with [`GovernanceError::Timeout`] if the
    /// section cannot be entered in time; nothing has been written then.
    pub async fn acquire(&self, key: impl Into<String>, deadline: Option<Duration>) -> Result<Section> {
        let key = key.into();
        let mutex = self
            .sections
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let guard = match deadline {
            Some(deadline) => tokio::time::timeout(deadline, mutex.lock_owned())
                .await
                .map_err(|_| {
                    debug!(key = %key, "gave up waiting for section");
                    GovernanceError::Timeout(key.clone())
                })?,
            None => mutex.lock_owned().await,
        };

        Ok(Section {
            key,
            guard: Some(guard),
            sections: Arc::clone(&self.sections),
        })
    }

    /// Number of keys currently held or waited on
    pub fn active_keys(&self) -> usize {
        self.sections.len()
    }
}

/// Section key of a rule id
pub fn rule_key(id: &str) -> String {
    format!("rule:{}", id)
}

/// Section key of a master name, used before an id exists
pub fn name_key(name: &str, namespace: &str) -> String {
    format!("name:{}/{}", namespace, name)
}
