//! In-memory repository implementation
//!
//! Rules and bindings live in `HashMap`s behind one `RwLock`, so every
//! single-row operation (and in particular insert-if-absent) observes and
//! updates all uniqueness indexes atomically. Reads run concurrently;
//! writes are serialized. Nothing survives a process restart.
//!
//! Soft-deleted rows are kept as tombstones until a new row reuses their
//! key or the rule is purged.

use async_trait::async_trait;
use chrono::Utc;
use faultline_core::{BindingKey, CircuitBreakerRule, Release, RuleKey};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::{error::RepositoryError, traits::*, RepositoryResult};

#[derive(Debug)]
struct StoredRule {
    rule: CircuitBreakerRule,
    /// Insertion order, breaks ties between equal timestamps
    seq: u64,
}

#[derive(Debug)]
struct StoredRelease {
    release: Release,
    seq: u64,
}

#[derive(Debug, Default)]
struct Tables {
    rules: HashMap<RuleKey, StoredRule>,
    /// Live masters by `(name, namespace)`
    masters: HashMap<(String, String), String>,
    bindings: HashMap<BindingKey, StoredRelease>,
    next_seq: u64,
}

impl Tables {
    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn live(&self, key: &RuleKey) -> Option<&CircuitBreakerRule> {
        self.rules
            .get(key)
            .map(|stored| &stored.rule)
            .filter(|rule| !rule.deleted)
    }
}

/// In-memory rule repository
///
/// Cloning is cheap and every clone shares the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| RepositoryError::Poisoned("memory repository"))
    }

    fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| RepositoryError::Poisoned("memory repository"))
    }

    /// Number of rows held, tombstones included
    pub fn row_count(&self) -> usize {
        self.read().map(|tables| tables.rules.len()).unwrap_or(0)
    }
}

#[async_trait]
impl RuleRepository for MemoryRepository {
    async fn put_if_absent(&self, rule: CircuitBreakerRule) -> RepositoryResult<CircuitBreakerRule> {
        let mut tables = self.write()?;
        let key = rule.key();

        if tables.live(&key).is_some() {
            debug!(rule = %key, "insert rejected, version already exists");
            return Err(RepositoryError::Conflict(format!(
                "rule {} already exists",
                key
            )));
        }

        if rule.is_master() {
            let name_key = (rule.name.clone(), rule.namespace.clone());
            if let Some(owner) = tables.masters.get(&name_key) {
                debug!(
                    name = %rule.name,
                    namespace = %rule.namespace,
                    owner = %owner,
                    "insert rejected, name already taken"
                );
                return Err(RepositoryError::Conflict(format!(
                    "rule {}/{} already exists",
                    rule.namespace, rule.name
                )));
            }
            tables.masters.insert(name_key, rule.id.clone());
        }

        let seq = tables.next_seq();
        tables.rules.insert(
            key,
            StoredRule {
                rule: rule.clone(),
                seq,
            },
        );
        Ok(rule)
    }

    async fn get(&self, key: &RuleKey) -> RepositoryResult<Option<CircuitBreakerRule>> {
        Ok(self.read()?.live(key).cloned())
    }

    async fn update(
        &self,
        key: &RuleKey,
        mutator: RuleMutator,
    ) -> RepositoryResult<CircuitBreakerRule> {
        let mut tables = self.write()?;
        let stored = tables
            .rules
            .get_mut(key)
            .filter(|stored| !stored.rule.deleted)
            .ok_or_else(|| RepositoryError::NotFound { key: key.clone() })?;

        let mut updated = stored.rule.clone();
        mutator(&mut updated);
        updated.id = stored.rule.id.clone();
        updated.version = stored.rule.version.clone();
        updated.name = stored.rule.name.clone();
        updated.namespace = stored.rule.namespace.clone();
        updated.created_at = stored.rule.created_at;
        updated.deleted = false;

        stored.rule = updated.clone();
        Ok(updated)
    }

    async fn soft_delete(&self, key: &RuleKey) -> RepositoryResult<bool> {
        let mut guard = self.write()?;
        let tables = &mut *guard;
        let Some(stored) = tables
            .rules
            .get_mut(key)
            .filter(|stored| !stored.rule.deleted)
        else {
            return Ok(false);
        };

        stored.rule.deleted = true;
        stored.rule.modified_at = Utc::now();

        if stored.rule.is_master() {
            let name_key = (stored.rule.name.clone(), stored.rule.namespace.clone());
            if tables.masters.get(&name_key) == Some(&key.id) {
                tables.masters.remove(&name_key);
            }
        }
        Ok(true)
    }

    async fn list_by_index(&self, index: &RuleIndex) -> RepositoryResult<Vec<CircuitBreakerRule>> {
        let tables = self.read()?;
        let mut rows: Vec<&StoredRule> = tables
            .rules
            .values()
            .filter(|stored| !stored.rule.deleted && index.matches(&stored.rule))
            .collect();
        rows.sort_by_key(|stored| (stored.rule.created_at, stored.seq));
        Ok(rows.into_iter().map(|stored| stored.rule.clone()).collect())
    }

    async fn put_binding_if_absent(&self, release: Release) -> RepositoryResult<bool> {
        let mut tables = self.write()?;
        let key = release.key();
        if tables.bindings.contains_key(&key) {
            return Ok(false);
        }
        let seq = tables.next_seq();
        tables
            .bindings
            .insert(key, StoredRelease { release, seq });
        Ok(true)
    }

    async fn remove_binding(&self, key: &BindingKey) -> RepositoryResult<bool> {
        Ok(self.write()?.bindings.remove(key).is_some())
    }

    async fn list_bindings(&self, index: &BindingIndex) -> RepositoryResult<Vec<Release>> {
        let tables = self.read()?;
        let mut rows: Vec<&StoredRelease> = tables
            .bindings
            .values()
            .filter(|stored| index.matches(&stored.release))
            .collect();
        rows.sort_by_key(|stored| (stored.release.created_at, stored.seq));
        Ok(rows.into_iter().map(|stored| stored.release.clone()).collect())
    }

    async fn purge_rule(&self, id: &str) -> RepositoryResult<()> {
        let mut tables = self.write()?;
        tables.rules.retain(|key, _| key.id != id);
        tables.masters.retain(|_, owner| owner != id);
        tables.bindings.retain(|key, _| key.rule.id != id);
        debug!(rule_id = %id, "purged rule");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
