//! Read-through cache in front of any [`RuleRepository`]
//!
//! Only point lookups (`get`) are cached. Every successful write drops all
//! cached rows of the rule it touched before returning, so a caller never
//! reads back a row older than its own last write. Index scans and binding
//! lookups always go to the inner repository.
//!
//! A load that raced with a write is not cached: every invalidation bumps a
//! generation counter and a row is only stored if the generation it was
//! loaded under is still current.

use async_trait::async_trait;
use faultline_core::{BindingKey, CircuitBreakerRule, Release, RuleKey};
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use crate::{models::*, traits::*, CacheStats, RepositoryResult};

#[derive(Default)]
struct CacheTable {
    entries: HashMap<RuleKey, CachedEntry<CircuitBreakerRule>>,
    generation: u64,
}

/// Repository wrapper that caches row lookups
pub struct CachedRepository<R> {
    inner: R,
    cache: RwLock<CacheTable>,
    config: Mutex<CacheConfig>,
    stats: Mutex<CacheStats>,
}

impl<R: RuleRepository> CachedRepository<R> {
    /// Wrap a repository with the default cache configuration
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, CacheConfig::default())
    }

    pub fn with_config(inner: R, config: CacheConfig) -> Self {
        Self {
            inner,
            cache: RwLock::new(CacheTable::default()),
            config: Mutex::new(config),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn config(&self) -> CacheConfig {
        self.config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn with_stats(&self, update: impl FnOnce(&mut CacheStats)) {
        let mut stats = self
            .stats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        update(&mut stats);
    }

    fn generation(&self) -> u64 {
        self.cache
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .generation
    }

    fn lookup(&self, key: &RuleKey) -> Option<CircuitBreakerRule> {
        if !self.config().enabled {
            return None;
        }

        let hit = {
            let cache = self.cache.read().unwrap_or_else(|poisoned| poisoned.into_inner());
            cache
                .entries
                .get(key)
                .filter(|entry| !entry.is_expired())
                .map(|entry| entry.data.clone())
        };

        self.with_stats(|stats| match hit {
            Some(_) => stats.hits += 1,
            None => stats.misses += 1,
        });
        hit
    }

    fn store(&self, rule: &CircuitBreakerRule, loaded_at: u64) {
        let config = self.config();
        if !config.enabled {
            return;
        }

        let mut guard = self.cache.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if guard.generation != loaded_at {
            return;
        }
        let cache = &mut guard.entries;
        if let Some(max) = config.max_entries {
            if cache.len() >= max {
                cache.retain(|_, entry| !entry.is_expired());
            }
            if cache.len() >= max {
                let oldest = cache
                    .iter()
                    .min_by_key(|(_, entry)| entry.cached_at)
                    .map(|(key, _)| key.clone());
                if let Some(oldest) = oldest {
                    cache.remove(&oldest);
                }
            }
        }
        cache.insert(rule.key(), CachedEntry::new(rule.clone(), config.ttl()));

        let size = cache.len();
        self.with_stats(|stats| stats.size = size);
    }

    fn invalidate(&self, id: &str) {
        let mut guard = self.cache.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.generation += 1;
        let cache = &mut guard.entries;
        let before = cache.len();
        cache.retain(|key, _| key.id != id);
        let dropped = (before - cache.len()) as u64;
        let size = cache.len();
        self.with_stats(|stats| {
            stats.invalidations += dropped;
            stats.size = size;
        });
    }
}

#[async_trait]
impl<R: RuleRepository> RuleRepository for CachedRepository<R> {
    async fn put_if_absent(&self, rule: CircuitBreakerRule) -> RepositoryResult<CircuitBreakerRule> {
        let id = rule.id.clone();
        let stored = self.inner.put_if_absent(rule).await?;
        self.invalidate(&id);
        Ok(stored)
    }

    async fn get(&self, key: &RuleKey) -> RepositoryResult<Option<CircuitBreakerRule>> {
        if let Some(cached) = self.lookup(key) {
            return Ok(Some(cached));
        }

        let generation = self.generation();
        let loaded = self.inner.get(key).await?;
        if let Some(rule) = &loaded {
            self.store(rule, generation);
        }
        Ok(loaded)
    }

    async fn update(
        &self,
        key: &RuleKey,
        mutator: RuleMutator,
    ) -> RepositoryResult<CircuitBreakerRule> {
        let updated = self.inner.update(key, mutator).await?;
        self.invalidate(&key.id);
        Ok(updated)
    }

    async fn soft_delete(&self, key: &RuleKey) -> RepositoryResult<bool> {
        let deleted = self.inner.soft_delete(key).await?;
        self.invalidate(&key.id);
        Ok(deleted)
    }

    async fn list_by_index(&self, index: &RuleIndex) -> RepositoryResult<Vec<CircuitBreakerRule>> {
        self.inner.list_by_index(index).await
    }

    async fn put_binding_if_absent(&self, release: Release) -> RepositoryResult<bool> {
        self.inner.put_binding_if_absent(release).await
    }

    async fn remove_binding(&self, key: &BindingKey) -> RepositoryResult<bool> {
        self.inner.remove_binding(key).await
    }

    async fn list_bindings(&self, index: &BindingIndex) -> RepositoryResult<Vec<Release>> {
        self.inner.list_bindings(index).await
    }

    async fn purge_rule(&self, id: &str) -> RepositoryResult<()> {
        self.inner.purge_rule(id).await?;
        self.invalidate(id);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}

impl<R: RuleRepository> CacheableRepository for CachedRepository<R> {
    fn clear_cache(&self) {
        let mut guard = self.cache.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.generation += 1;
        guard.entries.clear();
        drop(guard);
        self.with_stats(|stats| stats.size = 0);
    }

    fn clear_cache_entry(&self, id: &str) {
        self.invalidate(id);
    }

    fn cache_stats(&self) -> CacheStats {
        self.stats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_cache_enabled(&self, enabled: bool) {
        self.config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .enabled = enabled;
        if !enabled {
            self.clear_cache();
        }
    }

    fn is_cache_enabled(&self) -> bool {
        self.config().enabled
    }
}
