//! Data models for the repository layer

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of entries dropped because a write touched their rule
    pub invalidations: u64,
    /// Number of entries in cache
    pub size: usize,
}

impl CacheStats {
    /// Calculate cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// A cached value with TTL support
#[derive(Debug, Clone)]
pub(crate) struct CachedEntry<T> {
    /// The cached data
    pub data: T,
    /// When this entry was cached
    pub cached_at: Instant,
    /// Time-to-live duration
    pub ttl: Duration,
}

impl<T> CachedEntry<T> {
    pub fn new(data: T, ttl: Duration) -> Self {
        Self {
            data,
            cached_at: Instant::now(),
            ttl,
        }
    }

    /// Check if this cached entry has expired
    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether caching is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Time-to-live for cache entries, in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Maximum number of entries to keep in cache
    #[serde(default)]
    pub max_entries: Option<usize>,
}

fn default_enabled() -> bool {
    true
}

fn default_ttl_secs() -> u64 {
    30
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_ttl_secs(),
            max_entries: Some(10_000),
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable caching
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_secs = ttl.as_secs();
        self
    }

    /// Set the maximum number of entries
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    /// Remove the entry limit
    pub fn unlimited_entries(mut self) -> Self {
        self.max_entries = None;
        self
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}
