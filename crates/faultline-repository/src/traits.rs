//! Core trait definitions for the repository pattern
//!
//! This module defines two traits:
//!
//! - [`RuleRepository`]: the narrow storage contract the governance layer
//!   is written against (atomic single-row operations plus indexed lookup)
//! - [`CacheableRepository`]: extension for repositories fronted by a
//!   read cache
//!
//! # Examples
//!
//! ```no_run
//! use faultline_core::{RuleKey, RuleVersion};
//! use faultline_repository::{MemoryRepository, RuleIndex, RuleRepository};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let repo = MemoryRepository::new();
//!
//! // Every live row (master and versions) of one rule
//! let rows = repo.list_by_index(&RuleIndex::ById("0f3c".to_string())).await?;
//!
//! // A single frozen version
//! let v1 = repo.get(&RuleKey::new("0f3c", RuleVersion::tagged("v1"))).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use faultline_core::{BindingKey, CircuitBreakerRule, Release, RuleKey, ServiceRef};

use crate::{CacheStats, RepositoryResult};

/// In-place edit applied to a live row by [`RuleRepository::update`]
pub type RuleMutator = Box<dyn FnOnce(&mut CircuitBreakerRule) + Send>;

/// Secondary lookups over rule rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleIndex {
    /// Every live row sharing a rule id
    ById(String),
    /// Every live row with this name and namespace (masters and versions)
    ByName { name: String, namespace: String },
}

impl RuleIndex {
    pub fn by_name(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        RuleIndex::ByName {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Whether a row belongs to this index entry
    pub fn matches(&self, rule: &CircuitBreakerRule) -> bool {
        match self {
            RuleIndex::ById(id) => &rule.id == id,
            RuleIndex::ByName { name, namespace } => {
                &rule.name == name && &rule.namespace == namespace
            }
        }
    }
}

/// Secondary lookups over release bindings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingIndex {
    /// Every binding of any version of a rule
    ByRule(String),
    /// Every binding of one exact version
    ByVersion(RuleKey),
    /// Every binding targeting one service
    ByService(ServiceRef),
}

impl BindingIndex {
    pub fn matches(&self, release: &Release) -> bool {
        match self {
            BindingIndex::ByRule(id) => &release.rule.id == id,
            BindingIndex::ByVersion(key) => &release.rule == key,
            BindingIndex::ByService(service) => &release.service == service,
        }
    }
}

/// Storage contract for rules and their release bindings
///
/// # Implementation Notes
///
/// - Every operation is atomic at single-row granularity
/// - Soft-deleted rows are invisible to reads and never block inserts
/// - `put_if_absent` is the only place uniqueness is decided: `(id, version)`
///   among live rows, and `(name, namespace)` among live masters
/// - Multi-row sequences (e.g. "is this version still released?" followed by
///   a delete) are serialized by the caller, not by the repository
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` for use across async tasks.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// Insert a row unless a conflicting live row exists
    ///
    /// # Errors
    /// [`RepositoryError::Conflict`](crate::RepositoryError::Conflict) when the
    /// `(id, version)` pair, or for masters the `(name, namespace)` pair, is
    /// already taken by a live row.
    async fn put_if_absent(&self, rule: CircuitBreakerRule) -> RepositoryResult<CircuitBreakerRule>;

    /// Load a live row
    async fn get(&self, key: &RuleKey) -> RepositoryResult<Option<CircuitBreakerRule>>;

    /// Apply `mutator` to a live row and persist the result atomically
    ///
    /// Identity fields (`id`, `version`, `name`, `namespace`, `created_at`)
    /// are preserved regardless of what the mutator does.
    async fn update(&self, key: &RuleKey, mutator: RuleMutator)
        -> RepositoryResult<CircuitBreakerRule>;

    /// Mark a live row deleted
    ///
    /// Returns `false` when there was no live row to retire.
    async fn soft_delete(&self, key: &RuleKey) -> RepositoryResult<bool>;

    /// List live rows matching `index`, oldest first
    async fn list_by_index(&self, index: &RuleIndex) -> RepositoryResult<Vec<CircuitBreakerRule>>;

    /// Record a binding; returns `false` when it already existed
    async fn put_binding_if_absent(&self, release: Release) -> RepositoryResult<bool>;

    /// Remove a binding; returns `false` when there was nothing to remove
    async fn remove_binding(&self, key: &BindingKey) -> RepositoryResult<bool>;

    /// List bindings matching `index`, oldest first
    async fn list_bindings(&self, index: &BindingIndex) -> RepositoryResult<Vec<Release>>;

    /// Hard-remove every row and binding of a rule, live or not
    async fn purge_rule(&self, id: &str) -> RepositoryResult<()>;

    /// Short name of the backend, for logs
    fn backend_name(&self) -> &'static str;
}

/// Extension trait for repositories fronted by a read cache
///
/// # Examples
///
/// ```no_run
/// # use faultline_core::RuleKey;
/// # use faultline_repository::{CacheableRepository, CachedRepository, MemoryRepository, RuleRepository};
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let repo = CachedRepository::new(MemoryRepository::new());
///
/// // First load - cache miss, second load - cache hit
/// let _ = repo.get(&RuleKey::master("0f3c")).await?;
/// let _ = repo.get(&RuleKey::master("0f3c")).await?;
///
/// let stats = repo.cache_stats();
/// println!("Hit rate: {:.2}%", stats.hit_rate() * 100.0);
/// # Ok(())
/// # }
/// ```
pub trait CacheableRepository: RuleRepository {
    /// Clear all cached rows
    fn clear_cache(&self);

    /// Clear every cached row of one rule id
    fn clear_cache_entry(&self, id: &str);

    /// Get cache statistics
    fn cache_stats(&self) -> CacheStats;

    /// Enable or disable caching
    fn set_cache_enabled(&self, enabled: bool);

    /// Check if caching is enabled
    fn is_cache_enabled(&self) -> bool;
}
