//! Repository abstraction layer for Faultline
//!
//! This crate provides the storage contract for circuit-breaker rules and
//! their release bindings, with interchangeable backends.
//!
//! # Features
//!
//! - **Memory Repository**: process-local tables, used by tests and single-node deployments
//! - **PostgreSQL Repository**: durable storage behind the `postgres` feature
//! - **Caching**: TTL read cache that any backend can be wrapped in
//! - **Async API**: every operation is an `async fn` behind [`RuleRepository`]
//!
//! # Quick Start
//!
//! ```no_run
//! use chrono::Utc;
//! use faultline_core::{CircuitBreakerRule, RuleKey, RuleVersion};
//! use faultline_repository::{MemoryRepository, RuleRepository};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let repo = MemoryRepository::new();
//!
//!     let rule = CircuitBreakerRule {
//!         id: "0f3c".to_string(),
//!         version: RuleVersion::Master,
//!         name: "payments-cb".to_string(),
//!         namespace: "prod".to_string(),
//!         ..Default::default()
//!     };
//!     repo.put_if_absent(rule).await?;
//!
//!     let master = repo.get(&RuleKey::master("0f3c")).await?;
//!     assert!(master.is_some());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │        Governance Layer (sdk)          │
//! └──────────────┬─────────────────────────┘
//!                │ RuleRepository
//!                ↓
//! ┌────────────────────────────────────────┐
//! │  CachedRepository (optional, reads)    │
//! └──────────────┬─────────────────────────┘
//!                │
//!       ┌────────┴────────┐
//!       ↓                 ↓
//! ┌──────────────┐  ┌──────────────────┐
//! │ Memory       │  │  PostgreSQL      │
//! │ Repository   │  │  Repository      │
//! └──────────────┘  └──────────────────┘
//! ```

pub mod cached;
pub mod config;
pub mod error;
pub mod memory;
pub mod models;
pub mod traits;

#[cfg(feature = "postgres")]
pub mod postgres;

// Re-exports - Configuration
pub use config::{ConfigError, RepositoryConfig, RepositorySource};

// Re-exports - Error
pub use error::{RepositoryError, RepositoryResult};

// Re-exports - Repositories
pub use cached::CachedRepository;
pub use memory::MemoryRepository;
pub use models::*;
pub use traits::*;

#[cfg(feature = "postgres")]
pub use postgres::PostgresRepository;
