//! Faultline Governance SDK
//!
//! Versioning and release state machine for circuit-breaker rules.
//!
//! ```text
//! request ─► validator ─► keyed lock (per rule) ─► RuleStore / ReleaseManager ─► repository
//!                                                         QueryService ─────────► repository (reads, no lock)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use faultline_sdk::{GovernanceServiceBuilder, RuleRequest};
//!
//! let service = GovernanceServiceBuilder::new().build().await?;
//! let created = service
//!     .create_rules(&[RuleRequest {
//!         name: Some("payments-cb".into()),
//!         namespace: Some("prod".into()),
//!         owners: Some("sre".into()),
//!         ..Default::default()
//!     }])
//!     .await;
//! assert!(created.is_success());
//! ```

pub mod builder;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod guard;
pub mod query;
pub mod release;
pub mod request;
pub mod response;
pub mod service;
pub mod store;
pub mod validator;

// Re-export main types
pub use builder::GovernanceServiceBuilder;
pub use collaborators::{ExactTokenVerifier, InMemoryServiceDirectory, ServiceDirectory, TokenVerifier};
pub use config::GovernanceConfig;
pub use error::{GovernanceError, Result, ValidationError};
pub use guard::KeyedLock;
pub use query::{Filters, QueryService, ReleasedRule};
pub use release::{ReleaseManager, ReleaseOutcome, UnbindOutcome};
pub use request::{ReleaseRequest, RuleAddress, RuleRequest, ServiceTarget};
pub use response::{ApiResponse, BatchResponse, QueryResponse, ResultCode};
pub use service::GovernanceService;
pub use store::{DeleteOutcome, RuleStore, UpdateOutcome};

// Re-export commonly used types from dependencies
pub use faultline_core::{
    BindingKey, CircuitBreakerRule, Release, RuleKey, RuleVersion, RuleWithServices, ServiceRef,
};
pub use faultline_repository::{CacheConfig, MemoryRepository, RepositoryConfig};
