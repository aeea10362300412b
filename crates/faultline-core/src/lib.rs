//! Faultline Core
//!
//! Core types shared by every Faultline crate: the circuit-breaker rule
//! entity (one type for both the editable master head and its frozen
//! version snapshots), the fault-tolerance policy content it carries, and
//! the release bindings that attach a rule version to a running service.
//!
//! # Rule lifecycle
//!
//! ```text
//!   create ──► master ──create-version──► v1, v2, ...   (frozen copies)
//!                │                          │
//!              update                    release ──► service bindings
//!                │                          │
//!              delete (soft)             unbind / delete (if unbound)
//! ```

pub mod policy;
pub mod release;
pub mod rule;
pub mod version;

pub use policy::{
    CbPolicy, CbRule, ConsecutiveErrorConfig, DestinationKind, DestinationScope, DestinationSet,
    ErrorRateConfig, MatchKind, MatchString, OutlierDetectWhen, RecoverConfig, ResourceLevel,
    SlowRateConfig, SourceMatcher,
};
pub use release::{BindingKey, Release, RuleWithServices, ServiceRef};
pub use rule::{CircuitBreakerRule, RuleKey};
pub use version::{RuleVersion, MASTER_VERSION};
