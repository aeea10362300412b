//! Administrative request shapes
//!
//! One [`RuleRequest`] shape serves every write operation; which fields are
//! required depends on the operation and is decided by [`crate::validator`].
//! Absent fields deserialize to `None`, which is distinct from an explicitly
//! empty string.

use faultline_core::CbRule;
use serde::{Deserialize, Serialize};

/// A rule as submitted by an administrator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inbounds: Option<Vec<CbRule>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbounds: Option<Vec<CbRule>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owners: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl RuleRequest {
    /// Request addressing an existing rule by id
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Request addressing an existing rule by name and namespace
    pub fn by_name(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            namespace: Some(namespace.into()),
            ..Default::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_owners(mut self, owners: impl Into<String>) -> Self {
        self.owners = Some(owners.into());
        self
    }
}

/// A service named in a release or unbind request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTarget {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
}

impl ServiceTarget {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            namespace: Some(namespace.into()),
        }
    }
}

/// Bind (or unbind) a rule version to a service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReleaseRequest {
    #[serde(default)]
    pub service: ServiceTarget,
    #[serde(default)]
    pub circuit_breaker: RuleRequest,
}

impl ReleaseRequest {
    pub fn new(service: ServiceTarget, circuit_breaker: RuleRequest) -> Self {
        Self {
            service,
            circuit_breaker,
        }
    }
}

/// How a request names the rule it targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleAddress {
    Id(String),
    Name { name: String, namespace: String },
}

impl std::fmt::Display for RuleAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleAddress::Id(id) => write!(f, "id {}", id),
            RuleAddress::Name { name, namespace } => write!(f, "{}/{}", namespace, name),
        }
    }
}
