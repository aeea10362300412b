//! Release bindings between rule versions and services

use crate::rule::{CircuitBreakerRule, RuleKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A service in the registry, addressed by name and namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceRef {
    pub name: String,
    pub namespace: String,
}

impl ServiceRef {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for ServiceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Unique address of a binding
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BindingKey {
    pub rule: RuleKey,
    pub service: ServiceRef,
}

/// A released rule version, bound to one service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub rule: RuleKey,
    pub service: ServiceRef,
    pub created_at: DateTime<Utc>,
}

impl Release {
    pub fn new(rule: RuleKey, service: ServiceRef, created_at: DateTime<Utc>) -> Self {
        Self {
            rule,
            service,
            created_at,
        }
    }

    pub fn key(&self) -> BindingKey {
        BindingKey {
            rule: self.rule.clone(),
            service: self.service.clone(),
        }
    }
}

/// Read-side projection: a rule row with the services it is released to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleWithServices {
    pub rule: CircuitBreakerRule,
    #[serde(default)]
    pub services: Vec<ServiceRef>,
}
