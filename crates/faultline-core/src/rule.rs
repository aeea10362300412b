//! Circuit-breaker rule entity

use crate::policy::CbRule;
use crate::version::RuleVersion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary address of a rule row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleKey {
    pub id: String,
    pub version: RuleVersion,
}

impl RuleKey {
    pub fn new(id: impl Into<String>, version: RuleVersion) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }

    pub fn master(id: impl Into<String>) -> Self {
        Self::new(id, RuleVersion::Master)
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

/// A circuit-breaker rule row
///
/// The same type models both the editable master head and every frozen
/// snapshot derived from it; [`CircuitBreakerRule::version`] discriminates.
/// Snapshots copy the master's descriptive fields at creation time and are
/// never edited afterwards; only `deleted` and their release bindings change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerRule {
    /// Stable identifier shared by the master and all its versions
    pub id: String,

    pub version: RuleVersion,

    pub name: String,

    pub namespace: String,

    #[serde(default)]
    pub inbounds: Vec<CbRule>,

    #[serde(default)]
    pub outbounds: Vec<CbRule>,

    #[serde(default)]
    pub business: String,

    /// Comma separated owners, never empty on a stored row
    pub owners: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Per-rule credential; blank in read-path projections
    #[serde(default)]
    pub token: String,

    /// Opaque change marker, replaced on every mutation
    pub revision: String,

    pub created_at: DateTime<Utc>,

    pub modified_at: DateTime<Utc>,

    #[serde(default)]
    pub deleted: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for CircuitBreakerRule {
    fn default() -> Self {
        Self {
            id: String::new(),
            version: RuleVersion::Master,
            name: String::new(),
            namespace: String::new(),
            inbounds: Vec::new(),
            outbounds: Vec::new(),
            business: String::new(),
            owners: String::new(),
            description: String::new(),
            enabled: default_enabled(),
            token: String::new(),
            revision: String::new(),
            created_at: DateTime::<Utc>::default(),
            modified_at: DateTime::<Utc>::default(),
            deleted: false,
        }
    }
}

impl CircuitBreakerRule {
    pub fn key(&self) -> RuleKey {
        RuleKey::new(self.id.clone(), self.version.clone())
    }

    pub fn is_master(&self) -> bool {
        self.version.is_master()
    }

    /// Freeze the current content into a snapshot row
    ///
    /// The snapshot keeps the id, name, namespace, content and token of
    /// `self` and gets its own version tag, revision and timestamps.
    pub fn snapshot(&self, version: RuleVersion, revision: String, now: DateTime<Utc>) -> Self {
        Self {
            version,
            revision,
            created_at: now,
            modified_at: now,
            deleted: false,
            ..self.clone()
        }
    }

    /// Copy of the row with the credential removed
    pub fn redacted(&self) -> Self {
        Self {
            token: String::new(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rule() -> CircuitBreakerRule {
        let now = Utc::now();
        CircuitBreakerRule {
            id: "r1".to_string(),
            version: RuleVersion::Master,
            name: "cb-rule".to_string(),
            namespace: "Test".to_string(),
            inbounds: vec![CbRule::default()],
            outbounds: vec![],
            business: "polaris".to_string(),
            owners: "polaris".to_string(),
            description: String::new(),
            enabled: true,
            token: "secret".to_string(),
            revision: "rev-1".to_string(),
            created_at: now,
            modified_at: now,
            deleted: false,
        }
    }

    #[test]
    fn test_snapshot_keeps_content_and_token() {
        let master = sample_rule();
        let later = master.created_at + chrono::Duration::seconds(5);
        let snapshot = master.snapshot(RuleVersion::tagged("v1"), "rev-2".to_string(), later);

        assert_eq!(snapshot.id, master.id);
        assert_eq!(snapshot.name, master.name);
        assert_eq!(snapshot.inbounds, master.inbounds);
        assert_eq!(snapshot.token, master.token);
        assert_eq!(snapshot.version, RuleVersion::tagged("v1"));
        assert_eq!(snapshot.revision, "rev-2");
        assert_eq!(snapshot.created_at, later);
        assert!(!snapshot.is_master());
    }

    #[test]
    fn test_redacted_clears_token_only() {
        let rule = sample_rule();
        let redacted = rule.redacted();
        assert!(redacted.token.is_empty());
        assert_eq!(redacted.revision, rule.revision);
    }

    #[test]
    fn test_key_display() {
        assert_eq!(RuleKey::master("abc").to_string(), "abc@master");
        assert_eq!(
            RuleKey::new("abc", RuleVersion::tagged("v2")).to_string(),
            "abc@v2"
        );
    }
}
