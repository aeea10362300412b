//! Rule version tags

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved version string of the editable head of a rule
pub const MASTER_VERSION: &str = "master";

/// Version tag of a rule row
///
/// A rule is stored as one master row plus any number of immutable
/// snapshots. Both live in the same table and share the rule id; this tag
/// is what tells them apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RuleVersion {
    /// The mutable head (`"master"`)
    Master,
    /// An immutable snapshot stamped with a caller-chosen tag
    Tagged(String),
}

impl RuleVersion {
    /// Parse a version string supplied by a caller
    ///
    /// Returns `None` for an empty (or all-whitespace) string so that each
    /// operation can decide its own default.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            None
        } else if raw == MASTER_VERSION {
            Some(Self::Master)
        } else {
            Some(Self::Tagged(raw.to_string()))
        }
    }

    /// Parse an optional version string, falling back to master
    pub fn parse_or_master(raw: Option<&str>) -> Self {
        raw.and_then(Self::parse).unwrap_or(Self::Master)
    }

    pub fn tagged(tag: impl Into<String>) -> Self {
        Self::from(tag.into())
    }

    pub fn is_master(&self) -> bool {
        matches!(self, Self::Master)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Master => MASTER_VERSION,
            Self::Tagged(tag) => tag,
        }
    }
}

impl Default for RuleVersion {
    fn default() -> Self {
        Self::Master
    }
}

impl From<String> for RuleVersion {
    fn from(raw: String) -> Self {
        if raw == MASTER_VERSION {
            Self::Master
        } else {
            Self::Tagged(raw)
        }
    }
}

impl From<&str> for RuleVersion {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<RuleVersion> for String {
    fn from(version: RuleVersion) -> Self {
        match version {
            RuleVersion::Master => MASTER_VERSION.to_string(),
            RuleVersion::Tagged(tag) => tag,
        }
    }
}

impl fmt::Display for RuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
