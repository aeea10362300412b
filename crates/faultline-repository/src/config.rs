//! Repository configuration types
//!
//! Selects the storage backend and the read cache placed in front of it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::CacheConfig;

/// Repository source type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositorySource {
    /// Process-local tables, lost on restart
    #[default]
    Memory,
    /// PostgreSQL (requires the `postgres` feature)
    Database,
}

/// Repository configuration
///
/// # Examples
///
/// ```rust
/// use faultline_repository::RepositoryConfig;
///
/// // In-memory repository (tests, single node)
/// let config = RepositoryConfig::memory();
///
/// // Database repository
/// let config = RepositoryConfig::database("postgresql://localhost/faultline");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Configuration source type
    #[serde(default)]
    pub source: RepositorySource,

    /// Database connection URL (required for Database source)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    /// Read cache in front of the backend
    #[serde(default)]
    pub cache: CacheConfig,
}

impl RepositoryConfig {
    pub fn memory() -> Self {
        Self {
            source: RepositorySource::Memory,
            database_url: None,
            cache: CacheConfig::default(),
        }
    }

    pub fn database(url: impl Into<String>) -> Self {
        Self {
            source: RepositorySource::Database,
            database_url: Some(url.into()),
            cache: CacheConfig::default(),
        }
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Validate the configuration
    ///
    /// Returns an error if required fields are missing for the selected source.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.source {
            RepositorySource::Database => match self.database_url.as_deref() {
                Some(url) if !url.trim().is_empty() => Ok(()),
                _ => Err(ConfigError::MissingField {
                    kind: "Database".to_string(),
                    field: "database_url".to_string(),
                }),
            },
            RepositorySource::Memory => Ok(()),
        }
    }
}

/// Configuration error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required field is missing for the selected source
    #[error("{kind} source requires {field} to be set")]
    MissingField { kind: String, field: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_config() {
        let config = RepositoryConfig::memory();

        assert_eq!(config.source, RepositorySource::Memory);
        assert!(config.database_url.is_none());
        assert!(config.cache.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_config() {
        let config = RepositoryConfig::database("postgresql://localhost/faultline");

        assert_eq!(config.source, RepositorySource::Database);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgresql://localhost/faultline")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_missing_database_url() {
        let config = RepositoryConfig {
            source: RepositorySource::Database,
            database_url: Some("  ".to_string()),
            cache: CacheConfig::disabled(),
        };

        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Database source requires database_url to be set"
        );
        assert!(std::error::Error::source(&err).is_none());
        assert_eq!(
            err,
            ConfigError::MissingField {
                kind: "Database".to_string(),
                field: "database_url".to_string(),
            }
        );
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: RepositoryConfig = serde_json::from_str(r#"{"source":"database","database_url":"postgres://db"}"#).unwrap();

        assert_eq!(config.source, RepositorySource::Database);
        assert_eq!(config.cache, CacheConfig::default());

        let config: RepositoryConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.source, RepositorySource::Memory);
    }
}
