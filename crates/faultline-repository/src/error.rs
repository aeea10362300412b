//! Error types for the repository layer

use faultline_core::RuleKey;
use thiserror::Error;

/// Result type alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors that can occur during repository operations
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// No live row exists for the key
    #[error("Rule not found: {key}")]
    NotFound { key: RuleKey },

    /// An insert collided with a live row
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database error (when database feature is enabled)
    #[cfg(feature = "postgres")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Row content could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An in-memory table lock was poisoned by a panicking writer
    #[error("Storage lock poisoned: {0}")]
    Poisoned(&'static str),

    /// Generic error
    #[error("Repository error: {0}")]
    Other(#[from] anyhow::Error),
}

impl RepositoryError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, RepositoryError::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound { .. })
    }
}
