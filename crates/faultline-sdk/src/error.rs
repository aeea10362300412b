//! Governance error types

use faultline_core::{RuleKey, ServiceRef};
use faultline_repository::RepositoryError;
use thiserror::Error;

use crate::response::ResultCode;

/// A request field failed validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, "is required")
    }
}

/// Governance error type
///
/// Every variant is detected before any durable write, so a failed
/// operation leaves state exactly as it was.
#[derive(Error, Debug)]
pub enum GovernanceError {
    /// Missing or malformed request field
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Supplied token does not match the rule's token
    #[error("Token does not match for rule {0}")]
    Unauthorized(String),

    /// Target rule or version is absent
    #[error("Circuit breaker not found: {0}")]
    NotFound(String),

    /// A live master with the same name and namespace exists
    #[error("Circuit breaker already exists: {0}")]
    AlreadyExists(String),

    /// Reserved or duplicate version string, or a master where a version is required
    #[error("Invalid circuit breaker version: {0}")]
    InvalidVersion(String),

    /// Only the master version may be edited in place
    #[error("Version {0} is not editable")]
    VersionNotEditable(RuleKey),

    /// Delete blocked by an active release binding
    #[error("Version {key} is released to {services} service(s)")]
    ReleaseInUse { key: RuleKey, services: usize },

    /// The service is not registered
    #[error("Service not found: {0}")]
    ServiceNotFound(ServiceRef),

    /// The per-rule section could not be entered before the deadline
    #[error("Timed out waiting for {0}")]
    Timeout(String),

    /// Invalid wiring or configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage failure
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl GovernanceError {
    pub fn code(&self) -> ResultCode {
        match self {
            GovernanceError::Validation(_) => ResultCode::InvalidParameter,
            GovernanceError::Unauthorized(_) => ResultCode::Unauthorized,
            GovernanceError::NotFound(_) => ResultCode::NotFoundResource,
            GovernanceError::AlreadyExists(_) => ResultCode::ExistedResource,
            GovernanceError::InvalidVersion(_) => ResultCode::InvalidRuleVersion,
            GovernanceError::VersionNotEditable(_) => ResultCode::VersionNotEditable,
            GovernanceError::ReleaseInUse { .. } => ResultCode::ReleaseInUse,
            GovernanceError::ServiceNotFound(_) => ResultCode::NotFoundService,
            GovernanceError::Timeout(_) => ResultCode::RequestTimeout,
            GovernanceError::Config(_) => ResultCode::ExecuteException,
            GovernanceError::Repository(RepositoryError::NotFound { .. }) => {
                ResultCode::NotFoundResource
            }
            GovernanceError::Repository(_) => ResultCode::ExecuteException,
        }
    }
}

/// Result type for governance operations
pub type Result<T> = std::result::Result<T, GovernanceError>;
