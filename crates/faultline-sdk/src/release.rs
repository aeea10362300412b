//! Release manager: binds frozen versions to services

use chrono::Utc;
use faultline_core::{BindingKey, Release, RuleKey, ServiceRef};
use faultline_repository::BindingIndex;
use std::sync::Arc;
use tracing::{debug, info};

use crate::collaborators::ServiceDirectory;
use crate::error::{GovernanceError, Result};
use crate::request::ReleaseRequest;
use crate::store::RuleStore;
use crate::validator::{self, RuleTarget};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released(Release),
    /// The version was already bound to the service
    AlreadyReleased(BindingKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnbindOutcome {
    Unbound(BindingKey),
    /// There was no binding to remove
    NotBound(BindingKey),
}

/// Binds and unbinds rule versions; the master is never bindable
#[derive(Clone)]
pub struct ReleaseManager {
    store: RuleStore,
    directory: Arc<dyn ServiceDirectory>,
}

impl ReleaseManager {
    pub fn new(store: RuleStore, directory: Arc<dyn ServiceDirectory>) -> Self {
        Self { store, directory }
    }

    /// Bind a version to a service
    ///
    /// The version must be a live non-master row and the service must exist
    /// in the directory. Binding an already bound pair succeeds without
    /// writing.
    pub async fn release(&self, request: &ReleaseRequest) -> Result<ReleaseOutcome> {
        let RuleTarget {
            address,
            version,
            token,
        } = validator::validate_target(&request.circuit_breaker)?;
        let service = validator::validate_service(&request.service)?;
        if version.is_master() {
            return Err(GovernanceError::InvalidVersion(
                "the master version cannot be released".to_string(),
            ));
        }

        let id = self
            .store
            .resolve_id(&address, &version)
            .await?
            .ok_or_else(|| GovernanceError::NotFound(address.to_string()))?;
        let _section = self.store.enter_rule(&id).await?;

        let key = RuleKey::new(id, version);
        let row = self
            .store
            .get_version(&key)
            .await?
            .ok_or_else(|| GovernanceError::NotFound(key.to_string()))?;
        self.store.authorize(&row, &token)?;

        if !self.directory.exists(&service).await {
            return Err(GovernanceError::ServiceNotFound(service));
        }

        let release = Release::new(key, service, Utc::now());
        if self
            .store
            .repository()
            .put_binding_if_absent(release.clone())
            .await?
        {
            info!(rule = %release.rule, service = %release.service, "released circuit breaker");
            Ok(ReleaseOutcome::Released(release))
        } else {
            debug!(rule = %release.rule, service = %release.service, "already released");
            Ok(ReleaseOutcome::AlreadyReleased(release.key()))
        }
    }

    /// Remove a binding
    ///
    /// The service and the version must exist; the master is never bound,
    /// so naming it is a not-found error. Removing a missing binding
    /// succeeds.
    pub async fn unbind(&self, request: &ReleaseRequest) -> Result<UnbindOutcome> {
        let RuleTarget {
            address,
            version,
            token,
        } = validator::validate_target(&request.circuit_breaker)?;
        let service = validator::validate_service(&request.service)?;
        if version.is_master() {
            return Err(GovernanceError::NotFound(
                "the master version is never released".to_string(),
            ));
        }
        if !self.directory.exists(&service).await {
            return Err(GovernanceError::ServiceNotFound(service));
        }

        let id = self
            .store
            .resolve_id(&address, &version)
            .await?
            .ok_or_else(|| GovernanceError::NotFound(address.to_string()))?;
        let _section = self.store.enter_rule(&id).await?;

        let key = RuleKey::new(id, version);
        let row = self
            .store
            .get_version(&key)
            .await?
            .ok_or_else(|| GovernanceError::NotFound(key.to_string()))?;
        self.store.authorize(&row, &token)?;

        let binding = BindingKey { rule: key, service };
        if self.store.repository().remove_binding(&binding).await? {
            info!(rule = %binding.rule, service = %binding.service, "unbound circuit breaker");
            Ok(UnbindOutcome::Unbound(binding))
        } else {
            Ok(UnbindOutcome::NotBound(binding))
        }
    }

    /// Every version currently bound to a service; empty when none is
    pub async fn resolve_for_service(&self, service: &ServiceRef) -> Result<Vec<RuleKey>> {
        let bindings = self
            .store
            .repository()
            .list_bindings(&BindingIndex::ByService(service.clone()))
            .await?;
        Ok(bindings.into_iter().map(|release| release.rule).collect())
    }
}
