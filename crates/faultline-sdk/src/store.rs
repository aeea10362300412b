//! Rule store: the versioning engine
//!
//! Owns the master row's lifecycle and the creation and deletion of frozen
//! versions. Every mutation runs inside the rule's section of the
//! [`KeyedLock`]: validate, read current state, check, write. All checks
//! happen before the single repository write, so a failed call never leaves
//! a partial change behind.

use chrono::Utc;
use faultline_core::{CircuitBreakerRule, RuleKey, RuleVersion};
use faultline_repository::{BindingIndex, RepositoryError, RuleIndex, RuleRepository};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::collaborators::TokenVerifier;
use crate::error::{GovernanceError, Result};
use crate::guard::{self, KeyedLock, Section};
use crate::request::{RuleAddress, RuleRequest};
use crate::validator::{self, RulePatch, RuleTarget};

/// Result of an update that passed every check
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Updated(CircuitBreakerRule),
    /// Nothing in the request differs from the stored master
    NoChangeNeeded(CircuitBreakerRule),
}

/// Result of a delete that passed every check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(RuleKey),
    /// There was no live row to delete
    NotPresent,
}

pub(crate) fn new_identifier() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

impl RulePatch {
    fn changes(&self, current: &CircuitBreakerRule) -> bool {
        self.owners.as_ref().is_some_and(|v| *v != current.owners)
            || self.business.as_ref().is_some_and(|v| *v != current.business)
            || self
                .description
                .as_ref()
                .is_some_and(|v| *v != current.description)
            || self.enabled.is_some_and(|v| v != current.enabled)
            || self.inbounds.as_ref().is_some_and(|v| *v != current.inbounds)
            || self.outbounds.as_ref().is_some_and(|v| *v != current.outbounds)
    }

    fn apply(self, rule: &mut CircuitBreakerRule) {
        if let Some(owners) = self.owners {
            rule.owners = owners;
        }
        if let Some(business) = self.business {
            rule.business = business;
        }
        if let Some(description) = self.description {
            rule.description = description;
        }
        if let Some(enabled) = self.enabled {
            rule.enabled = enabled;
        }
        if let Some(inbounds) = self.inbounds {
            rule.inbounds = inbounds;
        }
        if let Some(outbounds) = self.outbounds {
            rule.outbounds = outbounds;
        }
    }
}

/// Versioning engine over a [`RuleRepository`]
#[derive(Clone)]
pub struct RuleStore {
    repository: Arc<dyn RuleRepository>,
    locks: KeyedLock,
    verifier: Arc<dyn TokenVerifier>,
    lock_timeout: Option<Duration>,
}

impl RuleStore {
    pub fn new(repository: Arc<dyn RuleRepository>, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            repository,
            locks: KeyedLock::new(),
            verifier,
            lock_timeout: None,
        }
    }

    /// Give up entering a rule's section after `timeout`
    pub fn with_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn repository(&self) -> &Arc<dyn RuleRepository> {
        &self.repository
    }

    pub fn locks(&self) -> &KeyedLock {
        &self.locks
    }

    pub(crate) async fn enter_rule(&self, id: &str) -> Result<Section> {
        self.locks
            .acquire(guard::rule_key(id), self.lock_timeout)
            .await
    }

    /// Check a supplied token against a stored row
    pub(crate) fn authorize(&self, rule: &CircuitBreakerRule, token: &str) -> Result<()> {
        if self.verifier.matches(&rule.token, token) {
            Ok(())
        } else {
            warn!(rule = %rule.key(), "token mismatch");
            Err(GovernanceError::Unauthorized(rule.id.clone()))
        }
    }

    /// Map an address to a rule id
    ///
    /// By name, the live master's id wins. Without a live master, a
    /// non-master `version` falls back to the newest rule id that has a
    /// live row of that version under the name.
    pub async fn resolve_id(
        &self,
        address: &RuleAddress,
        version: &RuleVersion,
    ) -> Result<Option<String>> {
        let (name, namespace) = match address {
            RuleAddress::Id(id) => return Ok(Some(id.clone())),
            RuleAddress::Name { name, namespace } => (name, namespace),
        };

        let rows = self
            .repository
            .list_by_index(&RuleIndex::by_name(name.clone(), namespace.clone()))
            .await?;
        if version.is_master() {
            return Ok(rows.iter().find(|row| row.is_master()).map(|row| row.id.clone()));
        }
        Ok(pick_rule_id(&rows, |row| &row.version == version))
    }

    pub async fn get_master(&self, id: &str) -> Result<Option<CircuitBreakerRule>> {
        Ok(self.repository.get(&RuleKey::master(id)).await?)
    }

    pub async fn get_version(&self, key: &RuleKey) -> Result<Option<CircuitBreakerRule>> {
        Ok(self.repository.get(key).await?)
    }

    /// Every live non-master row of a rule, oldest first
    pub async fn list_versions(&self, id: &str) -> Result<Vec<CircuitBreakerRule>> {
        let rows = self
            .repository
            .list_by_index(&RuleIndex::ById(id.to_string()))
            .await?;
        Ok(rows.into_iter().filter(|row| !row.is_master()).collect())
    }

    /// Create a new rule with a master row
    ///
    /// Fails with `AlreadyExists` if a live master holds the name. A fresh
    /// id, token and revision are issued; the full row, token included, is
    /// returned.
    pub async fn create_rule(&self, request: &RuleRequest) -> Result<CircuitBreakerRule> {
        let draft = validator::validate_create(request)?;
        let _section = self
            .locks
            .acquire(guard::name_key(&draft.name, &draft.namespace), self.lock_timeout)
            .await?;

        let label = format!("{}/{}", draft.namespace, draft.name);
        let now = Utc::now();
        let rule = CircuitBreakerRule {
            id: new_identifier(),
            version: RuleVersion::Master,
            name: draft.name,
            namespace: draft.namespace,
            inbounds: draft.inbounds,
            outbounds: draft.outbounds,
            business: draft.business,
            owners: draft.owners,
            description: draft.description,
            enabled: draft.enabled,
            token: new_identifier(),
            revision: new_identifier(),
            created_at: now,
            modified_at: now,
            deleted: false,
        };

        match self.repository.put_if_absent(rule).await {
            Ok(created) => {
                info!(rule = %created.key(), name = %created.name, namespace = %created.namespace, "created circuit breaker");
                Ok(created)
            }
            Err(RepositoryError::Conflict(reason)) => {
                warn!(%reason, "create rejected");
                Err(GovernanceError::AlreadyExists(label))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Freeze the current master content into a new version row
    pub async fn create_version(&self, request: &RuleRequest) -> Result<CircuitBreakerRule> {
        let RuleTarget {
            address,
            version,
            token,
        } = validator::validate_create_version(request)?;
        if version.is_master() {
            return Err(GovernanceError::InvalidVersion(
                "master is reserved for the editable head".to_string(),
            ));
        }

        let id = self
            .resolve_id(&address, &RuleVersion::Master)
            .await?
            .ok_or_else(|| GovernanceError::NotFound(address.to_string()))?;
        let _section = self.enter_rule(&id).await?;

        let master = self
            .get_master(&id)
            .await?
            .ok_or_else(|| GovernanceError::NotFound(address.to_string()))?;
        self.authorize(&master, &token)?;

        let snapshot = master.snapshot(version, new_identifier(), Utc::now());
        match self.repository.put_if_absent(snapshot).await {
            Ok(created) => {
                info!(rule = %created.key(), "created circuit breaker version");
                Ok(created)
            }
            Err(RepositoryError::Conflict(reason)) => {
                warn!(%reason, "version rejected");
                Err(GovernanceError::InvalidVersion(reason))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Apply a patch to the master row
    pub async fn update_rule(&self, request: &RuleRequest) -> Result<UpdateOutcome> {
        let update = validator::validate_update(request)?;
        let RuleTarget {
            address,
            version,
            token,
        } = update.target;

        let id = self
            .resolve_id(&address, &RuleVersion::Master)
            .await?
            .ok_or_else(|| GovernanceError::NotFound(address.to_string()))?;
        if !version.is_master() {
            return Err(GovernanceError::VersionNotEditable(RuleKey::new(id, version)));
        }
        let _section = self.enter_rule(&id).await?;

        let master = self
            .get_master(&id)
            .await?
            .ok_or_else(|| GovernanceError::NotFound(address.to_string()))?;
        self.authorize(&master, &token)?;

        let patch = update.patch;
        if !patch.changes(&master) {
            debug!(rule = %master.key(), "update carries no changes");
            return Ok(UpdateOutcome::NoChangeNeeded(master));
        }

        let revision = new_identifier();
        let updated = self
            .repository
            .update(
                &master.key(),
                Box::new(move |row: &mut CircuitBreakerRule| {
                    patch.apply(row);
                    row.revision = revision;
                    row.modified_at = Utc::now();
                }),
            )
            .await?;
        info!(rule = %updated.key(), revision = %updated.revision, "updated circuit breaker");
        Ok(UpdateOutcome::Updated(updated))
    }

    /// Soft-delete one row; the version defaults to master
    ///
    /// Deleting the master leaves every version and its bindings in place.
    /// A version that is bound to any service cannot be deleted.
    pub async fn delete_rule(&self, request: &RuleRequest) -> Result<DeleteOutcome> {
        let RuleTarget {
            address,
            version,
            token,
        } = validator::validate_target(request)?;

        let Some(id) = self.resolve_id(&address, &version).await? else {
            debug!(address = %address, "delete of absent rule");
            return Ok(DeleteOutcome::NotPresent);
        };
        let _section = self.enter_rule(&id).await?;

        let key = RuleKey::new(id, version);
        let Some(row) = self.repository.get(&key).await? else {
            debug!(rule = %key, "delete of absent row");
            return Ok(DeleteOutcome::NotPresent);
        };
        self.authorize(&row, &token)?;

        if !key.version.is_master() {
            let bindings = self
                .repository
                .list_bindings(&BindingIndex::ByVersion(key.clone()))
                .await?;
            if !bindings.is_empty() {
                warn!(rule = %key, services = bindings.len(), "delete rejected, version is released");
                return Err(GovernanceError::ReleaseInUse {
                    key,
                    services: bindings.len(),
                });
            }
        }

        if self.repository.soft_delete(&key).await? {
            info!(rule = %key, "deleted circuit breaker");
            Ok(DeleteOutcome::Deleted(key))
        } else {
            Ok(DeleteOutcome::NotPresent)
        }
    }
}

/// Pick the rule a name refers to from the live rows holding it
///
/// The live master's id wins; otherwise the newest row accepted by
/// `fallback` decides. Rows are expected oldest first.
pub(crate) fn pick_rule_id(
    rows: &[CircuitBreakerRule],
    fallback: impl Fn(&CircuitBreakerRule) -> bool,
) -> Option<String> {
    rows.iter()
        .find(|row| row.is_master())
        .or_else(|| rows.iter().rev().find(|row| fallback(row)))
        .map(|row| row.id.clone())
}
