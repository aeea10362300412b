//! GovernanceService facade
//!
//! Batch entry points over the store, release manager and query service.
//! Items of a batch are processed in order; one item failing does not stop
//! the rest. Batch-level checks (empty, over the size limit) reject the
//! whole batch before any item runs.

use faultline_core::{BindingKey, CircuitBreakerRule, Release, RuleKey, RuleWithServices, ServiceRef};
use faultline_repository::RuleRepository;
use std::sync::Arc;
use tracing::debug;

use crate::config::GovernanceConfig;
use crate::error::{GovernanceError, Result};
use crate::query::{Filters, QueryService, ReleasedRule};
use crate::release::{ReleaseManager, ReleaseOutcome, UnbindOutcome};
use crate::request::{ReleaseRequest, RuleRequest};
use crate::response::{ApiResponse, BatchResponse, QueryResponse, ResultCode};
use crate::store::{DeleteOutcome, RuleStore, UpdateOutcome};

fn respond<T>(result: Result<T>) -> ApiResponse<T> {
    match result {
        Ok(data) => ApiResponse::success(data),
        Err(err) => ApiResponse::error(err.code(), err.to_string()),
    }
}

fn respond_query<T>(result: Result<QueryResponse<T>>) -> QueryResponse<T> {
    result.unwrap_or_else(|err| QueryResponse::error(err.code(), err.to_string()))
}

impl From<UpdateOutcome> for ApiResponse<CircuitBreakerRule> {
    fn from(outcome: UpdateOutcome) -> Self {
        match outcome {
            UpdateOutcome::Updated(rule) => ApiResponse::success(rule),
            UpdateOutcome::NoChangeNeeded(rule) => {
                ApiResponse::new(ResultCode::NoNeedUpdate, Some(rule))
            }
        }
    }
}

/// Governance API over one repository
#[derive(Clone)]
pub struct GovernanceService {
    store: RuleStore,
    releases: ReleaseManager,
    queries: QueryService,
    config: GovernanceConfig,
}

impl GovernanceService {
    pub fn new(
        store: RuleStore,
        releases: ReleaseManager,
        queries: QueryService,
        config: GovernanceConfig,
    ) -> Self {
        Self {
            store,
            releases,
            queries,
            config,
        }
    }

    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    pub fn releases(&self) -> &ReleaseManager {
        &self.releases
    }

    pub fn queries(&self) -> &QueryService {
        &self.queries
    }

    pub fn repository(&self) -> &Arc<dyn RuleRepository> {
        self.store.repository()
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    fn check_batch<T>(&self, len: usize) -> Option<BatchResponse<T>> {
        if len == 0 {
            return Some(BatchResponse::rejected(
                ResultCode::EmptyRequest,
                "batch is empty",
            ));
        }
        if len > self.config.max_batch_size {
            debug!(len, max = self.config.max_batch_size, "batch rejected");
            return Some(BatchResponse::rejected(
                ResultCode::BatchSizeOverLimit,
                format!("batch of {} exceeds the limit of {}", len, self.config.max_batch_size),
            ));
        }
        None
    }

    pub async fn create_rules(&self, requests: &[RuleRequest]) -> BatchResponse<CircuitBreakerRule> {
        if let Some(rejected) = self.check_batch(requests.len()) {
            return rejected;
        }
        let mut responses = Vec::with_capacity(requests.len());
        for request in requests {
            responses.push(respond(self.store.create_rule(request).await));
        }
        BatchResponse::from_items(responses)
    }

    pub async fn create_rule_versions(
        &self,
        requests: &[RuleRequest],
    ) -> BatchResponse<CircuitBreakerRule> {
        if let Some(rejected) = self.check_batch(requests.len()) {
            return rejected;
        }
        let mut responses = Vec::with_capacity(requests.len());
        for request in requests {
            responses.push(respond(self.store.create_version(request).await));
        }
        BatchResponse::from_items(responses)
    }

    pub async fn update_rules(&self, requests: &[RuleRequest]) -> BatchResponse<CircuitBreakerRule> {
        if let Some(rejected) = self.check_batch(requests.len()) {
            return rejected;
        }
        let mut responses = Vec::with_capacity(requests.len());
        for request in requests {
            responses.push(match self.store.update_rule(request).await {
                Ok(outcome) => outcome.into(),
                Err(err) => ApiResponse::error(err.code(), err.to_string()),
            });
        }
        BatchResponse::from_items(responses)
    }

    /// Deleted rows answer with their key; absent rows succeed without data
    pub async fn delete_rules(&self, requests: &[RuleRequest]) -> BatchResponse<RuleKey> {
        if let Some(rejected) = self.check_batch(requests.len()) {
            return rejected;
        }
        let mut responses = Vec::with_capacity(requests.len());
        for request in requests {
            responses.push(match self.store.delete_rule(request).await {
                Ok(DeleteOutcome::Deleted(key)) => ApiResponse::success(key),
                Ok(DeleteOutcome::NotPresent) => ApiResponse::new(ResultCode::ExecuteSuccess, None),
                Err(err) => ApiResponse::error(err.code(), err.to_string()),
            });
        }
        BatchResponse::from_items(responses)
    }

    pub async fn release_rules(&self, requests: &[ReleaseRequest]) -> BatchResponse<Release> {
        if let Some(rejected) = self.check_batch(requests.len()) {
            return rejected;
        }
        let mut responses = Vec::with_capacity(requests.len());
        for request in requests {
            responses.push(match self.releases.release(request).await {
                Ok(ReleaseOutcome::Released(release)) => ApiResponse::success(release),
                Ok(ReleaseOutcome::AlreadyReleased(_)) => {
                    ApiResponse::new(ResultCode::ExecuteSuccess, None)
                }
                Err(err) => ApiResponse::error(err.code(), err.to_string()),
            });
        }
        BatchResponse::from_items(responses)
    }

    pub async fn unbind_rules(&self, requests: &[ReleaseRequest]) -> BatchResponse<BindingKey> {
        if let Some(rejected) = self.check_batch(requests.len()) {
            return rejected;
        }
        let mut responses = Vec::with_capacity(requests.len());
        for request in requests {
            responses.push(respond(self.releases.unbind(request).await.map(
                |outcome| match outcome {
                    UnbindOutcome::Unbound(key) | UnbindOutcome::NotBound(key) => key,
                },
            )));
        }
        BatchResponse::from_items(responses)
    }

    pub async fn get_versions(&self, filters: &Filters) -> QueryResponse<RuleWithServices> {
        respond_query(self.queries.get_versions(filters).await)
    }

    pub async fn get_release_history(&self, filters: &Filters) -> QueryResponse<ReleasedRule> {
        respond_query(self.queries.get_release_history(filters).await)
    }

    pub async fn get_rule(&self, filters: &Filters) -> QueryResponse<CircuitBreakerRule> {
        respond_query(self.queries.get_by_id_and_version(filters).await)
    }

    pub async fn get_by_service(&self, filters: &Filters) -> QueryResponse<ReleasedRule> {
        respond_query(self.queries.get_by_service(filters).await)
    }

    /// Versions bound to a service, for data-plane lookups
    pub async fn resolve_for_service(&self, service: &ServiceRef) -> Result<Vec<RuleKey>> {
        self.releases.resolve_for_service(service).await
    }

    /// Hard-remove a rule; administrative cleanup only
    pub async fn purge_rule(&self, id: &str) -> Result<()> {
        self.repository()
            .purge_rule(id)
            .await
            .map_err(GovernanceError::from)
    }
}
