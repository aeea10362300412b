//! Read-side queries
//!
//! Queries bypass the keyed lock and read the repository directly; they see
//! the state before or after a concurrent write, never a partial one. Rows
//! are always returned redacted. A rule or service with nothing to show is
//! an empty page, not an error.

use chrono::{DateTime, Utc};
use faultline_core::{
    CircuitBreakerRule, Release, RuleKey, RuleVersion, RuleWithServices, ServiceRef,
};
use faultline_repository::{BindingIndex, RuleIndex, RuleRepository};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::{Result, ValidationError};
use crate::response::QueryResponse;
use crate::store::pick_rule_id;

/// Query parameters, e.g. `{"id": ..., "version": ...}`
pub type Filters = HashMap<String, String>;

/// One binding joined with the version it releases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleasedRule {
    pub service: ServiceRef,
    pub rule: CircuitBreakerRule,
    pub released_at: DateTime<Utc>,
}

fn required<'a>(filters: &'a Filters, key: &str) -> std::result::Result<&'a str, ValidationError> {
    filters
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ValidationError::missing(key))
}

fn optional<'a>(filters: &'a Filters, key: &str) -> Option<&'a str> {
    filters
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn parse_usize(filters: &Filters, key: &str) -> std::result::Result<Option<usize>, ValidationError> {
    optional(filters, key)
        .map(|raw| {
            raw.parse::<usize>()
                .map_err(|_| ValidationError::new(key, "must be a non-negative integer"))
        })
        .transpose()
}

/// Cut the `offset`/`limit` window out of a full result
fn paginate<T>(filters: &Filters, items: Vec<T>) -> Result<QueryResponse<T>> {
    let offset = parse_usize(filters, "offset")?.unwrap_or(0);
    let limit = parse_usize(filters, "limit")?;

    let amount = items.len();
    let page: Vec<T> = items
        .into_iter()
        .skip(offset)
        .take(limit.unwrap_or(usize::MAX))
        .collect();
    Ok(QueryResponse::page(amount, page))
}

#[derive(Clone)]
pub struct QueryService {
    repository: Arc<dyn RuleRepository>,
}

impl QueryService {
    pub fn new(repository: Arc<dyn RuleRepository>) -> Self {
        Self { repository }
    }

    /// Every live non-master version of a rule with the services it is released to
    ///
    /// Requires `id`, or `name` and `namespace`. A name resolves to one rule
    /// the same way writes do: the live master's id, else the newest rule
    /// still holding a version under that name.
    pub async fn get_versions(&self, filters: &Filters) -> Result<QueryResponse<RuleWithServices>> {
        let id = match optional(filters, "id") {
            Some(id) => Some(id.to_string()),
            None => {
                let named = RuleIndex::by_name(required(filters, "name")?, required(filters, "namespace")?);
                let rows = self.repository.list_by_index(&named).await?;
                pick_rule_id(&rows, |row| !row.is_master())
            }
        };
        let Some(id) = id else {
            return paginate(filters, Vec::new());
        };

        let rows = self
            .repository
            .list_by_index(&RuleIndex::ById(id.clone()))
            .await?;
        let mut services: BTreeMap<RuleKey, Vec<ServiceRef>> = BTreeMap::new();
        for release in self.repository.list_bindings(&BindingIndex::ByRule(id)).await? {
            services.entry(release.rule).or_default().push(release.service);
        }

        let items = rows
            .iter()
            .filter(|row| !row.is_master())
            .map(|row| RuleWithServices {
                rule: row.redacted(),
                services: services.remove(&row.key()).unwrap_or_default(),
            })
            .collect();
        paginate(filters, items)
    }

    /// One item per binding of a rule, optionally narrowed to one `version`
    pub async fn get_release_history(&self, filters: &Filters) -> Result<QueryResponse<ReleasedRule>> {
        let id = required(filters, "id")?;
        let index = match optional(filters, "version").and_then(RuleVersion::parse) {
            Some(version) => BindingIndex::ByVersion(RuleKey::new(id, version)),
            None => BindingIndex::ByRule(id.to_string()),
        };

        let releases = self.repository.list_bindings(&index).await?;
        let items = self.join_rows(releases).await?;
        paginate(filters, items)
    }

    /// The single row addressed by `id` and `version`
    pub async fn get_by_id_and_version(
        &self,
        filters: &Filters,
    ) -> Result<QueryResponse<CircuitBreakerRule>> {
        let id = required(filters, "id")?;
        let version = RuleVersion::from(required(filters, "version")?);

        let items = self
            .repository
            .get(&RuleKey::new(id, version))
            .await?
            .map(|row| vec![row.redacted()])
            .unwrap_or_default();
        paginate(filters, items)
    }

    /// Every version released to the service named by `service` and `namespace`
    pub async fn get_by_service(&self, filters: &Filters) -> Result<QueryResponse<ReleasedRule>> {
        let service = ServiceRef::new(required(filters, "service")?, required(filters, "namespace")?);

        let releases = self
            .repository
            .list_bindings(&BindingIndex::ByService(service))
            .await?;
        let items = self.join_rows(releases).await?;
        paginate(filters, items)
    }

    async fn join_rows(&self, releases: Vec<Release>) -> Result<Vec<ReleasedRule>> {
        let mut items = Vec::with_capacity(releases.len());
        for release in releases {
            if let Some(row) = self.repository.get(&release.rule).await? {
                items.push(ReleasedRule {
                    service: release.service,
                    rule: row.redacted(),
                    released_at: release.created_at,
                });
            }
        }
        Ok(items)
    }
}
