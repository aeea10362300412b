//! Builder pattern for GovernanceService

use faultline_repository::{
    CachedRepository, MemoryRepository, RepositoryConfig, RepositorySource, RuleRepository,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::collaborators::{ExactTokenVerifier, InMemoryServiceDirectory, ServiceDirectory, TokenVerifier};
use crate::config::GovernanceConfig;
use crate::error::{GovernanceError, Result};
use crate::query::QueryService;
use crate::release::ReleaseManager;
use crate::service::GovernanceService;
use crate::store::RuleStore;

/// Builder for GovernanceService
///
/// # Example
///
/// ```rust,ignore
/// use faultline_sdk::{GovernanceServiceBuilder, InMemoryServiceDirectory, RepositoryConfig};
///
/// // In-memory, with a read cache
/// let service = GovernanceServiceBuilder::new()
///     .with_repository_config(RepositoryConfig::memory())
///     .with_directory(Arc::new(InMemoryServiceDirectory::new()))
///     .build()
///     .await?;
///
/// // PostgreSQL (requires the `postgres` feature)
/// let service = GovernanceServiceBuilder::new()
///     .with_repository_config(RepositoryConfig::database("postgresql://localhost/faultline"))
///     .build()
///     .await?;
/// ```
#[derive(Default)]
pub struct GovernanceServiceBuilder {
    config: GovernanceConfig,
    repository: Option<Arc<dyn RuleRepository>>,
    repository_config: Option<RepositoryConfig>,
    directory: Option<Arc<dyn ServiceDirectory>>,
    verifier: Option<Arc<dyn TokenVerifier>>,
}

impl GovernanceServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an already constructed repository, as is
    pub fn with_repository(mut self, repository: Arc<dyn RuleRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Construct the repository (and its cache) from configuration
    pub fn with_repository_config(mut self, config: RepositoryConfig) -> Self {
        self.repository_config = Some(config);
        self
    }

    pub fn with_directory(mut self, directory: Arc<dyn ServiceDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn with_token_verifier(mut self, verifier: Arc<dyn TokenVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn with_config(mut self, config: GovernanceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config = self.config.with_lock_timeout(timeout);
        self
    }

    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.config = self.config.with_max_batch_size(size);
        self
    }

    async fn open_repository(config: RepositoryConfig) -> Result<Arc<dyn RuleRepository>> {
        config
            .validate()
            .map_err(|e| GovernanceError::Config(e.to_string()))?;

        match config.source {
            RepositorySource::Memory => Ok(Self::wrap_cache(MemoryRepository::new(), &config)),
            #[cfg(feature = "postgres")]
            RepositorySource::Database => {
                let url = config.database_url.clone().unwrap_or_default();
                let repository = faultline_repository::PostgresRepository::new(&url).await?;
                Ok(Self::wrap_cache(repository, &config))
            }
            #[cfg(not(feature = "postgres"))]
            RepositorySource::Database => Err(GovernanceError::Config(
                "database repository requires the `postgres` feature".to_string(),
            )),
        }
    }

    fn wrap_cache<R: RuleRepository + 'static>(
        repository: R,
        config: &RepositoryConfig,
    ) -> Arc<dyn RuleRepository> {
        if config.cache.enabled {
            Arc::new(CachedRepository::with_config(repository, config.cache.clone()))
        } else {
            Arc::new(repository)
        }
    }

    /// Build the service
    pub async fn build(self) -> Result<GovernanceService> {
        let repository = match self.repository {
            Some(repository) => repository,
            None => Self::open_repository(self.repository_config.unwrap_or_default()).await?,
        };
        let directory = self
            .directory
            .unwrap_or_else(|| Arc::new(InMemoryServiceDirectory::new()));
        let verifier = self
            .verifier
            .unwrap_or_else(|| Arc::new(ExactTokenVerifier));

        info!(
            backend = repository.backend_name(),
            lock_timeout_ms = ?self.config.lock_timeout_ms,
            max_batch_size = self.config.max_batch_size,
            "building governance service"
        );

        let store = RuleStore::new(Arc::clone(&repository), verifier)
            .with_lock_timeout(self.config.lock_timeout());
        let releases = ReleaseManager::new(store.clone(), directory);
        let queries = QueryService::new(repository);

        Ok(GovernanceService::new(store, releases, queries, self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_repository::CacheConfig;

    #[tokio::test]
    async fn test_build_defaults_to_cached_memory() {
        let service = GovernanceServiceBuilder::new().build().await.unwrap();
        assert_eq!(service.repository().backend_name(), "memory");
        assert_eq!(service.config().max_batch_size, 100);
    }

    #[tokio::test]
    async fn test_build_without_cache() {
        let config = RepositoryConfig::memory().with_cache(CacheConfig::disabled());
        let service = GovernanceServiceBuilder::new()
            .with_repository_config(config)
            .with_max_batch_size(5)
            .with_lock_timeout(None)
            .build()
            .await
            .unwrap();
        assert_eq!(service.config().max_batch_size, 5);
        assert_eq!(service.config().lock_timeout(), None);
    }

    #[cfg(not(feature = "postgres"))]
    #[tokio::test]
    async fn test_database_requires_feature() {
        let result = GovernanceServiceBuilder::new()
            .with_repository_config(RepositoryConfig::database("postgresql://localhost/x"))
            .build()
            .await;
        assert!(matches!(result, Err(GovernanceError::Config(_))));
    }
}
