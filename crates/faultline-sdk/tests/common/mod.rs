//! Common test utilities for SDK integration tests
//!
//! Every test builds its own [`Fixture`]: a fresh repository, a directory
//! seeded with a few services and a service wired to both. Rules created
//! through the fixture are purged when it drops, on every exit path.

#![allow(dead_code)]

use faultline_core::{
    CbPolicy, CbRule, DestinationSet, ErrorRateConfig, MatchString, RecoverConfig, SourceMatcher,
};
use faultline_repository::{MemoryRepository, RuleRepository};
use faultline_sdk::{
    BatchResponse, BindingKey, CircuitBreakerRule, Filters, GovernanceService,
    GovernanceServiceBuilder, InMemoryServiceDirectory, Release, ReleaseRequest, ResultCode,
    RuleRequest, ServiceRef, ServiceTarget,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const NAMESPACE: &str = "Test";
pub const SERVICES: [&str; 3] = ["TestService1", "TestService2", "TestService3"];

pub struct Fixture {
    pub service: GovernanceService,
    pub directory: InMemoryServiceDirectory,
    repository: MemoryRepository,
    created: Mutex<Vec<String>>,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_lock_timeout(Some(Duration::from_secs(5))).await
    }

    pub async fn with_lock_timeout(timeout: Option<Duration>) -> Self {
        let repository = MemoryRepository::new();
        let directory = InMemoryServiceDirectory::with_services(
            SERVICES.iter().map(|name| ServiceRef::new(*name, NAMESPACE)),
        );
        let service = GovernanceServiceBuilder::new()
            .with_repository(Arc::new(repository.clone()))
            .with_directory(Arc::new(directory.clone()))
            .with_lock_timeout(timeout)
            .build()
            .await
            .expect("build governance service");

        Self {
            service,
            directory,
            repository,
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn repository(&self) -> &MemoryRepository {
        &self.repository
    }

    /// Remember a rule id for cleanup
    pub fn track(&self, id: &str) {
        self.created.lock().unwrap().push(id.to_string());
    }

    /// Create a rule and return the stored master, token included
    pub async fn create_rule(&self, name: &str) -> CircuitBreakerRule {
        let response = self.service.create_rules(&[rule_request(name)]).await;
        assert_eq!(response.code, ResultCode::ExecuteSuccess, "{}", response.info);
        let rule = single(response);
        self.track(&rule.id);
        rule
    }

    pub async fn create_version(&self, master: &CircuitBreakerRule, version: &str) -> CircuitBreakerRule {
        let response = self
            .service
            .create_rule_versions(&[version_request(master, version)])
            .await;
        assert_eq!(response.code, ResultCode::ExecuteSuccess, "{}", response.info);
        single(response)
    }

    pub async fn release(&self, rule: &CircuitBreakerRule, service: &str) -> BatchResponse<Release> {
        self.service
            .release_rules(&[release_request(rule, service)])
            .await
    }

    pub async fn unbind(&self, rule: &CircuitBreakerRule, service: &str) -> BatchResponse<BindingKey> {
        self.service
            .unbind_rules(&[release_request(rule, service)])
            .await
    }

    pub async fn version_count(&self, id: &str) -> usize {
        let response = self.service.get_versions(&filters(&[("id", id)])).await;
        assert_eq!(response.code, ResultCode::ExecuteSuccess, "{}", response.info);
        assert_eq!(response.amount, response.size);
        response.size
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let ids = std::mem::take(&mut *self.created.lock().unwrap_or_else(|p| p.into_inner()));
        for id in ids {
            // Memory repository futures complete without a runtime
            let _ = futures::executor::block_on(self.repository.purge_rule(&id));
        }
    }
}

pub fn single<T>(response: BatchResponse<T>) -> T {
    response
        .responses
        .into_iter()
        .next()
        .and_then(|item| item.data)
        .expect("response carries data")
}

pub fn sample_policy() -> Vec<CbRule> {
    vec![CbRule {
        sources: vec![SourceMatcher {
            service: Some("*".to_string()),
            namespace: Some(NAMESPACE.to_string()),
            labels: Default::default(),
        }],
        destinations: vec![DestinationSet {
            service: Some("TestService1".to_string()),
            namespace: Some(NAMESPACE.to_string()),
            method: Some(MatchString::exact("/pay")),
            policy: CbPolicy {
                error_rate: Some(ErrorRateConfig {
                    enable: true,
                    request_volume_threshold: 10,
                    error_rate_to_open: 50,
                }),
                ..Default::default()
            },
            recover: RecoverConfig {
                sleep_window_secs: 30,
                ..Default::default()
            },
            ..Default::default()
        }],
    }]
}

pub fn rule_request(name: &str) -> RuleRequest {
    RuleRequest {
        name: Some(name.to_string()),
        namespace: Some(NAMESPACE.to_string()),
        owners: Some("polaris".to_string()),
        business: Some("polaris".to_string()),
        description: Some("circuit breaker for tests".to_string()),
        inbounds: Some(sample_policy()),
        outbounds: Some(sample_policy()),
        ..Default::default()
    }
}

pub fn version_request(master: &CircuitBreakerRule, version: &str) -> RuleRequest {
    RuleRequest::by_id(&master.id)
        .with_version(version)
        .with_token(&master.token)
}

pub fn target_request(rule: &CircuitBreakerRule) -> RuleRequest {
    RuleRequest::by_id(&rule.id)
        .with_version(rule.version.as_str())
        .with_token(&rule.token)
}

pub fn release_request(rule: &CircuitBreakerRule, service: &str) -> ReleaseRequest {
    ReleaseRequest::new(ServiceTarget::new(service, NAMESPACE), target_request(rule))
}

pub fn filters(pairs: &[(&str, &str)]) -> Filters {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

