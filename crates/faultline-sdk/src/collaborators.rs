//! External collaborators: the service registry and the token check

use async_trait::async_trait;
use dashmap::DashSet;
use faultline_core::ServiceRef;
use std::sync::Arc;

/// Registry of services a rule version can be released to
#[async_trait]
pub trait ServiceDirectory: Send + Sync {
    async fn exists(&self, service: &ServiceRef) -> bool;
}

/// Service directory backed by a concurrent set
#[derive(Debug, Clone, Default)]
pub struct InMemoryServiceDirectory {
    services: Arc<DashSet<ServiceRef>>,
}

impl InMemoryServiceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_services(services: impl IntoIterator<Item = ServiceRef>) -> Self {
        let directory = Self::new();
        for service in services {
            directory.register(service);
        }
        directory
    }

    /// Returns `false` if the service was already registered
    pub fn register(&self, service: ServiceRef) -> bool {
        self.services.insert(service)
    }

    pub fn deregister(&self, service: &ServiceRef) -> bool {
        self.services.remove(service).is_some()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[async_trait]
impl ServiceDirectory for InMemoryServiceDirectory {
    async fn exists(&self, service: &ServiceRef) -> bool {
        self.services.contains(service)
    }
}

/// Decides whether a supplied token authorizes a mutation
pub trait TokenVerifier: Send + Sync {
    fn matches(&self, stored: &str, supplied: &str) -> bool;
}

/// Byte-for-byte comparison in constant time for equal lengths
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactTokenVerifier;

impl TokenVerifier for ExactTokenVerifier {
    fn matches(&self, stored: &str, supplied: &str) -> bool {
        let (stored, supplied) = (stored.as_bytes(), supplied.as_bytes());
        if stored.len() != supplied.len() {
            return false;
        }
        stored
            .iter()
            .zip(supplied)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
    }
}
