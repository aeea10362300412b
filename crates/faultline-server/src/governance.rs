//! Governance service initialization
//!
//! Turns the server configuration into a ready [`GovernanceService`]: opens
//! the configured repository and seeds the service directory.

use crate::config::ServerConfig;
use anyhow::Result;
use faultline_sdk::{GovernanceService, GovernanceServiceBuilder, InMemoryServiceDirectory};
use std::sync::Arc;
use tracing::info;

/// Initialize the governance service and the directory it checks services against
pub async fn init_service(
    config: &ServerConfig,
) -> Result<(GovernanceService, InMemoryServiceDirectory)> {
    let directory = InMemoryServiceDirectory::with_services(config.services.iter().cloned());
    info!(services = directory.len(), "service directory seeded");

    let service = GovernanceServiceBuilder::new()
        .with_repository_config(config.repository.clone())
        .with_config(config.governance.clone())
        .with_directory(Arc::new(directory.clone()))
        .build()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to build governance service: {}", e))?;

    Ok((service, directory))
}
