//! REST API type definitions

use faultline_sdk::GovernanceService;
use serde::{Deserialize, Serialize};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub service: GovernanceService,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub backend: String,
}
