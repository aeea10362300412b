//! Router creation and configuration

use super::handlers::*;
use super::types::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use faultline_sdk::GovernanceService;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create REST API router
pub fn create_router(service: GovernanceService) -> Router {
    let state = AppState { service };

    Router::new()
        .route("/health", get(health))
        .route("/v1/circuitbreakers", post(create_rules).put(update_rules))
        .route("/v1/circuitbreakers/version", post(create_rule_versions))
        .route("/v1/circuitbreakers/delete", post(delete_rules))
        .route(
            "/v1/circuitbreakers/release",
            post(release_rules).get(get_release_history),
        )
        .route("/v1/circuitbreakers/unbind", post(unbind_rules))
        .route("/v1/circuitbreaker", get(get_rule))
        .route("/v1/circuitbreaker/versions", get(get_versions))
        .route("/v1/service/circuitbreaker", get(get_by_service))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
