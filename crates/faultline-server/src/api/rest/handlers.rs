//! API endpoint handlers
//!
//! Every write endpoint takes a JSON array and answers with a batch
//! envelope; every read endpoint takes query parameters and answers with a
//! query envelope. The HTTP status follows the envelope's code.

use super::extractors::{JsonExtractor, QueryExtractor};
use super::types::*;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use faultline_sdk::{Filters, ReleaseRequest, ResultCode, RuleRequest};
use serde::Serialize;
use tracing::{debug, info};

fn envelope<B: Serialize>(code: ResultCode, body: B) -> Response {
    let status = StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(body)).into_response()
}

/// Health check endpoint
pub(super) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: state.service.repository().backend_name().to_string(),
    })
}

#[axum::debug_handler]
pub(super) async fn create_rules(
    State(state): State<AppState>,
    JsonExtractor(requests): JsonExtractor<Vec<RuleRequest>>,
) -> Response {
    info!(size = requests.len(), "create circuit breakers");
    let response = state.service.create_rules(&requests).await;
    envelope(response.code, response)
}

pub(super) async fn create_rule_versions(
    State(state): State<AppState>,
    JsonExtractor(requests): JsonExtractor<Vec<RuleRequest>>,
) -> Response {
    info!(size = requests.len(), "create circuit breaker versions");
    let response = state.service.create_rule_versions(&requests).await;
    envelope(response.code, response)
}

pub(super) async fn update_rules(
    State(state): State<AppState>,
    JsonExtractor(requests): JsonExtractor<Vec<RuleRequest>>,
) -> Response {
    info!(size = requests.len(), "update circuit breakers");
    let response = state.service.update_rules(&requests).await;
    envelope(response.code, response)
}

pub(super) async fn delete_rules(
    State(state): State<AppState>,
    JsonExtractor(requests): JsonExtractor<Vec<RuleRequest>>,
) -> Response {
    info!(size = requests.len(), "delete circuit breakers");
    let response = state.service.delete_rules(&requests).await;
    envelope(response.code, response)
}

pub(super) async fn release_rules(
    State(state): State<AppState>,
    JsonExtractor(requests): JsonExtractor<Vec<ReleaseRequest>>,
) -> Response {
    info!(size = requests.len(), "release circuit breakers");
    let response = state.service.release_rules(&requests).await;
    envelope(response.code, response)
}

pub(super) async fn unbind_rules(
    State(state): State<AppState>,
    JsonExtractor(requests): JsonExtractor<Vec<ReleaseRequest>>,
) -> Response {
    info!(size = requests.len(), "unbind circuit breakers");
    let response = state.service.unbind_rules(&requests).await;
    envelope(response.code, response)
}

pub(super) async fn get_rule(
    State(state): State<AppState>,
    QueryExtractor(filters): QueryExtractor<Filters>,
) -> Response {
    debug!(?filters, "get circuit breaker");
    let response = state.service.get_rule(&filters).await;
    envelope(response.code, response)
}

pub(super) async fn get_versions(
    State(state): State<AppState>,
    QueryExtractor(filters): QueryExtractor<Filters>,
) -> Response {
    debug!(?filters, "get circuit breaker versions");
    let response = state.service.get_versions(&filters).await;
    envelope(response.code, response)
}

pub(super) async fn get_release_history(
    State(state): State<AppState>,
    QueryExtractor(filters): QueryExtractor<Filters>,
) -> Response {
    debug!(?filters, "get circuit breaker release history");
    let response = state.service.get_release_history(&filters).await;
    envelope(response.code, response)
}

pub(super) async fn get_by_service(
    State(state): State<AppState>,
    QueryExtractor(filters): QueryExtractor<Filters>,
) -> Response {
    debug!(?filters, "get circuit breakers by service");
    let response = state.service.get_by_service(&filters).await;
    envelope(response.code, response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_status_follows_code() {
        assert_eq!(envelope(ResultCode::ExecuteSuccess, ()).status(), StatusCode::OK);
        assert_eq!(envelope(ResultCode::NoNeedUpdate, ()).status(), StatusCode::OK);
        assert_eq!(
            envelope(ResultCode::Unauthorized, ()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            envelope(ResultCode::RequestTimeout, ()).status(),
            StatusCode::REQUEST_TIMEOUT
        );
        assert_eq!(
            envelope(ResultCode::ReleaseInUse, ()).status(),
            StatusCode::CONFLICT
        );
    }
}
