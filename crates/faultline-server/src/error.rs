//! Server error types
//!
//! Governance failures never reach this type: the SDK already folds them
//! into response envelopes. `ServerError` covers what goes wrong before a
//! request reaches the SDK, answered with the same envelope shape.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use faultline_sdk::ResultCode;
use serde_json::json;
use thiserror::Error;

/// Transport-level error
#[derive(Debug, Error)]
pub enum ServerError {
    /// Body or query string could not be decoded
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ServerError {
    pub fn code(&self) -> ResultCode {
        match self {
            ServerError::InvalidRequest(_) => ResultCode::InvalidParameter,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let code = self.code();
        let status =
            StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = Json(json!({
            "code": code,
            "info": self.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_display() {
        let err = ServerError::InvalidRequest("missing field".to_string());
        assert_eq!(err.to_string(), "Invalid request: missing field");
        assert_eq!(err.code(), ResultCode::InvalidParameter);
    }

    #[test]
    fn test_into_response_status() {
        let response = ServerError::InvalidRequest("bad input".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ServerError>();
    }
}
