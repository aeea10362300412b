//! Custom extractors
//!
//! Wrap axum's `Json` and `Query` so that a body or query string that cannot
//! be decoded is answered with an `InvalidParameter` envelope.

use crate::error::ServerError;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Query, Request,
    },
    http::request::Parts,
    Json,
};
use tracing::debug;

/// JSON body extractor
pub struct JsonExtractor<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonExtractor<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(value) => Ok(Self(value.0)),
            Err(rejection) => {
                let error_message = match rejection {
                    JsonRejection::JsonDataError(err) => format!("Invalid JSON data: {}", err),
                    JsonRejection::JsonSyntaxError(err) => format!("JSON syntax error: {}", err),
                    JsonRejection::MissingJsonContentType(_) => {
                        "Missing 'Content-Type: application/json' header".to_string()
                    }
                    _ => format!("Failed to parse JSON: {}", rejection),
                };
                debug!(%error_message, "rejected request body");
                Err(ServerError::InvalidRequest(error_message))
            }
        }
    }
}

/// Query string extractor
pub struct QueryExtractor<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for QueryExtractor<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| Self(value))
            .map_err(|rejection: QueryRejection| {
                ServerError::InvalidRequest(format!("Invalid query string: {}", rejection))
            })
    }
}
