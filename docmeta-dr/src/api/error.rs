//! API error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Errors returned by the query endpoints as `{ "error": message }`
#[derive(Debug)]
pub enum ApiError {
    InvalidQuery(String),
    NotFound(String),
    DatabaseError(String),
}

impl From<docmeta_common::Error> for ApiError {
    fn from(err: docmeta_common::Error) -> Self {
        match err {
            docmeta_common::Error::InvalidInput(msg) => ApiError::InvalidQuery(msg),
            docmeta_common::Error::NotFound(msg) => ApiError::NotFound(msg),
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidQuery(msg) => (StatusCode::BAD_REQUEST, format!("Invalid query: {}", msg)),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Database error: {}", msg))
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
