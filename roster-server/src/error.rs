//! Error types for roster-server
//!
//! Every failure response carries a human-readable `message`; store and
//! pipeline failures also carry the raw error detail as `error`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use roster_common::Error;
use serde_json::json;

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed request input (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Store or pipeline failure (500)
    #[error("{message}: {source}")]
    Internal {
        message: String,
        #[source]
        source: Error,
    },
}

impl ApiError {
    /// Classify a library error, attaching the operation's failure message
    ///
    /// Validation and not-found errors keep their own message; everything
    /// else becomes a 500 carrying `message` plus the error detail.
    pub fn from_common(message: &str, err: Error) -> Self {
        match err {
            Error::Validation(msg) => ApiError::BadRequest(msg),
            Error::NotFound(msg) => ApiError::NotFound(msg),
            other => {
                tracing::error!("{} {}", message, other);
                ApiError::Internal {
                    message: message.to_string(),
                    source: other,
                }
            }
        }
    }
}

/// Attach an operation message to library results
pub trait OrApiError<T> {
    fn or_api_error(self, message: &str) -> ApiResult<T>;
}

impl<T> OrApiError<T> for roster_common::Result<T> {
    fn or_api_error(self, message: &str) -> ApiResult<T> {
        self.map_err(|err| ApiError::from_common(message, err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "message": message })),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "message": message })),
            ApiError::Internal { message, source } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "message": message,
                    "error": source.to_string(),
                }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
