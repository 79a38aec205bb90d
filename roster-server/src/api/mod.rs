//! HTTP API handlers for roster-server

pub mod health;
pub mod searches;
pub mod users;

pub use health::health_routes;
pub use searches::search_routes;
pub use users::user_routes;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::any::Any;

/// Catch-all for handler panics: 500 with a generic message
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    tracing::error!("Unhandled failure: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "message": "Something went wrong!",
            "error": detail,
        })),
    )
        .into_response()
}
