//! roster-server library - person records import, query and saved filters
//!
//! Exposes the router and components for the binary and integration tests.

pub mod api;
pub mod db;
pub mod error;
pub mod import;
pub mod query;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use roster_common::config::{TomlConfig, DEFAULT_MAX_PAGE_SIZE, DEFAULT_MAX_UPLOAD_BYTES};
use sqlx::SqlitePool;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Runtime settings handlers need, resolved once at startup
#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
    /// Include rows missing required fields in upload responses
    pub report_invalid_rows: bool,
    pub max_page_size: i64,
    pub max_upload_bytes: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            report_invalid_rows: false,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl From<&TomlConfig> for ServiceSettings {
    fn from(config: &TomlConfig) -> Self {
        Self {
            report_invalid_rows: config.import.report_invalid_rows,
            max_page_size: config.query.max_page_size,
            max_upload_bytes: config.server.max_upload_bytes,
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, opened in main and closed at shutdown
    pub db: SqlitePool,
    pub settings: ServiceSettings,
}

impl AppState {
    pub fn new(db: SqlitePool, settings: ServiceSettings) -> Self {
        Self { db, settings }
    }
}

/// Build application router
///
/// JSON API under `/api`, health check at the root.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(api::user_routes(state.settings.max_upload_bytes))
        .merge(api::search_routes());

    Router::new()
        .nest("/api", api)
        .merge(api::health_routes())
        .layer(CatchPanicLayer::custom(api::handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
