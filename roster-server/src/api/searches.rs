//! Saved filter endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use roster_common::db::models::{NewSavedFilter, SavedFilter};
use tracing::warn;

use crate::db::SavedFilterRepository;
use crate::error::{ApiError, ApiResult, OrApiError};
use crate::AppState;

const REQUIRED: &str = "Name and filters are required.";

/// POST /api/searches
pub async fn create_search(
    State(state): State<AppState>,
    body: Result<Json<NewSavedFilter>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SavedFilter>)> {
    let Json(request) = body.map_err(|rejection| {
        warn!("Saved search body rejected: {}", rejection);
        ApiError::BadRequest(REQUIRED.to_string())
    })?;

    let saved = SavedFilterRepository::new(state.db.clone())
        .create(request)
        .await
        .or_api_error("Failed to save search")?;

    Ok((StatusCode::CREATED, Json(saved)))
}

/// GET /api/searches
pub async fn list_searches(State(state): State<AppState>) -> ApiResult<Json<Vec<SavedFilter>>> {
    let searches = SavedFilterRepository::new(state.db.clone())
        .list()
        .await
        .or_api_error("Failed to get saved searches")?;
    Ok(Json(searches))
}

/// DELETE /api/searches/:id
pub async fn delete_search(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    SavedFilterRepository::new(state.db.clone())
        .delete(id)
        .await
        .or_api_error("Failed to delete saved search")?;

    Ok(StatusCode::NO_CONTENT)
}

/// Build saved filter routes
pub fn search_routes() -> Router<AppState> {
    Router::new()
        .route("/searches", get(list_searches).post(create_search))
        .route("/searches/:id", delete(delete_search))
}
