//! Person endpoints: upload, listing, CSV export, update, delete

use axum::{
    body::Bytes,
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection, QueryRejection},
        DefaultBodyLimit, Multipart, Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use roster_common::db::models::{ExportRow, PersonRecord, PersonUpdate};
use roster_common::Error;
use serde::Serialize;
use tracing::{info, warn};

use crate::db::PersonRepository;
use crate::error::{ApiError, ApiResult, OrApiError};
use crate::import::{ImportOutcome, ImportPipeline};
use crate::query::{self, PersonPage, PersonQuery, QueryParams};
use crate::AppState;

const NO_FILE: &str = "No file uploaded.";
const UPLOAD_FAILED: &str = "Failed to process file.";
const FETCH_FAILED: &str = "Failed to fetch users.";
const EXPORT_FAILED: &str = "Failed to export users.";
const NOTHING_TO_EXPORT: &str = "No users found for the selected criteria.";
const UPDATE_FAILED: &str = "Failed to update user.";
const DELETE_FAILED: &str = "Failed to delete user.";

/// Upload response: summary message plus the import outcome
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    #[serde(flatten)]
    pub outcome: ImportOutcome,
}

/// POST /api/users/upload
///
/// Multipart form with the spreadsheet in field `file`.
pub async fn upload_users(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let mut multipart = multipart.map_err(|rejection| {
        warn!("Upload rejected: {}", rejection);
        ApiError::BadRequest(NO_FILE.to_string())
    })?;

    let bytes = read_file_field(&mut multipart)
        .await?
        .ok_or_else(|| ApiError::BadRequest(NO_FILE.to_string()))?;

    info!("Upload received: {} bytes", bytes.len());

    let pipeline = ImportPipeline::new(state.db.clone(), state.settings.report_invalid_rows);
    let outcome = pipeline.run(&bytes).await.or_api_error(UPLOAD_FAILED)?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: format!("{} users imported successfully.", outcome.inserted_count),
            outcome,
        }),
    ))
}

/// Contents of the `file` field, if the form has one
async fn read_file_field(multipart: &mut Multipart) -> ApiResult<Option<Bytes>> {
    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::from_common(UPLOAD_FAILED, Error::Parse(e.body_text())))?;

        let Some(field) = field else {
            return Ok(None);
        };
        if field.name() != Some("file") {
            continue;
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::from_common(UPLOAD_FAILED, Error::Parse(e.body_text())))?;
        return Ok(Some(bytes));
    }
}

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> ApiResult<Json<PersonPage>> {
    let query = person_query(&state, params)?;
    let page = query::fetch_page(&state.db, &query)
        .await
        .or_api_error(FETCH_FAILED)?;
    Ok(Json(page))
}

/// GET /api/users/export
///
/// Same filters and sort as the listing, every match, as a CSV attachment.
pub async fn export_users(
    State(state): State<AppState>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> ApiResult<Response> {
    let query = person_query(&state, params)?;
    let rows = query::fetch_all(&state.db, &query)
        .await
        .or_api_error(EXPORT_FAILED)?;

    if rows.is_empty() {
        return Err(ApiError::NotFound(NOTHING_TO_EXPORT.to_string()));
    }

    let body = render_csv(&rows)
        .map_err(|e| Error::Internal(format!("CSV rendering failed: {}", e)))
        .or_api_error(EXPORT_FAILED)?;

    info!("Exported {} users", rows.len());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"users.csv\""),
        ],
        body,
    )
        .into_response())
}

/// PUT /api/users/:id
pub async fn update_user(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<PersonUpdate>, JsonRejection>,
) -> ApiResult<Json<PersonRecord>> {
    let Path(id) = id.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let Json(update) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let record = PersonRepository::new(state.db.clone())
        .update(id, &update)
        .await
        .or_api_error(UPDATE_FAILED)?;

    Ok(Json(record))
}

/// DELETE /api/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    PersonRepository::new(state.db.clone())
        .delete(id)
        .await
        .or_api_error(DELETE_FAILED)?;

    Ok(StatusCode::NO_CONTENT)
}

fn person_query(
    state: &AppState,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> ApiResult<PersonQuery> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    PersonQuery::from_params(&params, state.settings.max_page_size).or_api_error(FETCH_FAILED)
}

/// Header row comes from the field names of [`ExportRow`]
fn render_csv(rows: &[ExportRow]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

/// Build person routes
pub fn user_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/users/upload",
            post(upload_users).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/users", get(list_users))
        .route("/users/export", get(export_users))
        .route("/users/:id", put(update_user).delete(delete_user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_csv_header_and_empty_cells() {
        let rows = vec![
            ExportRow {
                name: "Ann Lee".to_string(),
                email: "ann@x.io".to_string(),
                contact_number: "5551234".to_string(),
                age: Some(31),
                gender: Some("Female".to_string()),
                location: Some("Austin, TX".to_string()),
            },
            ExportRow {
                name: "Bob".to_string(),
                email: "bob@x.io".to_string(),
                contact_number: "200".to_string(),
                age: None,
                gender: None,
                location: None,
            },
        ];

        let csv = String::from_utf8(render_csv(&rows).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "name,email,contact_number,age,gender,location");
        assert_eq!(lines[1], "Ann Lee,ann@x.io,5551234,31,Female,\"Austin, TX\"");
        assert_eq!(lines[2], "Bob,bob@x.io,200,,,");
    }
}
