//! Shared helpers for roster-server integration tests
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request},
    Router,
};
use roster_common::db::connect_in_memory;
use roster_common::db::models::{NewPerson, PersonDetail};
use roster_server::db::PersonRepository;
use roster_server::{build_router, AppState, ServiceSettings};
use rust_xlsxwriter::Workbook;
use serde_json::Value;
use sqlx::SqlitePool;

pub const BOUNDARY: &str = "roster-test-boundary";

/// App over a fresh in-memory database with default settings
pub async fn setup_app() -> (Router, SqlitePool) {
    setup_app_with(ServiceSettings::default()).await
}

pub async fn setup_app_with(settings: ServiceSettings) -> (Router, SqlitePool) {
    let pool = connect_in_memory()
        .await
        .expect("Should open in-memory database");
    let app = build_router(AppState::new(pool.clone(), settings));
    (app, pool)
}

pub fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Multipart upload with a single field
pub fn upload_request(field: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/users/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

pub async fn extract_text(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    String::from_utf8(bytes.to_vec()).expect("Should be UTF-8")
}

/// Spreadsheet cell for [`xlsx`]
pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Empty,
}

/// Single-sheet XLSX workbook; row 0 is usually the header
pub fn xlsx(rows: &[Vec<Cell>]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            match cell {
                Cell::Text(s) => {
                    sheet.write_string(r as u32, c as u16, *s).unwrap();
                }
                Cell::Number(n) => {
                    sheet.write_number(r as u32, c as u16, *n).unwrap();
                }
                Cell::Empty => {}
            }
        }
    }

    workbook.save_to_buffer().unwrap()
}

pub fn header_row() -> Vec<Cell<'static>> {
    ["Name", "Email", "ContactNumber", "Age", "Gender", "Location"]
        .into_iter()
        .map(Cell::Text)
        .collect()
}

pub fn person(name: &str, email: &str, contact: &str, age: Option<i64>, gender: &str, location: &str) -> NewPerson {
    NewPerson {
        name: name.to_string(),
        email: email.to_string(),
        contact_number: contact.to_string(),
        detail: PersonDetail {
            age,
            gender: Some(gender.to_string()),
            location: Some(location.to_string()),
        },
    }
}

pub async fn seed(pool: &SqlitePool, people: &[NewPerson]) {
    PersonRepository::new(pool.clone())
        .insert_batch(people)
        .await
        .expect("Should seed persons");
}

pub async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}
