//! Saved filter persistence
//!
//! `filters` is stored as JSON text and handed back unchanged.

use chrono::Utc;
use roster_common::db::models::{NewSavedFilter, SavedFilter};
use roster_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::info;

#[derive(Clone)]
pub struct SavedFilterRepository {
    pool: SqlitePool,
}

impl SavedFilterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Validate and store a new filter snapshot
    pub async fn create(&self, request: NewSavedFilter) -> Result<SavedFilter> {
        let (name, filters) = request.validate()?;
        let created_at = Utc::now();

        let id = sqlx::query("INSERT INTO saved_filters (name, filters, created_at) VALUES (?, ?, ?)")
            .bind(&name)
            .bind(serde_json::to_string(&filters)?)
            .bind(created_at)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        info!("Saved filter {} ({})", id, name);

        let row = sqlx::query("SELECT id, name, filters, created_at FROM saved_filters WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::Internal(format!("Saved filter {} vanished after insert", id)))?;

        SavedFilter::from_row(&row)
    }

    /// All saved filters, newest first
    pub async fn list(&self) -> Result<Vec<SavedFilter>> {
        let rows = sqlx::query(
            "SELECT id, name, filters, created_at FROM saved_filters ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(SavedFilter::from_row).collect()
    }

    /// Delete by id; deleting a missing id is not an error
    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM saved_filters WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            info!("Deleted saved filter {}", id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_common::db::connect_in_memory;
    use serde_json::json;

    fn request(name: &str, filters: serde_json::Value) -> NewSavedFilter {
        NewSavedFilter {
            name: Some(name.to_string()),
            filters: Some(filters),
        }
    }

    #[tokio::test]
    async fn test_create_returns_stored_filters_unchanged() {
        let repo = SavedFilterRepository::new(connect_in_memory().await.unwrap());
        let filters = json!({"gender": "Female", "age": "30", "nested": {"anything": [1, 2]}});

        let saved = repo.create(request("Women 30", filters.clone())).await.unwrap();

        assert_eq!(saved.name, "Women 30");
        assert_eq!(saved.filters, filters);
    }

    #[tokio::test]
    async fn test_create_requires_name_and_filters() {
        let repo = SavedFilterRepository::new(connect_in_memory().await.unwrap());

        let result = repo
            .create(NewSavedFilter {
                name: None,
                filters: Some(json!({})),
            })
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let repo = SavedFilterRepository::new(connect_in_memory().await.unwrap());
        repo.create(request("first", json!({"name": "a"}))).await.unwrap();
        repo.create(request("second", json!({"name": "b"}))).await.unwrap();
        repo.create(request("third", json!({"name": "c"}))).await.unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let repo = SavedFilterRepository::new(connect_in_memory().await.unwrap());
        let saved = repo.create(request("temp", json!({"location": "Paris"}))).await.unwrap();

        repo.delete(saved.id).await.unwrap();
        repo.delete(saved.id).await.unwrap();
        repo.delete(12345).await.unwrap();

        assert!(repo.list().await.unwrap().is_empty());
    }
}
