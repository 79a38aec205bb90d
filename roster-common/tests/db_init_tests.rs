//! Database initialization against on-disk files
//!
//! Covers first-run creation, reopening an existing database and the
//! per-connection pragmas applied through the connect options.

use roster_common::config::DatabaseConfig;
use roster_common::db::init_database;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("roster.db");

    let pool = init_database(&db_path, &DatabaseConfig::default()).await;

    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("roster.db");
    let config = DatabaseConfig::default();

    let pool1 = init_database(&db_path, &config).await.unwrap();
    sqlx::query(
        "INSERT INTO saved_filters (name, filters, created_at) VALUES ('kept', '{}', '2024-01-01T00:00:00Z')",
    )
    .execute(&pool1)
    .await
    .unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path, &config).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM saved_filters")
        .fetch_one(&pool2)
        .await
        .unwrap();
    assert_eq!(count, 1, "Existing rows should survive reopening");
}

#[tokio::test]
async fn test_every_connection_enforces_foreign_keys() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("roster.db");
    let config = DatabaseConfig {
        max_connections: 3,
        ..DatabaseConfig::default()
    };
    let pool = init_database(&db_path, &config).await.unwrap();

    // Hold several connections at once so more than one is exercised
    let mut held = Vec::new();
    for _ in 0..3 {
        held.push(pool.acquire().await.unwrap());
    }
    for conn in held.iter_mut() {
        let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&mut **conn)
            .await
            .unwrap();
        assert_eq!(enabled, 1);

        let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(&mut **conn)
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }
}
