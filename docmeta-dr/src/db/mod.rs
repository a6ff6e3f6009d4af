//! Database access layer for docmeta-dr
//!
//! All connections are read-only; the service never writes.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;

/// Connect to the metadata database in read-only mode
///
/// Fails when the file does not exist; this service never creates one.
pub async fn connect_readonly(db_path: &Path) -> Result<SqlitePool> {
    if !db_path.exists() {
        anyhow::bail!(
            "Database not found: {}\nRun `docmeta-ingest load` first to create it.",
            db_path.display()
        );
    }

    // mode=ro; readers still see writes committed by a concurrent loader
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .read_only(true)
        .busy_timeout(docmeta_common::db::BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("Failed to connect to database in read-only mode")?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_readonly_connection() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("docmeta.db");
        let writer = docmeta_common::db::init_database(&db_path).await.unwrap();

        let pool = connect_readonly(&db_path).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM document_metadata")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);

        let result = sqlx::query("CREATE TABLE _test_write (id INTEGER)")
            .execute(&pool)
            .await;
        assert!(result.is_err(), "Write operation should fail in read-only mode");

        writer.close().await;
    }

    #[tokio::test]
    async fn test_missing_database() {
        let dir = tempfile::tempdir().unwrap();
        let err = connect_readonly(&dir.path().join("absent.db")).await.unwrap_err();
        assert!(err.to_string().contains("Database not found"));
    }
}
