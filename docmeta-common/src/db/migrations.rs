//! Database schema migrations
//!
//! Versioned migrations for changes that schema sync must not make on its
//! own because they can rewrite or drop data. Progress is tracked in the
//! `schema_version` table; every migration is idempotent.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - databases in the field have already run them
//! 2. **Always add new migrations** - one function per change, bump `CURRENT_SCHEMA_VERSION`
//! 3. **Check before changing** - a migration may run against a table that already has the change

use crate::db::table_schemas::LOCATION_INDEX;
use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Create the version tracking table
pub async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Latest applied schema version (0 when none)
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        warn!("This may indicate a downgrade. Proceeding with caution.");
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    info!("All migrations completed successfully");
    Ok(())
}

/// Migration v1: enforce one record per (parquet_file, row_index)
///
/// Tables written by early loaders had no uniqueness over the parquet
/// location, and append-mode reloads left duplicate rows behind. Duplicates
/// are collapsed to the lowest id before the unique index is built.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v1: unique (parquet_file, row_index) on document_metadata");

    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='document_metadata')",
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        info!("  document_metadata does not exist, nothing to migrate");
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    let removed = sqlx::query(
        r#"
        DELETE FROM document_metadata
        WHERE id NOT IN (
            SELECT MIN(id) FROM document_metadata
            GROUP BY parquet_file, row_index
        )
        "#,
    )
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if removed > 0 {
        warn!("  Removed {} duplicate metadata rows", removed);
    }

    sqlx::query(&format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {} ON document_metadata(parquet_file, row_index)",
        LOCATION_INDEX
    ))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    async fn create_legacy_table(pool: &SqlitePool) {
        sqlx::query(
            r#"
            CREATE TABLE document_metadata (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                parquet_file TEXT NOT NULL,
                row_index INTEGER NOT NULL,
                label INTEGER NOT NULL,
                image_size_bytes INTEGER,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_schema_version_zero_without_table() {
        let pool = setup_test_db().await;
        assert_eq!(get_schema_version(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_migrate_v1_removes_duplicates_keeping_first() {
        let pool = setup_test_db().await;
        create_schema_version_table(&pool).await.unwrap();
        create_legacy_table(&pool).await;

        for (file, row, label) in [("a.parquet", 0, 3), ("a.parquet", 0, 5), ("a.parquet", 1, 3)] {
            sqlx::query("INSERT INTO document_metadata (parquet_file, row_index, label) VALUES (?, ?, ?)")
                .bind(file)
                .bind(row)
                .bind(label)
                .execute(&pool)
                .await
                .unwrap();
        }

        run_migrations(&pool).await.unwrap();

        let rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT row_index, label FROM document_metadata ORDER BY row_index",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(rows, vec![(0, 3), (1, 3)]);

        let dup = sqlx::query("INSERT INTO document_metadata (parquet_file, row_index, label) VALUES ('a.parquet', 1, 9)")
            .execute(&pool)
            .await;
        assert!(dup.is_err(), "unique index should reject duplicate location");

        assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_run_migrations_idempotent() {
        let pool = setup_test_db().await;
        create_schema_version_table(&pool).await.unwrap();
        create_legacy_table(&pool).await;

        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let versions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(versions, 1);
    }
}
