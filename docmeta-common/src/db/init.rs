//! Database initialization
//!
//! Opens (creating if missing) the SQLite database and brings its schema up
//! to date:
//! 1. `schema_version` and `document_metadata` are created if missing
//! 2. Declarative schema sync adds missing columns and secondary indexes
//! 3. Versioned migrations run

use crate::db::{migrations, table_schemas};
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// SQLite busy timeout for all read-write pools
pub const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // WAL lets the read-only query service read while a load is running
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    prepare_schema(&pool).await?;

    Ok(pool)
}

/// In-memory database with the full schema (single connection)
pub async fn init_in_memory() -> Result<SqlitePool> {
    // Each connection to sqlite::memory: is a separate database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    prepare_schema(&pool).await?;

    Ok(pool)
}

async fn prepare_schema(pool: &SqlitePool) -> Result<()> {
    // Phase 1: tables
    migrations::create_schema_version_table(pool).await?;
    table_schemas::create_all_tables(pool).await?;

    // Phase 2: Automatic Schema Synchronization
    table_schemas::sync_all_table_schemas(pool).await?;

    // Phase 3: Manual Migrations
    migrations::run_migrations(pool).await?;

    Ok(())
}
