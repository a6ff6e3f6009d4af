//! Table Schema Definitions
//!
//! Single source of truth for database table schemas.
//! Each struct defines the expected schema for one table.

use crate::db::schema_sync::{ColumnDefinition, IndexDefinition, SchemaSync, TableSchema};
use crate::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Name of the unique index over (parquet_file, row_index)
pub const LOCATION_INDEX: &str = "idx_document_metadata_location";

/// `document_metadata`: one row per image stored inside a parquet file
pub struct DocumentMetadataSchema;

impl TableSchema for DocumentMetadataSchema {
    fn table_name() -> &'static str {
        "document_metadata"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER")
                .primary_key()
                .autoincrement(),

            // File name only; the directory is a property of the deployment
            ColumnDefinition::new("parquet_file", "TEXT")
                .not_null(),

            ColumnDefinition::new("row_index", "INTEGER")
                .not_null(),

            ColumnDefinition::new("label", "INTEGER")
                .not_null(),

            ColumnDefinition::new("image_size_bytes", "INTEGER"),

            ColumnDefinition::new("image_path", "TEXT"),

            ColumnDefinition::new("created_at", "TIMESTAMP")
                .not_null()
                .default("CURRENT_TIMESTAMP"),
        ]
    }

    fn expected_indexes() -> Vec<IndexDefinition> {
        vec![
            IndexDefinition::new(LOCATION_INDEX, &["parquet_file", "row_index"]).unique(),
            IndexDefinition::new("idx_document_metadata_label", &["label"]),
            IndexDefinition::new("idx_document_metadata_parquet_file", &["parquet_file"]),
            IndexDefinition::new("idx_document_metadata_image_size", &["image_size_bytes"]),
        ]
    }
}

/// Create every table that does not exist yet (phase 1)
pub async fn create_all_tables(pool: &SqlitePool) -> Result<()> {
    SchemaSync::create_table::<DocumentMetadataSchema>(pool).await?;
    Ok(())
}

/// Synchronize all table schemas (phase 2)
///
/// Runs after table creation and before migrations.
pub async fn sync_all_table_schemas(pool: &SqlitePool) -> Result<()> {
    info!("=== Automatic Schema Synchronization ===");

    SchemaSync::sync_table::<DocumentMetadataSchema>(pool).await?;

    info!("=== Schema Synchronization Complete ===");
    Ok(())
}
