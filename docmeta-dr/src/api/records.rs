//! Metadata record lookup
//!
//! Filters combine: every supplied parameter must match.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use docmeta_common::db::{metadata, DocumentMetadata, MetadataFilter, SizeRange};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::pagination::{calculate_pagination, Pagination};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RecordsQuery {
    pub label: Option<i64>,
    pub parquet_file: Option<String>,
    /// Inclusive lower bound on image_size_bytes
    pub min_size: Option<i64>,
    /// Inclusive upper bound on image_size_bytes
    pub max_size: Option<i64>,
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

impl RecordsQuery {
    fn filter(&self) -> MetadataFilter {
        MetadataFilter {
            label: self.label,
            parquet_file: self.parquet_file.clone().filter(|f| !f.is_empty()),
            size: SizeRange::new(self.min_size, self.max_size),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub records: Vec<DocumentMetadata>,
}

/// GET /api/records?label=&parquet_file=&min_size=&max_size=&page=
pub async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<RecordsResponse>, ApiError> {
    let filter = query.filter();

    let total = metadata::count_filtered(&state.db, &filter).await?;
    let pagination = calculate_pagination(total, query.page);
    let records = metadata::find_filtered(&state.db, &filter, pagination.page_size, pagination.offset).await?;

    Ok(Json(RecordsResponse { pagination, records }))
}

/// GET /api/records/:parquet_file/:row_index
pub async fn get_record(
    State(state): State<AppState>,
    Path((parquet_file, row_index)): Path<(String, i64)>,
) -> Result<Json<DocumentMetadata>, ApiError> {
    let record = metadata::get_by_location(&state.db, &parquet_file, row_index)
        .await?
        .ok_or_else(|| {
            docmeta_common::Error::NotFound(format!("No record for {} row {}", parquet_file, row_index))
        })?;
    Ok(Json(record))
}
