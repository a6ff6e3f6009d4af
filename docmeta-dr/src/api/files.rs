//! Parquet files known to the metadata table

use axum::{
    extract::{Query, State},
    Json,
};
use docmeta_common::db::{metadata, ParquetFileSummary};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::pagination::{calculate_pagination, Pagination};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FilesQuery {
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

#[derive(Debug, Serialize)]
pub struct FilesResponse {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub files: Vec<ParquetFileSummary>,
}

/// GET /api/files?page=
pub async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<FilesQuery>,
) -> Result<Json<FilesResponse>, ApiError> {
    let total = metadata::count_parquet_files(&state.db).await?;
    let pagination = calculate_pagination(total, query.page);
    let files = metadata::list_parquet_files_paged(&state.db, pagination.page_size, pagination.offset).await?;

    Ok(Json(FilesResponse { pagination, files }))
}
