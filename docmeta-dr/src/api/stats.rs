//! Aggregate statistics endpoint

use axum::{extract::State, Json};
use docmeta_common::db::{metadata, LabelCount, SizeStats};
use docmeta_common::time;
use serde::Serialize;

use super::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_records: i64,
    pub parquet_files: i64,
    pub labels: Vec<LabelCount>,
    pub sizes: SizeStats,
    /// RFC 3339 UTC time the figures were computed
    pub generated_at: String,
}

/// GET /api/stats
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    Ok(Json(StatsResponse {
        total_records: metadata::count_records(&state.db).await?,
        parquet_files: metadata::count_parquet_files(&state.db).await?,
        labels: metadata::label_distribution(&state.db).await?,
        sizes: metadata::size_stats(&state.db).await?,
        generated_at: time::to_rfc3339(&time::now_naive()),
    }))
}
