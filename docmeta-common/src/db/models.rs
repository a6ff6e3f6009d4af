//! Database models

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A stored `document_metadata` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DocumentMetadata {
    pub id: i64,
    pub parquet_file: String,
    pub row_index: i64,
    pub label: i64,
    pub image_size_bytes: Option<i64>,
    pub image_path: Option<String>,
    /// Insertion time, UTC
    pub created_at: NaiveDateTime,
}

/// Insert request for one metadata record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDocumentMetadata {
    pub parquet_file: String,
    pub row_index: i64,
    pub label: i64,
    pub image_size_bytes: Option<i64>,
    pub image_path: Option<String>,
    /// None stores the insertion time
    pub created_at: Option<NaiveDateTime>,
}

impl NewDocumentMetadata {
    pub fn new(parquet_file: impl Into<String>, row_index: i64, label: i64) -> Self {
        Self {
            parquet_file: parquet_file.into(),
            row_index,
            label,
            image_size_bytes: None,
            image_path: None,
            created_at: None,
        }
    }

    pub fn with_size(mut self, bytes: i64) -> Self {
        self.image_size_bytes = Some(bytes);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.image_path = Some(path.into());
        self
    }

    pub fn with_created_at(mut self, ts: NaiveDateTime) -> Self {
        self.created_at = Some(ts);
        self
    }

    /// Reject values the table would accept but that describe no real row
    pub fn validate(&self) -> Result<()> {
        if self.parquet_file.trim().is_empty() {
            return Err(Error::InvalidInput("parquet_file must not be empty".to_string()));
        }
        if self.row_index < 0 {
            return Err(Error::InvalidInput(format!(
                "row_index must be non-negative, got {}",
                self.row_index
            )));
        }
        if let Some(size) = self.image_size_bytes {
            if size < 0 {
                return Err(Error::InvalidInput(format!(
                    "image_size_bytes must be non-negative, got {}",
                    size
                )));
            }
        }
        Ok(())
    }
}

/// Inclusive byte size bounds; an open side is None
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeRange {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl SizeRange {
    pub fn new(min: Option<i64>, max: Option<i64>) -> Self {
        Self { min, max }
    }

    pub fn between(min: i64, max: i64) -> Self {
        Self::new(Some(min), Some(max))
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        for bound in [self.min, self.max].into_iter().flatten() {
            if bound < 0 {
                return Err(Error::InvalidInput(format!("size bound must be non-negative, got {}", bound)));
            }
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(Error::InvalidInput(format!(
                    "min size {} is greater than max size {}",
                    min, max
                )));
            }
        }
        Ok(())
    }
}

/// Combined filter used by paged lookups; all set fields must match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub label: Option<i64>,
    pub parquet_file: Option<String>,
    #[serde(default)]
    pub size: SizeRange,
}

/// Number of records carrying a label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LabelCount {
    pub label: i64,
    pub count: i64,
}

/// Size statistics over records with a known size
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SizeStats {
    pub average: Option<f64>,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

/// A parquet file known to the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ParquetFileSummary {
    pub parquet_file: String,
    pub record_count: i64,
}
