//! Error types for parquet ingestion

use std::path::PathBuf;
use thiserror::Error;

use crate::scanner::ScanError;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Parquet discovery failed
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// File does not have the expected label/image layout
    #[error("Unexpected schema in {file}: {message}")]
    Schema { file: PathBuf, message: String },

    /// Metadata store rejected the operation
    #[error(transparent)]
    Store(#[from] docmeta_common::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Blocking reader task panicked or was cancelled
    #[error("Reader task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IngestError {
    pub(crate) fn schema(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        IngestError::Schema {
            file: file.into(),
            message: message.into(),
        }
    }
}
