//! Common error types for docmeta

use thiserror::Error;

/// Common result type for docmeta operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the docmeta crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid caller input (rejected before reaching the database)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A metadata record for this parquet row already exists
    #[error("Duplicate record: {parquet_file} row {row_index} already has metadata")]
    DuplicateRecord {
        parquet_file: String,
        row_index: i64,
    },
}

impl Error {
    /// True when the error is a rejected duplicate (parquet_file, row_index)
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Error::DuplicateRecord { .. })
    }
}
