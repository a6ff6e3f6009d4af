//! docmeta-ingest library
//!
//! Populates the `document_metadata` table from parquet image datasets and
//! reports on both the parquet files and the stored metadata.

pub mod error;
pub mod estimate;
pub mod inspect;
pub mod loader;
pub mod reader;
pub mod report;
pub mod scanner;

pub use error::{IngestError, Result};
pub use loader::{LoadSummary, MetadataLoader, ReplaceMode};
pub use reader::{ImageRecord, ParquetImageReader};
pub use scanner::ParquetScanner;
