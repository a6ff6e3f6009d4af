//! HTTP API handlers for docmeta-dr

pub mod buildinfo;
pub mod error;
pub mod files;
pub mod health;
pub mod records;
pub mod stats;

pub use buildinfo::get_build_info;
pub use error::ApiError;
pub use files::list_files;
pub use health::health_routes;
pub use records::{get_record, list_records};
pub use stats::get_stats;
