//! Database models, schema and queries

pub mod init;
pub mod metadata;
pub mod migrations;
pub mod models;
pub mod schema_sync;
pub mod table_schemas;

pub use init::*;
pub use models::*;
