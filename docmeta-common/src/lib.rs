//! # docmeta Common Library
//!
//! Shared code for the docmeta tools including:
//! - Error type shared by the ingest CLI and the query service
//! - Root folder and TOML configuration resolution
//! - SQLite initialization, schema sync and migrations
//! - The `document_metadata` repository (insert, lookups, statistics)

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
