//! Parquet → document_metadata loader
//!
//! Discovers parquet files, extracts one record per image row and stores
//! them keyed by the file's path relative to the data directory (the bare
//! file name for top-level files). Each file is written in its own
//! transaction, so a failing file leaves no partial rows and does not stop
//! the run.

use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};

use docmeta_common::db::{self, NewDocumentMetadata};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::error::{IngestError, Result};
use crate::reader::{ImageRecord, ParquetImageReader};
use crate::scanner::ParquetScanner;

/// How existing rows of a reloaded file are treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplaceMode {
    /// Delete the file's rows and insert the fresh set
    #[default]
    Replace,
    /// Plain insert; rows already present fail with a duplicate error
    Strict,
}

/// A file that could not be loaded
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadSummary {
    pub files_found: usize,
    pub files_loaded: usize,
    pub records_loaded: u64,
    pub failures: Vec<FileFailure>,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl LoadSummary {
    pub fn records_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.records_loaded as f64 / secs
        } else {
            0.0
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}

pub struct MetadataLoader {
    pool: SqlitePool,
    scanner: ParquetScanner,
    reader: ParquetImageReader,
    mode: ReplaceMode,
}

impl MetadataLoader {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            scanner: ParquetScanner::new(),
            reader: ParquetImageReader::new(),
            mode: ReplaceMode::default(),
        }
    }

    pub fn with_scanner(mut self, scanner: ParquetScanner) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn with_reader(mut self, reader: ParquetImageReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_mode(mut self, mode: ReplaceMode) -> Self {
        self.mode = mode;
        self
    }

    /// Load every parquet file found under `dir`
    ///
    /// Only discovery errors abort the run. Per-file errors are logged and
    /// collected in [`LoadSummary::failures`].
    pub async fn load_directory(&self, dir: &Path) -> Result<LoadSummary> {
        let started = Instant::now();
        let files = self.scanner.scan(dir)?;

        let mut summary = LoadSummary {
            files_found: files.len(),
            ..Default::default()
        };

        if files.is_empty() {
            warn!("No parquet files found in {}", dir.display());
            summary.elapsed = started.elapsed();
            return Ok(summary);
        }

        info!("Found {} parquet files in {}", files.len(), dir.display());

        for (i, path) in files.iter().enumerate() {
            let loaded = match record_key(dir, path) {
                Ok(key) => self.load_keyed(path, key).await,
                Err(e) => Err(e),
            };
            match loaded {
                Ok(count) => {
                    summary.files_loaded += 1;
                    summary.records_loaded += count;
                    info!(
                        "[{}/{}] Loaded {} records from {}",
                        i + 1,
                        files.len(),
                        count,
                        path.display()
                    );
                }
                Err(e) => {
                    error!("[{}/{}] Failed to load {}: {}", i + 1, files.len(), path.display(), e);
                    summary.failures.push(FileFailure {
                        path: path.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        summary.elapsed = started.elapsed();
        info!(
            "Load complete: {}/{} files, {} records in {:.2}s ({:.0} records/s)",
            summary.files_loaded,
            summary.files_found,
            summary.records_loaded,
            summary.elapsed.as_secs_f64(),
            summary.records_per_second()
        );
        Ok(summary)
    }

    /// Load one parquet file under its bare file name, returning the number
    /// of stored records
    pub async fn load_file(&self, path: &Path) -> Result<u64> {
        let parquet_file = file_name(path)?;
        self.load_keyed(path, parquet_file).await
    }

    async fn load_keyed(&self, path: &Path, parquet_file: String) -> Result<u64> {
        let reader = self.reader.clone();
        let owned = path.to_path_buf();
        let images = tokio::task::spawn_blocking(move || reader.read_file(&owned)).await??;

        let records: Vec<NewDocumentMetadata> = images
            .into_iter()
            .map(|image| to_new_record(&parquet_file, image))
            .collect();

        let stored = match self.mode {
            ReplaceMode::Replace => {
                db::metadata::replace_file_records(&self.pool, &parquet_file, &records).await?
            }
            ReplaceMode::Strict => db::metadata::insert_batch(&self.pool, &records).await?,
        };
        Ok(stored)
    }
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| IngestError::InvalidArgument(format!("not a file path: {}", path.display())))
}

/// Key under which the rows of `path` are stored: its path below `root`
/// joined with `/`, so `root/a/train.parquet` and `root/b/train.parquet`
/// never share rows. Files outside `root` fall back to the file name.
pub fn record_key(root: &Path, path: &Path) -> Result<String> {
    let relative = match path.strip_prefix(root) {
        Ok(relative) => relative,
        Err(_) => return file_name(path),
    };

    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        return file_name(path);
    }
    Ok(parts.join("/"))
}

fn to_new_record(parquet_file: &str, image: ImageRecord) -> NewDocumentMetadata {
    NewDocumentMetadata {
        parquet_file: parquet_file.to_string(),
        row_index: image.row_index,
        label: image.label,
        image_size_bytes: image.image_size_bytes,
        image_path: image.image_path,
        created_at: None,
    }
}
