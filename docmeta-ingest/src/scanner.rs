//! Parquet file discovery
//!
//! Finds `*.parquet` files in a data directory. By default only the
//! directory itself is searched; `recursive(true)` walks subdirectories.
//! Results are sorted by path so loads are reproducible.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Parquet file scanner
#[derive(Debug, Clone)]
pub struct ParquetScanner {
    recursive: bool,
    ignore_patterns: Vec<String>,
}

impl Default for ParquetScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ParquetScanner {
    /// Non-recursive scanner that skips hidden entries and VCS folders
    pub fn new() -> Self {
        Self {
            recursive: false,
            ignore_patterns: vec![".git".to_string(), ".svn".to_string()],
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Scan a directory for parquet files, sorted by path
    pub fn scan(&self, root: &Path) -> Result<Vec<PathBuf>, ScanError> {
        if !root.exists() {
            return Err(ScanError::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };

        let mut files: Vec<PathBuf> = WalkDir::new(root)
            .follow_links(true)
            .max_depth(max_depth)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_ignored(e))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                    None
                }
            })
            .filter(|e| e.file_type().is_file() && is_parquet(e.path()))
            .map(|e| e.into_path())
            .collect();

        files.sort();

        tracing::debug!("Found {} parquet files under {}", files.len(), root.display());
        Ok(files)
    }

    fn is_ignored(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        name.starts_with('.') || self.ignore_patterns.iter().any(|p| name == p.as_str())
    }
}

/// True for paths with a `.parquet` extension (any case)
pub fn is_parquet(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("parquet"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_scan_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("train-00001.parquet"));
        touch(&dir.path().join("train-00000.parquet"));
        touch(&dir.path().join("TEST.PARQUET"));
        touch(&dir.path().join("notes.txt"));
        touch(&dir.path().join(".hidden.parquet"));
        touch(&dir.path().join("nested").join("deep.parquet"));

        let files = ParquetScanner::new().scan(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["TEST.PARQUET", "train-00000.parquet", "train-00001.parquet"]);
    }

    #[test]
    fn test_scan_recursive() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.parquet"));
        touch(&dir.path().join("nested").join("b.parquet"));
        touch(&dir.path().join(".git").join("c.parquet"));

        let files = ParquetScanner::new().recursive(true).scan(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[1].ends_with("nested/b.parquet"));
    }

    #[test]
    fn test_scan_missing_directory() {
        let err = ParquetScanner::new()
            .scan(Path::new("/nonexistent/docmeta/raw"))
            .unwrap_err();
        assert!(matches!(err, ScanError::PathNotFound(_)));
    }

    #[test]
    fn test_scan_file_is_not_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.parquet");
        touch(&file);

        let err = ParquetScanner::new().scan(&file).unwrap_err();
        assert!(matches!(err, ScanError::NotADirectory(_)));
    }
}
