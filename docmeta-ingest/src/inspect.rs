//! Parquet directory inspection (no database)

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::loader::record_key;
use crate::reader::ParquetImageReader;
use crate::scanner::ParquetScanner;

#[derive(Debug, Clone, Serialize)]
pub struct FileInspection {
    /// Same key the loader stores the file's rows under
    pub file: String,
    pub rows: u64,
    /// Distinct labels, ascending
    pub labels: Vec<i64>,
    /// Mean over rows with a non-null image
    pub average_image_size: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InspectionReport {
    pub files: Vec<FileInspection>,
    pub total_rows: u64,
    pub label_distribution: BTreeMap<i64, u64>,
}

/// Read every parquet file under `dir` and summarize labels and sizes
///
/// Unlike the loader, the first unreadable file aborts the report.
pub fn inspect_directory(
    dir: &Path,
    scanner: &ParquetScanner,
    reader: &ParquetImageReader,
) -> Result<InspectionReport> {
    let files = scanner.scan(dir)?;

    let mut report = InspectionReport {
        files: Vec::with_capacity(files.len()),
        total_rows: 0,
        label_distribution: BTreeMap::new(),
    };

    for path in &files {
        let records = reader.read_file(path)?;

        let mut labels: Vec<i64> = Vec::new();
        let mut size_total: i64 = 0;
        let mut sized: u64 = 0;

        for record in &records {
            *report.label_distribution.entry(record.label).or_insert(0) += 1;
            labels.push(record.label);
            if let Some(size) = record.image_size_bytes {
                size_total += size;
                sized += 1;
            }
        }
        labels.sort_unstable();
        labels.dedup();

        let rows = records.len() as u64;
        report.total_rows += rows;
        report.files.push(FileInspection {
            file: record_key(dir, path)?,
            rows,
            labels,
            average_image_size: (sized > 0).then(|| size_total as f64 / sized as f64),
        });
    }

    Ok(report)
}

impl fmt::Display for InspectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(70);
        writeln!(f, "Found {} parquet files", self.files.len())?;
        writeln!(f)?;
        writeln!(f, "{}", rule)?;

        for file in &self.files {
            writeln!(f, "File: {}", file.file)?;
            writeln!(f, "  Rows: {}", file.rows)?;
            writeln!(f, "  Labels: {:?}", file.labels)?;
            match file.average_image_size {
                Some(avg) => writeln!(f, "  Avg image size: {:.0} bytes", avg)?,
                None => writeln!(f, "  Avg image size: n/a")?,
            }
            writeln!(f)?;
        }

        writeln!(f, "{}", rule)?;
        writeln!(f, "Total rows across all files: {}", self.total_rows)?;
        writeln!(f)?;
        writeln!(f, "Overall label distribution:")?;
        for (label, count) in &self.label_distribution {
            writeln!(f, "  Label {}: {} images", label, count)?;
        }
        Ok(())
    }
}
