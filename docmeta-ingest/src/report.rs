//! Statistics report over the stored metadata

use std::fmt;

use docmeta_common::db::{self, SizeStats};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelShare {
    pub label: i64,
    pub count: i64,
    /// Percentage of all records
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseReport {
    pub total_records: i64,
    pub parquet_files: i64,
    pub labels: Vec<LabelShare>,
    pub sizes: SizeStats,
}

impl DatabaseReport {
    pub async fn collect(pool: &SqlitePool) -> Result<Self> {
        let total_records = db::metadata::count_records(pool).await?;
        let parquet_files = db::metadata::count_parquet_files(pool).await?;
        let sizes = db::metadata::size_stats(pool).await?;

        let labels = db::metadata::label_distribution(pool)
            .await?
            .into_iter()
            .map(|lc| LabelShare {
                label: lc.label,
                count: lc.count,
                percent: if total_records > 0 {
                    lc.count as f64 * 100.0 / total_records as f64
                } else {
                    0.0
                },
            })
            .collect();

        Ok(Self {
            total_records,
            parquet_files,
            labels,
            sizes,
        })
    }
}

impl fmt::Display for DatabaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total records: {}", self.total_records)?;
        writeln!(f, "Parquet files: {}", self.parquet_files)?;

        writeln!(f)?;
        writeln!(f, "Label distribution:")?;
        for share in &self.labels {
            writeln!(f, "  Label {}: {} ({:.1}%)", share.label, share.count, share.percent)?;
        }

        writeln!(f)?;
        writeln!(f, "Image size statistics:")?;
        match (self.sizes.average, self.sizes.min, self.sizes.max) {
            (Some(avg), Some(min), Some(max)) => {
                writeln!(f, "  Average: {:.0} bytes ({:.1} KB)", avg, avg / 1024.0)?;
                writeln!(f, "  Min: {} bytes", min)?;
                writeln!(f, "  Max: {} bytes", max)?;
            }
            _ => writeln!(f, "  No sized images")?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmeta_common::db::{init_in_memory, NewDocumentMetadata};

    #[tokio::test]
    async fn test_percentages() {
        let pool = init_in_memory().await.unwrap();
        let records = vec![
            NewDocumentMetadata::new("a.parquet", 0, 1).with_size(100),
            NewDocumentMetadata::new("a.parquet", 1, 1).with_size(300),
            NewDocumentMetadata::new("b.parquet", 0, 2),
            NewDocumentMetadata::new("b.parquet", 1, 3).with_size(200),
        ];
        db::metadata::insert_batch(&pool, &records).await.unwrap();

        let report = DatabaseReport::collect(&pool).await.unwrap();
        assert_eq!(report.total_records, 4);
        assert_eq!(report.parquet_files, 2);
        assert_eq!(report.labels[0], LabelShare { label: 1, count: 2, percent: 50.0 });
        assert_eq!(report.sizes.min, Some(100));
        assert_eq!(report.sizes.max, Some(300));
        assert!((report.sizes.average.unwrap() - 200.0).abs() < 1e-9);

        let text = report.to_string();
        assert!(text.contains("Label 1: 2 (50.0%)"));
    }

    #[tokio::test]
    async fn test_empty_database() {
        let pool = init_in_memory().await.unwrap();
        let report = DatabaseReport::collect(&pool).await.unwrap();
        assert_eq!(report.total_records, 0);
        assert!(report.labels.is_empty());
        assert!(report.to_string().contains("No sized images"));
    }
}
