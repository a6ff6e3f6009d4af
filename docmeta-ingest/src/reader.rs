//! Parquet image metadata extraction
//!
//! Reads only the `label` and `image` columns of a parquet file, batch by
//! batch, and turns each row into an [`ImageRecord`]. The encoded image
//! bytes are read to measure their length and dropped with the batch; they
//! are never retained.
//!
//! Supported `image` layouts:
//! - `Struct { bytes: Binary | LargeBinary, path: Utf8 | LargeUtf8 }`
//!   (the datasets image encoding; `path` optional)
//! - bare `Binary` / `LargeBinary`

use std::fs::File;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Int64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ProjectionMask;
use serde::Serialize;

use crate::error::{IngestError, Result};

pub const LABEL_COLUMN: &str = "label";
pub const IMAGE_COLUMN: &str = "image";

/// Rows per record batch when not configured
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// Metadata of one image row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRecord {
    /// 0-based position in the file
    pub row_index: i64,
    pub label: i64,
    /// None when the image value is null
    pub image_size_bytes: Option<i64>,
    pub image_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ParquetImageReader {
    batch_size: usize,
}

impl Default for ParquetImageReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ParquetImageReader {
    pub fn new() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Extract one record per row
    pub fn read_file(&self, path: &Path) -> Result<Vec<ImageRecord>> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;

        let schema = builder.schema().clone();
        let label_idx = schema
            .index_of(LABEL_COLUMN)
            .map_err(|_| IngestError::schema(path, "missing 'label' column"))?;
        let image_idx = schema
            .index_of(IMAGE_COLUMN)
            .map_err(|_| IngestError::schema(path, "missing 'image' column"))?;

        if !schema.field(label_idx).data_type().is_integer() {
            return Err(IngestError::schema(
                path,
                format!("'label' must be an integer column, found {}", schema.field(label_idx).data_type()),
            ));
        }

        let mask = ProjectionMask::roots(builder.parquet_schema(), [label_idx, image_idx]);
        let reader = builder
            .with_projection(mask)
            .with_batch_size(self.batch_size)
            .build()?;

        let mut records = Vec::new();
        let mut next_row: i64 = 0;

        for batch in reader {
            let batch = batch?;
            let rows = batch.num_rows();

            let label_col = batch
                .column_by_name(LABEL_COLUMN)
                .ok_or_else(|| IngestError::schema(path, "projection lost 'label' column"))?;
            let image_col = batch
                .column_by_name(IMAGE_COLUMN)
                .ok_or_else(|| IngestError::schema(path, "projection lost 'image' column"))?;

            let labels = cast(label_col, &DataType::Int64)?;
            let labels = labels.as_primitive::<Int64Type>();
            let (sizes, paths) = image_columns(path, image_col)?;

            records.reserve(rows);
            for i in 0..rows {
                let row_index = next_row + i as i64;
                if labels.is_null(i) {
                    return Err(IngestError::schema(
                        path,
                        format!("null or out-of-range label at row {}", row_index),
                    ));
                }
                records.push(ImageRecord {
                    row_index,
                    label: labels.value(i),
                    image_size_bytes: sizes[i],
                    image_path: paths.as_ref().and_then(|p| p[i].clone()),
                });
            }
            next_row += rows as i64;
        }

        tracing::debug!("Read {} rows from {}", records.len(), path.display());
        Ok(records)
    }
}

type SizesAndPaths = (Vec<Option<i64>>, Option<Vec<Option<String>>>);

fn image_columns(path: &Path, image: &ArrayRef) -> Result<SizesAndPaths> {
    match image.data_type() {
        DataType::Struct(_) => {
            let image = image.as_struct();
            let bytes = image
                .column_by_name("bytes")
                .ok_or_else(|| IngestError::schema(path, "image struct has no 'bytes' field"))?;
            let mut sizes = binary_lengths(bytes).ok_or_else(|| {
                IngestError::schema(path, format!("image.bytes must be binary, found {}", bytes.data_type()))
            })?;

            let mut paths = image.column_by_name("path").and_then(utf8_values);

            // A null struct hides whatever its children hold
            for i in 0..image.len() {
                if image.is_null(i) {
                    sizes[i] = None;
                    if let Some(p) = paths.as_mut() {
                        p[i] = None;
                    }
                }
            }
            Ok((sizes, paths))
        }
        _ => {
            let sizes = binary_lengths(image).ok_or_else(|| {
                IngestError::schema(
                    path,
                    format!("'image' must be binary or a struct with 'bytes', found {}", image.data_type()),
                )
            })?;
            Ok((sizes, None))
        }
    }
}

fn binary_lengths(array: &ArrayRef) -> Option<Vec<Option<i64>>> {
    match array.data_type() {
        DataType::Binary => Some(
            array
                .as_binary::<i32>()
                .iter()
                .map(|v| v.map(|b| b.len() as i64))
                .collect(),
        ),
        DataType::LargeBinary => Some(
            array
                .as_binary::<i64>()
                .iter()
                .map(|v| v.map(|b| b.len() as i64))
                .collect(),
        ),
        _ => None,
    }
}

fn utf8_values(array: &ArrayRef) -> Option<Vec<Option<String>>> {
    match array.data_type() {
        DataType::Utf8 => Some(array.as_string::<i32>().iter().map(|v| v.map(str::to_string)).collect()),
        DataType::LargeUtf8 => Some(array.as_string::<i64>().iter().map(|v| v.map(str::to_string)).collect()),
        _ => None,
    }
}
