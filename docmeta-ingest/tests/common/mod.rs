//! Parquet fixtures shared by the integration tests

#![allow(dead_code)]

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, BinaryArray, Int64Array, StringArray, StructArray};
use arrow::buffer::NullBuffer;
use arrow::datatypes::{DataType, Field, Fields, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

/// One image row: label, encoded bytes (None = null image), original path
pub type Row<'a> = (i64, Option<&'a [u8]>, Option<&'a str>);

/// Write rows with the datasets image layout `image: Struct{bytes, path}`
///
/// A row whose bytes and path are both None becomes a null struct.
pub fn write_struct_images(path: &Path, rows: &[Row<'_>], row_group_size: usize) {
    let fields = Fields::from(vec![
        Field::new("bytes", DataType::Binary, true),
        Field::new("path", DataType::Utf8, true),
    ]);

    let labels = Int64Array::from(rows.iter().map(|r| r.0).collect::<Vec<_>>());
    let bytes = BinaryArray::from_opt_vec(rows.iter().map(|r| r.1).collect());
    let paths = StringArray::from(rows.iter().map(|r| r.2).collect::<Vec<_>>());
    let validity = NullBuffer::from(
        rows.iter()
            .map(|r| r.1.is_some() || r.2.is_some())
            .collect::<Vec<bool>>(),
    );

    let image = StructArray::try_new(
        fields.clone(),
        vec![Arc::new(bytes) as ArrayRef, Arc::new(paths) as ArrayRef],
        Some(validity),
    )
    .unwrap();

    let schema = Arc::new(Schema::new(vec![
        Field::new("image", DataType::Struct(fields), true),
        Field::new("label", DataType::Int64, false),
    ]));
    let batch = RecordBatch::try_new(schema, vec![Arc::new(image), Arc::new(labels)]).unwrap();

    write_batch(path, &batch, row_group_size);
}

/// Write rows with a bare binary `image` column
pub fn write_binary_images(path: &Path, rows: &[(i64, Option<&[u8]>)]) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("label", DataType::Int64, false),
        Field::new("image", DataType::Binary, true),
    ]));
    let labels = Int64Array::from(rows.iter().map(|r| r.0).collect::<Vec<_>>());
    let images = BinaryArray::from_opt_vec(rows.iter().map(|r| r.1).collect());
    let batch = RecordBatch::try_new(schema, vec![Arc::new(labels), Arc::new(images)]).unwrap();

    write_batch(path, &batch, 1024);
}

fn write_batch(path: &Path, batch: &RecordBatch, row_group_size: usize) {
    let props = WriterProperties::builder()
        .set_max_row_group_size(row_group_size)
        .build();
    let file = File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props)).unwrap();
    writer.write(batch).unwrap();
    writer.close().unwrap();
}
