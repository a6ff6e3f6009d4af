//! `document_metadata` repository
//!
//! Inserts are checked against the unique (parquet_file, row_index) index;
//! a violation surfaces as [`Error::DuplicateRecord`]. Lookups by label,
//! parquet file and size range each run on their own secondary index.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::db::models::{
    DocumentMetadata, LabelCount, MetadataFilter, NewDocumentMetadata, ParquetFileSummary,
    SizeRange, SizeStats,
};
use crate::{Error, Result};

const SELECT_COLUMNS: &str = "SELECT id, parquet_file, row_index, label, image_size_bytes, image_path, created_at \
                              FROM document_metadata";

const INSERT_SQL: &str = r#"
    INSERT INTO document_metadata
        (parquet_file, row_index, label, image_size_bytes, image_path, created_at)
    VALUES (?, ?, ?, ?, ?, COALESCE(?, CURRENT_TIMESTAMP))
"#;

fn map_insert_error(err: sqlx::Error, record: &NewDocumentMetadata) -> Error {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => Error::DuplicateRecord {
            parquet_file: record.parquet_file.clone(),
            row_index: record.row_index,
        },
        _ => Error::Database(err),
    }
}

async fn insert_on(conn: &mut SqliteConnection, record: &NewDocumentMetadata) -> Result<i64> {
    record.validate()?;

    let result = sqlx::query(INSERT_SQL)
        .bind(&record.parquet_file)
        .bind(record.row_index)
        .bind(record.label)
        .bind(record.image_size_bytes)
        .bind(&record.image_path)
        .bind(record.created_at)
        .execute(conn)
        .await
        .map_err(|e| map_insert_error(e, record))?;

    Ok(result.last_insert_rowid())
}

/// Insert one record, returning its id
///
/// Fails with `DuplicateRecord` when the parquet row already has metadata.
pub async fn insert_metadata(pool: &SqlitePool, record: &NewDocumentMetadata) -> Result<i64> {
    let mut conn = pool.acquire().await?;
    insert_on(&mut conn, record).await
}

/// Insert many records atomically; any failure inserts nothing
pub async fn insert_batch(pool: &SqlitePool, records: &[NewDocumentMetadata]) -> Result<u64> {
    let mut tx = pool.begin().await?;
    for record in records {
        insert_on(&mut tx, record).await?;
    }
    tx.commit().await?;

    debug!("Inserted batch of {} metadata records", records.len());
    Ok(records.len() as u64)
}

/// Replace every record of one parquet file (reload semantics)
///
/// Deletes the file's existing rows and inserts `records` in a single
/// transaction. Every record must name `parquet_file`.
pub async fn replace_file_records(
    pool: &SqlitePool,
    parquet_file: &str,
    records: &[NewDocumentMetadata],
) -> Result<u64> {
    if let Some(stray) = records.iter().find(|r| r.parquet_file != parquet_file) {
        return Err(Error::InvalidInput(format!(
            "record for '{}' passed while replacing '{}'",
            stray.parquet_file, parquet_file
        )));
    }

    let mut tx = pool.begin().await?;

    let removed = sqlx::query("DELETE FROM document_metadata WHERE parquet_file = ?")
        .bind(parquet_file)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    for record in records {
        insert_on(&mut tx, record).await?;
    }
    tx.commit().await?;

    debug!(
        "Replaced metadata for {}: {} removed, {} inserted",
        parquet_file,
        removed,
        records.len()
    );
    Ok(records.len() as u64)
}

/// Point lookup by parquet location
pub async fn get_by_location(
    pool: &SqlitePool,
    parquet_file: &str,
    row_index: i64,
) -> Result<Option<DocumentMetadata>> {
    let record = sqlx::query_as::<_, DocumentMetadata>(&format!(
        "{} WHERE parquet_file = ? AND row_index = ?",
        SELECT_COLUMNS
    ))
    .bind(parquet_file)
    .bind(row_index)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// All records with the given label, ordered by location
pub async fn find_by_label(pool: &SqlitePool, label: i64) -> Result<Vec<DocumentMetadata>> {
    let records = sqlx::query_as::<_, DocumentMetadata>(&format!(
        "{} WHERE label = ? ORDER BY parquet_file, row_index",
        SELECT_COLUMNS
    ))
    .bind(label)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// All records of one parquet file, ordered by row index
pub async fn find_by_parquet_file(pool: &SqlitePool, parquet_file: &str) -> Result<Vec<DocumentMetadata>> {
    let records = sqlx::query_as::<_, DocumentMetadata>(&format!(
        "{} WHERE parquet_file = ? ORDER BY row_index",
        SELECT_COLUMNS
    ))
    .bind(parquet_file)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// Records whose size lies in the inclusive range, smallest first
///
/// Records without a known size never match.
pub async fn find_by_size_range(pool: &SqlitePool, range: SizeRange) -> Result<Vec<DocumentMetadata>> {
    range.validate()?;

    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
    qb.push(" WHERE image_size_bytes IS NOT NULL");
    push_size_bounds(&mut qb, range);
    qb.push(" ORDER BY image_size_bytes, parquet_file, row_index");

    let records = qb.build_query_as::<DocumentMetadata>().fetch_all(pool).await?;
    Ok(records)
}

fn push_size_bounds(qb: &mut QueryBuilder<'_, Sqlite>, range: SizeRange) {
    if let Some(min) = range.min {
        qb.push(" AND image_size_bytes >= ").push_bind(min);
    }
    if let Some(max) = range.max {
        qb.push(" AND image_size_bytes <= ").push_bind(max);
    }
}

fn push_filter<'a>(qb: &mut QueryBuilder<'a, Sqlite>, filter: &'a MetadataFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(label) = filter.label {
        qb.push(" AND label = ").push_bind(label);
    }
    if let Some(file) = &filter.parquet_file {
        qb.push(" AND parquet_file = ").push_bind(file.as_str());
    }
    if !filter.size.is_unbounded() {
        qb.push(" AND image_size_bytes IS NOT NULL");
        push_size_bounds(qb, filter.size);
    }
}

/// Number of records matching a filter
pub async fn count_filtered(pool: &SqlitePool, filter: &MetadataFilter) -> Result<i64> {
    filter.size.validate()?;

    let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM document_metadata");
    push_filter(&mut qb, filter);

    let count: i64 = qb.build_query_scalar().fetch_one(pool).await?;
    Ok(count)
}

/// One page of records matching a filter, ordered by location
pub async fn find_filtered(
    pool: &SqlitePool,
    filter: &MetadataFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<DocumentMetadata>> {
    filter.size.validate()?;

    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
    push_filter(&mut qb, filter);
    qb.push(" ORDER BY parquet_file, row_index LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let records = qb.build_query_as::<DocumentMetadata>().fetch_all(pool).await?;
    Ok(records)
}

pub async fn count_records(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM document_metadata")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Record count per label, ordered by label
pub async fn label_distribution(pool: &SqlitePool) -> Result<Vec<LabelCount>> {
    let counts = sqlx::query_as::<_, LabelCount>(
        r#"
        SELECT label, COUNT(*) AS count
        FROM document_metadata
        GROUP BY label
        ORDER BY label
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(counts)
}

/// Average/min/max image size; all None on an empty table
pub async fn size_stats(pool: &SqlitePool) -> Result<SizeStats> {
    let (average, min, max): (Option<f64>, Option<i64>, Option<i64>) = sqlx::query_as(
        r#"
        SELECT
            AVG(image_size_bytes),
            MIN(image_size_bytes),
            MAX(image_size_bytes)
        FROM document_metadata
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(SizeStats { average, min, max })
}

/// Parquet files with their record counts, ordered by name
pub async fn list_parquet_files(pool: &SqlitePool) -> Result<Vec<ParquetFileSummary>> {
    list_parquet_files_paged(pool, i64::MAX, 0).await
}

pub async fn list_parquet_files_paged(
    pool: &SqlitePool,
    limit: i64,
    offset: i64,
) -> Result<Vec<ParquetFileSummary>> {
    let files = sqlx::query_as::<_, ParquetFileSummary>(
        r#"
        SELECT parquet_file, COUNT(*) AS record_count
        FROM document_metadata
        GROUP BY parquet_file
        ORDER BY parquet_file
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(files)
}

pub async fn count_parquet_files(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT parquet_file) FROM document_metadata")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
