//! Tests for the document_metadata repository

use chrono::{Duration, NaiveDate};
use docmeta_common::db::init::init_in_memory;
use docmeta_common::db::metadata;
use docmeta_common::db::{MetadataFilter, NewDocumentMetadata, SizeRange};
use docmeta_common::{time, Error};
use sqlx::SqlitePool;

async fn seeded_pool() -> SqlitePool {
    let pool = init_in_memory().await.unwrap();
    let records = vec![
        NewDocumentMetadata::new("a.parquet", 0, 3).with_size(1_000),
        NewDocumentMetadata::new("a.parquet", 1, 5).with_size(2_500),
        NewDocumentMetadata::new("a.parquet", 2, 3).with_size(40_000),
        NewDocumentMetadata::new("b.parquet", 0, 3).with_size(2_500).with_path("scans/b0.png"),
        NewDocumentMetadata::new("b.parquet", 1, 7),
    ];
    metadata::insert_batch(&pool, &records).await.unwrap();
    pool
}

#[tokio::test]
async fn test_duplicate_location_rejected() {
    let pool = init_in_memory().await.unwrap();

    metadata::insert_metadata(&pool, &NewDocumentMetadata::new("a.parquet", 0, 3))
        .await
        .unwrap();
    let err = metadata::insert_metadata(&pool, &NewDocumentMetadata::new("a.parquet", 0, 5))
        .await
        .unwrap_err();

    match err {
        Error::DuplicateRecord { parquet_file, row_index } => {
            assert_eq!(parquet_file, "a.parquet");
            assert_eq!(row_index, 0);
        }
        other => panic!("Expected DuplicateRecord, got {:?}", other),
    }

    // The first record is untouched
    let stored = metadata::get_by_location(&pool, "a.parquet", 0).await.unwrap().unwrap();
    assert_eq!(stored.label, 3);
    assert_eq!(metadata::count_records(&pool).await.unwrap(), 1);
}

#[tokio::test]
async fn test_distinct_locations_succeed() {
    let pool = init_in_memory().await.unwrap();

    let id1 = metadata::insert_metadata(&pool, &NewDocumentMetadata::new("a.parquet", 0, 3))
        .await
        .unwrap();
    let id2 = metadata::insert_metadata(&pool, &NewDocumentMetadata::new("a.parquet", 1, 3))
        .await
        .unwrap();
    let id3 = metadata::insert_metadata(&pool, &NewDocumentMetadata::new("b.parquet", 0, 3))
        .await
        .unwrap();

    assert!(id1 < id2 && id2 < id3);
    assert_eq!(metadata::count_records(&pool).await.unwrap(), 3);
}

#[tokio::test]
async fn test_invalid_record_rejected_before_insert() {
    let pool = init_in_memory().await.unwrap();

    let err = metadata::insert_metadata(&pool, &NewDocumentMetadata::new("a.parquet", -1, 3))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(metadata::count_records(&pool).await.unwrap(), 0);
}

#[tokio::test]
async fn test_query_by_label_exact() {
    let pool = seeded_pool().await;

    let records = metadata::find_by_label(&pool, 3).await.unwrap();
    let locations: Vec<(&str, i64)> = records
        .iter()
        .map(|r| (r.parquet_file.as_str(), r.row_index))
        .collect();
    assert_eq!(locations, vec![("a.parquet", 0), ("a.parquet", 2), ("b.parquet", 0)]);
    assert!(records.iter().all(|r| r.label == 3));

    assert!(metadata::find_by_label(&pool, 42).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_query_by_parquet_file_exact() {
    let pool = seeded_pool().await;

    let records = metadata::find_by_parquet_file(&pool, "b.parquet").await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.parquet_file == "b.parquet"));
    assert_eq!(records[0].row_index, 0);
    assert_eq!(records[0].image_path.as_deref(), Some("scans/b0.png"));
    assert_eq!(records[1].row_index, 1);
    assert_eq!(records[1].image_size_bytes, None);
}

#[tokio::test]
async fn test_query_by_size_range_inclusive() {
    let pool = seeded_pool().await;

    let records = metadata::find_by_size_range(&pool, SizeRange::between(1_000, 2_500))
        .await
        .unwrap();
    let sizes: Vec<Option<i64>> = records.iter().map(|r| r.image_size_bytes).collect();
    assert_eq!(sizes, vec![Some(1_000), Some(2_500), Some(2_500)]);

    // Open upper bound still skips rows without a size
    let records = metadata::find_by_size_range(&pool, SizeRange::new(Some(2_000), None))
        .await
        .unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.image_size_bytes.is_some()));
}

#[tokio::test]
async fn test_query_by_size_range_rejects_inverted_bounds() {
    let pool = seeded_pool().await;

    let err = metadata::find_by_size_range(&pool, SizeRange::between(10, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn test_created_at_defaults_to_insertion_time() {
    let pool = init_in_memory().await.unwrap();

    // CURRENT_TIMESTAMP has one-second resolution
    let before = time::now_naive() - Duration::seconds(2);
    metadata::insert_metadata(&pool, &NewDocumentMetadata::new("a.parquet", 0, 3))
        .await
        .unwrap();
    let after = time::now_naive() + Duration::seconds(2);

    let stored = metadata::get_by_location(&pool, "a.parquet", 0).await.unwrap().unwrap();
    assert!(
        stored.created_at >= before && stored.created_at <= after,
        "created_at {} not within [{}, {}]",
        stored.created_at,
        before,
        after
    );
}

#[tokio::test]
async fn test_explicit_created_at_kept() {
    let pool = init_in_memory().await.unwrap();
    let ts = NaiveDate::from_ymd_opt(2024, 11, 2)
        .unwrap()
        .and_hms_opt(8, 30, 0)
        .unwrap();

    metadata::insert_metadata(
        &pool,
        &NewDocumentMetadata::new("a.parquet", 0, 3).with_created_at(ts),
    )
    .await
    .unwrap();

    let stored = metadata::get_by_location(&pool, "a.parquet", 0).await.unwrap().unwrap();
    assert_eq!(stored.created_at, ts);
}

#[tokio::test]
async fn test_batch_with_duplicate_inserts_nothing() {
    let pool = init_in_memory().await.unwrap();

    let records = vec![
        NewDocumentMetadata::new("a.parquet", 0, 3),
        NewDocumentMetadata::new("a.parquet", 1, 3),
        NewDocumentMetadata::new("a.parquet", 0, 4),
    ];
    let err = metadata::insert_batch(&pool, &records).await.unwrap_err();

    assert!(err.is_duplicate());
    assert_eq!(metadata::count_records(&pool).await.unwrap(), 0);
}

#[tokio::test]
async fn test_replace_file_records_leaves_other_files() {
    let pool = seeded_pool().await;

    let fresh = vec![NewDocumentMetadata::new("a.parquet", 0, 9).with_size(10)];
    let inserted = metadata::replace_file_records(&pool, "a.parquet", &fresh).await.unwrap();
    assert_eq!(inserted, 1);

    let a = metadata::find_by_parquet_file(&pool, "a.parquet").await.unwrap();
    assert_eq!(a.len(), 1);
    assert_eq!(a[0].label, 9);

    let b = metadata::find_by_parquet_file(&pool, "b.parquet").await.unwrap();
    assert_eq!(b.len(), 2);
}

#[tokio::test]
async fn test_replace_rejects_foreign_records() {
    let pool = seeded_pool().await;

    let wrong = vec![NewDocumentMetadata::new("b.parquet", 5, 1)];
    let err = metadata::replace_file_records(&pool, "a.parquet", &wrong)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    // Nothing was deleted
    assert_eq!(metadata::find_by_parquet_file(&pool, "a.parquet").await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_filtered_paging() {
    let pool = seeded_pool().await;

    let filter = MetadataFilter {
        label: Some(3),
        ..Default::default()
    };
    assert_eq!(metadata::count_filtered(&pool, &filter).await.unwrap(), 3);

    let page = metadata::find_filtered(&pool, &filter, 2, 0).await.unwrap();
    assert_eq!(page.len(), 2);
    let page = metadata::find_filtered(&pool, &filter, 2, 2).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].parquet_file, "b.parquet");

    let combined = MetadataFilter {
        label: Some(3),
        parquet_file: Some("a.parquet".to_string()),
        size: SizeRange::new(None, Some(5_000)),
    };
    let records = metadata::find_filtered(&pool, &combined, 100, 0).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].row_index, 0);
}

#[tokio::test]
async fn test_statistics() {
    let pool = seeded_pool().await;

    let labels = metadata::label_distribution(&pool).await.unwrap();
    let pairs: Vec<(i64, i64)> = labels.iter().map(|l| (l.label, l.count)).collect();
    assert_eq!(pairs, vec![(3, 3), (5, 1), (7, 1)]);

    let stats = metadata::size_stats(&pool).await.unwrap();
    assert_eq!(stats.min, Some(1_000));
    assert_eq!(stats.max, Some(40_000));
    let avg = stats.average.unwrap();
    assert!((avg - 11_500.0).abs() < 1e-9);

    let files = metadata::list_parquet_files(&pool).await.unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].parquet_file, "a.parquet");
    assert_eq!(files[0].record_count, 3);
    assert_eq!(metadata::count_parquet_files(&pool).await.unwrap(), 2);
}

#[tokio::test]
async fn test_statistics_empty_table() {
    let pool = init_in_memory().await.unwrap();

    let stats = metadata::size_stats(&pool).await.unwrap();
    assert_eq!(stats.average, None);
    assert_eq!(stats.min, None);
    assert_eq!(stats.max, None);
    assert!(metadata::label_distribution(&pool).await.unwrap().is_empty());
}
