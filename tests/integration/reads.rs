//! Range reads through the store.

use crate::common::*;
use std::time::Duration;

fn store_with_two_blocks() -> TestStore {
    let t = TestStore::new(2, Duration::ZERO);
    t.store.write_lf(7, 1, T0 + 100, 36.6).unwrap();
    t.store.write_lf(8, 1, T0 + 200, 37.0).unwrap();
    t.store.write_lf(9, 1, T0 + HOUR, 38.0).unwrap();
    t.store.write_lf(8, 1, T0 + HOUR + 1, 38.5).unwrap();
    t.store.flush_pending();
    assert_eq!(block_files(t.path()).len(), 2);
    t
}

#[test]
fn filter_selects_one_source_across_blocks() {
    let t = store_with_two_blocks();
    let query = RangeQuery::new(T0, T0 + 2 * HOUR).filter("source_id", 7i64);
    let result = t.store.read_all_blocks(&query).unwrap();

    assert_eq!(result.records.lf.len(), 1);
    let row = result.records.lf.row(0);
    assert_eq!((row.source_id, row.timestamp_micros, row.value), (7, T0 + 100, 36.6));
    assert!(result.malformed_blocks.is_empty());
}

#[test]
fn results_follow_block_order() {
    let t = store_with_two_blocks();
    let result = t
        .store
        .read_all_blocks(&RangeQuery::new(T0, T0 + 2 * HOUR).filter("source_id", 8i64))
        .unwrap();
    assert_eq!(result.records.lf.timestamp_micros, vec![T0 + 200, T0 + HOUR + 1]);
    assert_eq!(result.blocks_read, 2);
}

#[test]
fn range_outside_data_is_empty() {
    let t = store_with_two_blocks();
    let result = t.store.read_all_blocks(&RangeQuery::new(0, T0)).unwrap();
    assert!(result.records.is_empty());
    let result = t
        .store
        .read_all_blocks(&RangeQuery::new(T0 + 3 * HOUR, T0 + 4 * HOUR))
        .unwrap();
    assert!(result.records.is_empty());
}

#[test]
fn buffered_records_are_not_visible() {
    let t = TestStore::new(1_000, Duration::ZERO);
    t.store.write_lf(1, 1, T0, 1.0).unwrap();
    assert!(t.read_everything().is_empty());
    t.store.close();
    assert_eq!(t.read_everything().lf.len(), 1);
}

#[test]
fn lazy_scan_yields_per_block() {
    let t = store_with_two_blocks();
    let scan = t.store.read_blocks(&RangeQuery::new(T0, T0 + 2 * HOUR)).unwrap();
    let reads: Vec<_> = scan.map(|r| r.unwrap()).collect();
    assert_eq!(reads.len(), 2);
    assert_eq!(reads[0].records.lf.len(), 2);
    assert!(reads[0].path < reads[1].path);
}

#[test]
fn hf_filters_and_bounds() {
    let t = TestStore::new(1, Duration::ZERO);
    t.store.write_hf(1, 5, T0, 250.0, vec![0.0; 250]).unwrap();
    t.store.write_hf(2, 5, T0 + 10 * SECOND, 500.0, vec![0.0; 250]).unwrap();
    t.store.flush_pending();

    let q = RangeQuery::new(T0, T0 + MINUTE)
        .with_kinds(false, true)
        .filter("frequency", 500.0);
    let result = t.store.read_all_blocks(&q).unwrap();
    assert_eq!(result.records.hf.source_id, vec![2]);
    assert_eq!(result.records.hf.end_micros, vec![T0 + 10 * SECOND + 500_000]);

    // The first run ends exactly at T0 + 1s, which the bound excludes
    let q = RangeQuery::new(T0, T0 + SECOND).with_kinds(false, true);
    assert!(t.store.read_all_blocks(&q).unwrap().records.is_empty());
}

#[test]
fn unknown_filter_field_is_rejected() {
    let t = store_with_two_blocks();
    let err = t
        .store
        .read_all_blocks(&RangeQuery::new(T0, T0 + HOUR).filter("end_micros", 0i64))
        .unwrap_err();
    assert!(matches!(err, Error::UnknownFilterField { .. }));

    let err = t
        .store
        .read_all_blocks(&RangeQuery::new(T0, T0 + HOUR).filter("patient", 0i64))
        .unwrap_err();
    assert!(matches!(err, Error::UnknownFilterField { .. }));
}

#[test]
fn corrupt_block_is_skipped_and_reported() {
    let t = store_with_two_blocks();
    let files = block_files(t.path());
    std::fs::write(&files[0], b"PBLK but not really").unwrap();

    let result = t
        .store
        .read_all_blocks(&RangeQuery::new(T0, T0 + 2 * HOUR))
        .unwrap();
    assert_eq!(result.malformed_blocks, vec![files[0].clone()]);
    assert_eq!(result.records.lf.timestamp_micros, vec![T0 + HOUR, T0 + HOUR + 1]);
}

#[test]
fn foreign_files_in_tree_are_ignored() {
    let t = store_with_two_blocks();
    let files = block_files(t.path());
    let dir = files[0].parent().unwrap();
    std::fs::write(dir.join("notes.txt"), b"hello").unwrap();
    std::fs::write(dir.join("123-456.v1.pblk"), b"short name").unwrap();
    std::fs::create_dir_all(t.path().join("backup")).unwrap();

    let result = t.store.read_all_blocks(&RangeQuery::new(T0, T0 + 2 * HOUR)).unwrap();
    assert_eq!(result.records.lf.len(), 4);
    assert!(result.malformed_blocks.is_empty());
}
