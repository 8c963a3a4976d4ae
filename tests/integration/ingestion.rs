//! Ingestion behaviour: when generations become blocks.

use crate::common::*;
use std::time::Duration;

#[test]
fn size_threshold_flushes_sorted_block() {
    let t = TestStore::new(3, Duration::ZERO);

    t.store.write_lf(1, 1, T0 + 300, 3.0).unwrap();
    t.store.write_lf(1, 1, T0 + 100, 1.0).unwrap();
    t.store.write_lf(1, 1, T0 + 200, 2.0).unwrap();
    t.store.flush_pending();

    let files = block_files(t.path());
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_string_lossy().to_string();
    assert_eq!(name, format!("{:019}-{:019}.v1.pblk", T0 + 100, T0 + 300));

    let records = t.read_everything();
    assert_eq!(records.lf.timestamp_micros, vec![T0 + 100, T0 + 200, T0 + 300]);
    assert_eq!(records.lf.value, vec![1.0, 2.0, 3.0]);
}

#[test]
fn late_arrival_after_flush_starts_new_generation() {
    let t = TestStore::new(3, Duration::ZERO);
    for ts in [100, 200, 300] {
        t.store.write_lf(1, 1, T0 + ts, 0.0).unwrap();
    }
    t.store.write_lf(1, 1, T0 + 150, 0.0).unwrap();
    t.store.flush_pending();

    assert_eq!(block_files(t.path()).len(), 1);
    assert_eq!(t.store.stats().buffered_values, 1);

    t.store.close();
    let files = block_files(t.path());
    assert_eq!(files.len(), 2);
    assert!(files
        .iter()
        .any(|p| p.ends_with(format!("{:019}-{:019}.v1.pblk", T0 + 150, T0 + 150))));
}

#[test]
fn hf_end_is_derived_from_frequency() {
    let t = TestStore::new(2, Duration::ZERO);
    t.store.write_hf(3, 9, 1_000, 2.0, vec![1.0, 2.0]).unwrap();
    t.store.flush_pending();

    let records = t.read_everything();
    assert_eq!(records.hf.start_micros, vec![1_000]);
    assert_eq!(records.hf.end_micros, vec![1_001_000]);
    assert_eq!(records.hf.values, vec![vec![1.0, 2.0]]);
}

#[test]
fn hf_with_no_values_is_stored() {
    let t = TestStore::new(1_000, Duration::ZERO);
    t.store.write_hf(3, 9, T0, 500.0, Vec::new()).unwrap();
    t.store.close();

    let records = t.read_everything();
    assert_eq!(records.hf.len(), 1);
    assert_eq!(records.hf.end_micros, vec![T0]);
    assert!(records.hf.values[0].is_empty());
}

#[test]
fn watermark_holds_back_fresh_records() {
    let t = TestStore::new(2, Duration::from_secs(60));
    let now = t.clock.now().as_micros();

    t.store.write_lf(1, 1, now - 10 * SECOND, 0.0).unwrap();
    t.store.write_lf(1, 1, now - 5 * SECOND, 0.0).unwrap();
    t.store.flush_pending();
    assert!(block_files(t.path()).is_empty());
    assert!(t.store.stats().draining);

    // Too fresh for the candidate: parked in pending
    t.store.write_lf(1, 1, now, 0.0).unwrap();
    // Old enough: joins the candidate
    t.store.write_lf(1, 1, now - 2 * MINUTE, 0.0).unwrap();
    let stats = t.store.stats();
    assert_eq!((stats.buffered_values, stats.pending_values), (3, 1));

    t.clock.advance(Duration::from_secs(56));
    t.store.tick().unwrap();
    t.store.flush_pending();
    assert_eq!(block_files(t.path()).len(), 1);

    let records = t.read_everything();
    assert_eq!(
        records.lf.timestamp_micros,
        vec![now - 2 * MINUTE, now - 10 * SECOND, now - 5 * SECOND]
    );
    assert_eq!(t.store.stats().buffered_values, 1);
}

#[test]
fn mixed_kinds_share_a_block() {
    let t = TestStore::new(5, Duration::ZERO);
    t.store.write_hf(1, 2, T0 + 10, 1_000.0, vec![0.0; 4]).unwrap();
    t.store.write_lf(1, 1, T0 + 50, 1.0).unwrap();
    t.store.flush_pending();

    let files = block_files(t.path());
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with(format!("{:019}-{:019}.v1.pblk", T0 + 10, T0 + 50)));
}

#[test]
fn rejected_writes_leave_no_trace() {
    let t = TestStore::new(1, Duration::ZERO);
    assert!(matches!(t.store.write_lf(1, 1, -1, 0.0), Err(Error::Validation(_))));
    assert!(matches!(
        t.store.write_lf(1, 1, pancarte::MAX_INGEST_MICROS + 1, 0.0),
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        t.store.write_hf(1, 1, T0, f64::NAN, vec![1.0]),
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        t.store.write_hf(1, 1, T0, -3.0, vec![1.0]),
        Err(Error::Validation(_))
    ));
    t.store.flush_pending();
    assert!(block_files(t.path()).is_empty());
}

#[test]
fn simultaneous_samples_survive_close_and_reopen() {
    let t = TestStore::new(2, Duration::from_secs(60));
    // Fresh relative to the clock, so the third sample is held back
    let ts = T0 + 24 * HOUR - SECOND;
    for source in 1..=3 {
        t.store.write_lf(source, 1, ts, 37.0).unwrap();
    }
    t.store.close();
    assert_eq!(t.store.stats().flush_failures, 0);

    // A second run writes the same span again
    let t = t.reopen();
    t.store.write_lf(4, 1, ts, 37.0).unwrap();
    t.store.close();

    let files = block_files(t.path());
    assert_eq!(files.len(), 2);
    let result = t
        .store
        .read_all_blocks(&RangeQuery::new(ts, ts + 1))
        .unwrap();
    assert_eq!(result.records.lf.source_id, vec![1, 2, 3, 4]);
}
