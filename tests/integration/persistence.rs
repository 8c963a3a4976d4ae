//! On-disk layout and what survives a restart.

use crate::common::*;
use std::time::Duration;

#[test]
fn blocks_survive_reopen() {
    let t = TestStore::new(1_000, Duration::from_secs(300));
    t.store.write_lf(1, 1, T0, 1.0).unwrap();
    t.store.write_hf(1, 2, T0 + SECOND, 100.0, vec![0.5; 100]).unwrap();

    let t = t.reopen();
    let records = t.read_everything();
    assert_eq!(records.lf.timestamp_micros, vec![T0]);
    assert_eq!(records.hf.values[0].len(), 100);

    t.store.write_lf(1, 1, T0 + 2 * SECOND, 2.0).unwrap();
    t.store.close();
    assert_eq!(t.read_everything().lf.len(), 2);
}

#[test]
fn default_layout_is_hourly() {
    let t = TestStore::new(1, Duration::ZERO);
    // 2024-01-01T05:30:00Z
    t.store.write_lf(1, 1, T0 + 5 * HOUR + 30 * MINUTE, 0.0).unwrap();
    t.store.flush_pending();

    let files = block_files(t.path());
    assert_eq!(files.len(), 1);
    assert_eq!(
        files[0].parent().unwrap(),
        t.path().join("2024").join("01").join("01").join("05")
    );
}

#[test]
fn depth_follows_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = PancarteConfig::new(dir.path())
        .with_cache_size(1)
        .with_lateness_margin(Duration::ZERO)
        .with_partitioning_depth(6);
    let t = TestStore::with_config(dir, config);
    t.store.write_lf(1, 1, T0 + 42 * SECOND + 7, 0.0).unwrap();
    t.store.flush_pending();

    let files = block_files(t.path());
    assert_eq!(
        files[0].parent().unwrap(),
        t.path().join("2024/01/01/00/00/42")
    );
    assert_eq!(t.read_everything().lf.len(), 1);
}

#[test]
fn reopen_with_identity_reads_zstd_blocks() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    {
        let config = PancarteConfig::new(&root).with_codec("zstd");
        let store = ImmutableStore::open(config).unwrap();
        store.write_hf(4, 4, T0, 1_000.0, vec![1.5; 5_000]).unwrap();
        store.close();
    }

    let store = ImmutableStore::open(PancarteConfig::new(&root)).unwrap();
    let result = store
        .read_all_blocks(&RangeQuery::new(0, pancarte::MAX_INGEST_MICROS))
        .unwrap();
    assert_eq!(result.records.hf.values, vec![vec![1.5; 5_000]]);
}

#[test]
fn config_file_drives_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(pancarte::CONFIG_FILE_NAME);
    std::fs::write(
        &path,
        "location = \"blocks\"\ncache_size = 2\nlateness_margin_ms = 0\npartitioning_depth = 2\n",
    )
    .unwrap();

    let config = PancarteConfig::from_file(&path).unwrap();
    assert_eq!(config.location, dir.path().join("blocks"));

    let store = ImmutableStore::open(config).unwrap();
    store.write_lf(1, 1, T0, 0.0).unwrap();
    store.write_lf(1, 1, T0 + 1, 0.0).unwrap();
    store.flush_pending();

    let files = block_files(&dir.path().join("blocks"));
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].parent().unwrap(), dir.path().join("blocks/2024/01"));
}

#[test]
fn orphaned_temp_files_removed_on_open() {
    let t = TestStore::new(1, Duration::ZERO);
    t.store.write_lf(1, 1, T0, 0.0).unwrap();
    t.store.flush_pending();
    let block = block_files(t.path()).remove(0);
    let partition = block.parent().unwrap().to_path_buf();
    let orphan = partition.join(format!(".{:019}-{:019}.v1.pblk.tmp", T0 + 5, T0 + 9));
    std::fs::write(&orphan, b"half a block").unwrap();

    let t = t.reopen();
    assert!(!orphan.exists());
    assert!(block.exists());
    assert_eq!(t.read_everything().lf.len(), 1);
}

#[test]
fn closed_store_rejects_writes_but_reads() {
    let t = TestStore::new(10, Duration::ZERO);
    t.store.write_lf(1, 1, T0, 0.0).unwrap();
    t.store.close();
    assert!(matches!(t.store.write_lf(1, 1, T0, 0.0), Err(Error::Closed)));
    assert!(matches!(
        t.store.write_hf(1, 1, T0, 1.0, vec![]),
        Err(Error::Closed)
    ));
    assert_eq!(t.read_everything().lf.len(), 1);
}
