//! Shared test utilities for the integration suite.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use std::time::Duration;

pub use pancarte::{
    Clock, Error, ImmutableStore, ManualClock, PancarteConfig, RangeQuery, RecordSet, Timestamp,
};
use tempfile::TempDir;

static INIT_TRACING: Once = Once::new();

/// Route tracing output to the test harness once per process.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
            .try_init();
    });
}

/// 2024-01-01T00:00:00Z
pub const T0: i64 = 1_704_067_200_000_000;
pub const SECOND: i64 = 1_000_000;
pub const MINUTE: i64 = 60 * SECOND;
pub const HOUR: i64 = 60 * MINUTE;

/// Store on a temp dir, driven by a manual clock.
pub struct TestStore {
    pub store: ImmutableStore,
    pub clock: Arc<ManualClock>,
    pub dir: TempDir,
}

impl TestStore {
    /// Store with the given threshold and margin, clock parked at `T0 + 1 day`.
    pub fn new(cache_size: u64, margin: Duration) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = PancarteConfig::new(dir.path())
            .with_cache_size(cache_size)
            .with_lateness_margin(margin);
        Self::with_config(dir, config)
    }

    /// Store from an explicit config rooted in `dir`.
    pub fn with_config(dir: TempDir, config: PancarteConfig) -> Self {
        init_tracing();
        let clock = Arc::new(ManualClock::new(Timestamp::from_micros(T0 + 24 * HOUR)));
        let store = ImmutableStore::open_with_clock(config, clock.clone())
            .expect("Failed to open test store");
        TestStore { store, clock, dir }
    }

    /// Close the store and open a fresh one over the same directory.
    pub fn reopen(self) -> Self {
        let TestStore { store, dir, .. } = self;
        let config = store.config().clone();
        store.close();
        drop(store);
        Self::with_config(dir, config)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Everything on disk, both kinds, whole ingestible range.
    pub fn read_everything(&self) -> RecordSet {
        self.store
            .read_all_blocks(&RangeQuery::new(0, pancarte::MAX_INGEST_MICROS))
            .expect("read failed")
            .records
    }
}

/// All block files under `root`, sorted.
pub fn block_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.to_string_lossy().ends_with(".v1.pblk") {
                out.push(path);
            }
        }
    }
    out.sort();
    out
}
