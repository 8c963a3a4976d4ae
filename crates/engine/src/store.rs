//! The store: ingestion buffer, flush worker and block tree behind one handle
//!
//! Writes validate their record, then enter the reorder buffer under a
//! single mutex. When the buffer hands off a generation, the hand-off is
//! queued to the flush worker, which encodes and writes the block outside
//! the lock. Reads go straight to the block tree and never touch the
//! buffer, so data is readable once its block is on disk.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use pancarte_core::{Error, Generation, HfRecord, LfRecord, Record, Result};
use pancarte_durability::{BlockStore, PartitionLayout};
use tracing::{debug, error, info};

use crate::background::FlushScheduler;
use crate::clock::{Clock, SystemClock};
use crate::config::PancarteConfig;
use crate::reader::{BlockScan, RangeQuery, RangeReader, RangeResult};
use crate::reorder_buffer::ReorderBuffer;

const FLUSH_THREAD_NAME: &str = "pancarte-flush";

/// Store statistics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Values in the flush candidate generation
    pub buffered_values: u64,
    /// Values held back while draining
    pub pending_values: u64,
    /// Whether the size threshold has been reached
    pub draining: bool,
    /// Generations queued or being written
    pub queued_flushes: usize,
    /// Blocks written since open
    pub blocks_written: u64,
    /// Generations lost to write failures since open
    pub flush_failures: u64,
}

#[derive(Debug, Default)]
struct FlushCounters {
    blocks_written: AtomicU64,
    flush_failures: AtomicU64,
}

struct Ingest {
    buffer: ReorderBuffer,
    closed: bool,
}

/// Time-partitioned record store
pub struct ImmutableStore {
    config: PancarteConfig,
    ingest: Mutex<Ingest>,
    blocks: Arc<BlockStore>,
    reader: RangeReader,
    scheduler: FlushScheduler,
    counters: Arc<FlushCounters>,
    clock: Arc<dyn Clock>,
}

impl ImmutableStore {
    /// Open a store on the wall clock
    pub fn open(config: PancarteConfig) -> Result<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    /// Open a store with an explicit time source
    ///
    /// Validates the config, creates the root directory, removes temporary
    /// files left by a crash and starts the flush worker.
    pub fn open_with_clock(config: PancarteConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.location)?;

        let layout = PartitionLayout::new(config.partition_depth()?);
        let blocks = Arc::new(BlockStore::new(&config.location, layout, config.storage_codec()?));
        let orphans = blocks.cleanup_temp_files()?;
        let scheduler = FlushScheduler::new(FLUSH_THREAD_NAME)?;

        info!(
            target: "pancarte::store",
            location = %config.location.display(),
            cache_size = config.cache_size,
            lateness_margin_ms = config.lateness_margin_ms,
            partitioning_depth = config.partitioning_depth,
            codec = %config.codec,
            orphans,
            "Store opened"
        );

        Ok(ImmutableStore {
            ingest: Mutex::new(Ingest {
                buffer: ReorderBuffer::new(config.cache_size, config.lateness_margin()),
                closed: false,
            }),
            reader: RangeReader::new(Arc::clone(&blocks)),
            blocks,
            scheduler,
            counters: Arc::new(FlushCounters::default()),
            clock,
            config,
        })
    }

    /// Configuration the store was opened with
    pub fn config(&self) -> &PancarteConfig {
        &self.config
    }

    /// Root of the block tree
    pub fn location(&self) -> &Path {
        self.blocks.root()
    }

    /// Ingest one low-frequency sample
    pub fn write_lf(&self, source_id: i64, type_id: i64, timestamp_micros: i64, value: f64) -> Result<()> {
        let record = LfRecord::new(source_id, type_id, timestamp_micros, value)?;
        self.ingest(record.into())
    }

    /// Ingest a run of high-frequency samples starting at `start_micros`
    pub fn write_hf(
        &self,
        source_id: i64,
        type_id: i64,
        start_micros: i64,
        frequency: f64,
        values: Vec<f64>,
    ) -> Result<()> {
        let record = HfRecord::new(source_id, type_id, start_micros, frequency, values)?;
        self.ingest(record.into())
    }

    fn ingest(&self, record: Record) -> Result<()> {
        let mut ingest = self.ingest.lock();
        if ingest.closed {
            return Err(Error::Closed);
        }
        let now = self.clock.now();
        if let Some(generation) = ingest.buffer.add(record, now) {
            // Queued before unlocking so close() can't miss a hand-off
            self.submit(generation);
        }
        Ok(())
    }

    /// Re-check the watermark without writing
    ///
    /// Lets a stream that has gone quiet still reach disk once its newest
    /// records are older than the lateness margin.
    pub fn tick(&self) -> Result<()> {
        let mut ingest = self.ingest.lock();
        if ingest.closed {
            return Err(Error::Closed);
        }
        if let Some(generation) = ingest.buffer.maybe_flush(self.clock.now()) {
            self.submit(generation);
        }
        Ok(())
    }

    /// Wait until every handed-off generation has been written
    ///
    /// Records still in the buffer are not forced out; see [`close`](Self::close).
    pub fn flush_pending(&self) {
        self.scheduler.drain();
    }

    /// Scan candidate blocks lazily
    pub fn read_blocks(&self, query: &RangeQuery) -> Result<BlockScan> {
        self.reader.read(query)
    }

    /// Read a range to completion
    ///
    /// Malformed blocks are skipped and listed in the result.
    pub fn read_all_blocks(&self, query: &RangeQuery) -> Result<RangeResult> {
        self.reader.read_all(query)
    }

    /// Write out everything buffered and stop the flush worker
    ///
    /// Later writes fail with [`Error::Closed`]; reads keep working.
    /// Calling `close` again does nothing.
    pub fn close(&self) {
        {
            let mut ingest = self.ingest.lock();
            if ingest.closed {
                return;
            }
            ingest.closed = true;
            if let Some(generation) = ingest.buffer.drain_all() {
                self.submit(generation);
            }
        }

        self.scheduler.drain();
        self.scheduler.shutdown();

        let stats = self.stats();
        info!(
            target: "pancarte::store",
            location = %self.config.location.display(),
            blocks_written = stats.blocks_written,
            flush_failures = stats.flush_failures,
            "Store closed"
        );
    }

    /// Whether `close` has run
    pub fn is_closed(&self) -> bool {
        self.ingest.lock().closed
    }

    /// Statistics snapshot
    pub fn stats(&self) -> StoreStats {
        let buffer = self.ingest.lock().buffer.stats();
        let scheduler = self.scheduler.stats();
        StoreStats {
            buffered_values: buffer.current_values,
            pending_values: buffer.pending_values,
            draining: buffer.draining,
            queued_flushes: scheduler.queue_depth + scheduler.active_tasks,
            blocks_written: self.counters.blocks_written.load(Ordering::Relaxed),
            flush_failures: self.counters.flush_failures.load(Ordering::Relaxed),
        }
    }

    fn submit(&self, generation: Generation) {
        debug!(
            target: "pancarte::store",
            span = ?generation.span(),
            values = generation.number_of_values(),
            "Generation handed off"
        );
        let blocks = Arc::clone(&self.blocks);
        let counters = Arc::clone(&self.counters);
        // Only rejected after close(), which stops ingestion first
        if self
            .scheduler
            .submit(move || write_generation(&blocks, &counters, generation))
            .is_err()
        {
            self.counters.flush_failures.fetch_add(1, Ordering::Relaxed);
            error!(target: "pancarte::store", "Flush worker stopped; generation dropped");
        }
    }
}

fn write_generation(blocks: &BlockStore, counters: &FlushCounters, generation: Generation) {
    match blocks.write_block(&generation) {
        Ok(_) => {
            counters.blocks_written.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            counters.flush_failures.fetch_add(1, Ordering::Relaxed);
            error!(
                target: "pancarte::store",
                span = ?generation.span(),
                values = generation.number_of_values(),
                error = %e,
                "Block write failed; generation lost"
            );
        }
    }
}

impl Drop for ImmutableStore {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ImmutableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImmutableStore")
            .field("location", &self.config.location)
            .field("stats", &self.stats())
            .finish()
    }
}
