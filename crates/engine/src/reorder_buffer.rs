//! Reorder buffer
//!
//! Buffers incoming records in two generations and decides when the older
//! one may be written out:
//!
//! - `current` fills until it holds `cache_size` values, then the buffer
//!   starts *draining*.
//! - While draining, records older than the watermark (`now - margin`) still
//!   join `current`; fresher ones go to `pending`.
//! - `current` is handed off once every kind it holds has its newest key
//!   strictly below the watermark. `pending` then becomes `current`.
//!
//! The buffer itself never performs I/O and never fails. It is not
//! synchronized; the store wraps it in a single mutex so that insert,
//! threshold bookkeeping and the swap happen as one step.

use std::time::Duration;

use pancarte_core::{Generation, Record, RecordKind, Timestamp};

/// Snapshot of buffer occupancy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    /// Values in the flush candidate
    pub current_values: u64,
    /// Values held back for the next generation
    pub pending_values: u64,
    /// Whether the size threshold has been reached
    pub draining: bool,
}

/// Two-generation buffer with a size threshold and a lateness watermark
#[derive(Debug)]
pub struct ReorderBuffer {
    current: Generation,
    pending: Generation,
    draining: bool,
    cache_size: u64,
    lateness_margin: Duration,
}

impl ReorderBuffer {
    /// Create an empty buffer
    pub fn new(cache_size: u64, lateness_margin: Duration) -> Self {
        ReorderBuffer {
            current: Generation::new(),
            pending: Generation::new(),
            draining: false,
            cache_size,
            lateness_margin,
        }
    }

    /// Watermark at `now`
    pub fn watermark(&self, now: Timestamp) -> i64 {
        now.saturating_sub(self.lateness_margin).as_micros()
    }

    /// Insert a record, then check whether `current` can be handed off
    pub fn add(&mut self, record: Record, now: Timestamp) -> Option<Generation> {
        if self.draining && record.key() >= self.watermark(now) {
            self.pending.insert(record);
        } else {
            self.current.insert(record);
        }

        if !self.draining && self.current.number_of_values() >= self.cache_size {
            self.draining = true;
        }

        self.maybe_flush(now)
    }

    /// Hand off `current` if draining and every present kind is past the watermark
    pub fn maybe_flush(&mut self, now: Timestamp) -> Option<Generation> {
        if !self.draining {
            return None;
        }
        let watermark = self.watermark(now);
        let settled = RecordKind::ALL.iter().all(|kind| {
            self.current
                .max_key(*kind)
                .map_or(true, |max| max < watermark)
        });
        if !settled {
            return None;
        }

        let flushed = std::mem::replace(&mut self.current, std::mem::take(&mut self.pending));
        self.draining = false;
        debug_assert!(flushed.is_sorted());
        debug_assert!(self.pending.is_empty());

        if flushed.is_empty() {
            None
        } else {
            Some(flushed)
        }
    }

    /// Hand off everything buffered, ignoring the watermark
    ///
    /// `pending` is merged into `current`, so at most one generation comes
    /// out. Returns `None` when nothing is buffered.
    pub fn drain_all(&mut self) -> Option<Generation> {
        self.draining = false;
        let mut drained = std::mem::take(&mut self.current);
        drained.merge(std::mem::take(&mut self.pending));
        debug_assert!(drained.is_sorted());
        (!drained.is_empty()).then_some(drained)
    }

    /// Whether the size threshold has been reached
    pub fn is_draining(&self) -> bool {
        self.draining
    }

    /// Total values held in both generations
    pub fn buffered_values(&self) -> u64 {
        self.current.number_of_values() + self.pending.number_of_values()
    }

    /// Occupancy snapshot
    pub fn stats(&self) -> BufferStats {
        BufferStats {
            current_values: self.current.number_of_values(),
            pending_values: self.pending.number_of_values(),
            draining: self.draining,
        }
    }
}
