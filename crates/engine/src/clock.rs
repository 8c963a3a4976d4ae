//! Time source for the lateness watermark
//!
//! The store asks its clock for "now" every time it evaluates the watermark.
//! Production code uses [`SystemClock`]; tests drive a [`ManualClock`].

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use pancarte_core::Timestamp;

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Current time in microseconds since the Unix epoch
    fn now(&self) -> Timestamp;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicI64,
}

impl ManualClock {
    /// Create a clock stopped at `start`
    pub fn new(start: Timestamp) -> Self {
        ManualClock {
            micros: AtomicI64::new(start.as_micros()),
        }
    }

    /// Jump to `ts`
    pub fn set(&self, ts: Timestamp) {
        self.micros.store(ts.as_micros(), Ordering::SeqCst);
    }

    /// Move forward by `duration`
    pub fn advance(&self, duration: Duration) {
        let delta = i64::try_from(duration.as_micros()).unwrap_or(i64::MAX);
        let _ = self
            .micros
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |m| Some(m.saturating_add(delta)));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_micros(self.micros.load(Ordering::SeqCst))
    }
}
