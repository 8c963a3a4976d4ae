//! Microsecond-precision timestamps
//!
//! Every record key in the store is a count of microseconds since the Unix
//! epoch (1970-01-01 00:00:00 UTC), carried as a signed 64-bit integer.
//!
//! ## Accepted range
//!
//! Ingestion accepts keys in `[MIN_INGEST_MICROS, MAX_INGEST_MICROS]`,
//! i.e. 1970-01-01 through 9999-12-31T23:59:59.999999Z. Inside that range
//! partition directories always carry four-digit years and block file names
//! stay fixed width, so lexicographic order equals chronological order.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// Smallest key accepted for ingestion (Unix epoch)
pub const MIN_INGEST_MICROS: i64 = 0;

/// Largest key accepted for ingestion (9999-12-31T23:59:59.999999Z)
pub const MAX_INGEST_MICROS: i64 = 253_402_300_799_999_999;

/// Microsecond-precision point in time
///
/// Used for "now" and for the lateness watermark. Record fields keep the
/// raw `i64` representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Unix epoch (1970-01-01 00:00:00 UTC)
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Create a timestamp for the current moment
    ///
    /// Returns epoch if the system clock is before the Unix epoch.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_micros() as i64)
    }

    /// Create a timestamp from microseconds since epoch
    #[inline]
    pub const fn from_micros(micros: i64) -> Self {
        Timestamp(micros)
    }

    /// Create a timestamp from seconds since epoch
    #[inline]
    pub const fn from_secs(secs: i64) -> Self {
        Timestamp(secs.saturating_mul(1_000_000))
    }

    /// Get microseconds since Unix epoch
    #[inline]
    pub const fn as_micros(&self) -> i64 {
        self.0
    }

    /// Add a duration, saturating at `i64::MAX`
    pub fn saturating_add(&self, duration: Duration) -> Self {
        Timestamp(self.0.saturating_add(duration_micros(duration)))
    }

    /// Subtract a duration, saturating at `i64::MIN`
    ///
    /// This is how the lateness watermark is derived: `now - margin`.
    pub fn saturating_sub(&self, duration: Duration) -> Self {
        Timestamp(self.0.saturating_sub(duration_micros(duration)))
    }
}

fn duration_micros(duration: Duration) -> i64 {
    i64::try_from(duration.as_micros()).unwrap_or(i64::MAX)
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::EPOCH
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let secs = self.0.div_euclid(1_000_000);
        let micros = self.0.rem_euclid(1_000_000);
        write!(f, "{}.{:06}", secs, micros)
    }
}

impl From<i64> for Timestamp {
    fn from(micros: i64) -> Self {
        Timestamp::from_micros(micros)
    }
}

impl From<Timestamp> for i64 {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

/// Check that a record key lies in the ingestible range
pub fn validate_micros(field: &str, micros: i64) -> Result<()> {
    if !(MIN_INGEST_MICROS..=MAX_INGEST_MICROS).contains(&micros) {
        return Err(Error::validation(format!(
            "{} = {} is outside the supported range [{}, {}]",
            field, micros, MIN_INGEST_MICROS, MAX_INGEST_MICROS
        )));
    }
    Ok(())
}
