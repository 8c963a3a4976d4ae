//! Record model
//!
//! Two record kinds are ingested:
//!
//! - [`LfRecord`]: one scalar sample at one timestamp ("low frequency")
//! - [`HfRecord`]: a run of samples starting at `start_micros` and taken at a
//!   fixed `frequency` in Hz ("high frequency")
//!
//! Records are validated when constructed, so anything that reaches the
//! reorder buffer is well formed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::timestamp::{validate_micros, MAX_INGEST_MICROS};

/// Record kind discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Low-frequency scalar sample
    Lf,
    /// High-frequency sample run
    Hf,
}

impl RecordKind {
    /// All kinds, in block section order
    pub const ALL: [RecordKind; 2] = [RecordKind::Lf, RecordKind::Hf];

    /// Short lowercase name (`"lf"` / `"hf"`)
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Lf => "lf",
            RecordKind::Hf => "hf",
        }
    }

    /// Name of the column that orders records of this kind
    pub fn key_field(&self) -> &'static str {
        match self {
            RecordKind::Lf => "timestamp_micros",
            RecordKind::Hf => "start_micros",
        }
    }

    /// Scalar columns of this kind, usable as equality filters
    pub fn scalar_fields(&self) -> &'static [&'static str] {
        match self {
            RecordKind::Lf => &["source_id", "type_id", "timestamp_micros", "value"],
            RecordKind::Hf => &["source_id", "type_id", "start_micros", "end_micros", "frequency"],
        }
    }

    /// Whether `field` is a scalar column of this kind
    pub fn has_field(&self, field: &str) -> bool {
        self.scalar_fields().contains(&field)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Low-frequency record: one value per timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LfRecord {
    /// Signal source (bed, device, patient...)
    pub source_id: i64,
    /// Signal type
    pub type_id: i64,
    /// Sample time, microseconds since epoch
    pub timestamp_micros: i64,
    /// Sample value
    pub value: f64,
}

impl LfRecord {
    /// Create a validated lf record
    pub fn new(source_id: i64, type_id: i64, timestamp_micros: i64, value: f64) -> Result<Self> {
        validate_micros("timestamp_micros", timestamp_micros)?;
        Ok(LfRecord {
            source_id,
            type_id,
            timestamp_micros,
            value,
        })
    }
}

/// High-frequency record: a run of samples at a fixed rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HfRecord {
    /// Signal source
    pub source_id: i64,
    /// Signal type
    pub type_id: i64,
    /// Time of the first sample
    pub start_micros: i64,
    /// `start_micros` plus the duration covered by `values`
    pub end_micros: i64,
    /// Sampling frequency in Hz
    pub frequency: f64,
    /// Samples, in acquisition order
    pub values: Vec<f64>,
}

impl HfRecord {
    /// Create a validated hf record, deriving `end_micros`
    ///
    /// `end_micros = start_micros + round(len(values) / frequency * 1e6)`.
    pub fn new(
        source_id: i64,
        type_id: i64,
        start_micros: i64,
        frequency: f64,
        values: Vec<f64>,
    ) -> Result<Self> {
        validate_micros("start_micros", start_micros)?;
        let end_micros = end_micros_for(start_micros, frequency, values.len())?;
        Ok(HfRecord {
            source_id,
            type_id,
            start_micros,
            end_micros,
            frequency,
            values,
        })
    }

    /// Number of samples in this run
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the run carries no samples
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Compute the end of a sample run
pub fn end_micros_for(start_micros: i64, frequency: f64, sample_count: usize) -> Result<i64> {
    if !frequency.is_finite() || frequency <= 0.0 {
        return Err(Error::validation(format!(
            "frequency must be a positive finite number, got {}",
            frequency
        )));
    }
    let span = (sample_count as f64 / frequency * 1_000_000.0).round();
    if !span.is_finite() || span > (MAX_INGEST_MICROS - start_micros) as f64 {
        return Err(Error::validation(format!(
            "{} samples at {} Hz starting at {} end past the supported range",
            sample_count, frequency, start_micros
        )));
    }
    Ok(start_micros + span as i64)
}

/// A record of either kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record {
    /// Low-frequency record
    Lf(LfRecord),
    /// High-frequency record
    Hf(HfRecord),
}

impl Record {
    /// Kind of this record
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Lf(_) => RecordKind::Lf,
            Record::Hf(_) => RecordKind::Hf,
        }
    }

    /// Ordering key (`timestamp_micros` for lf, `start_micros` for hf)
    pub fn key(&self) -> i64 {
        match self {
            Record::Lf(r) => r.timestamp_micros,
            Record::Hf(r) => r.start_micros,
        }
    }

    /// Number of values this record contributes to a generation
    pub fn value_count(&self) -> u64 {
        match self {
            Record::Lf(_) => 1,
            Record::Hf(r) => r.values.len() as u64,
        }
    }
}

impl From<LfRecord> for Record {
    fn from(r: LfRecord) -> Self {
        Record::Lf(r)
    }
}

impl From<HfRecord> for Record {
    fn from(r: HfRecord) -> Self {
        Record::Hf(r)
    }
}
