//! Core types for pancarte
//!
//! This crate defines the foundational types used throughout the system:
//! - Record model: `LfRecord`, `HfRecord`, `Record`, `RecordKind`
//! - Generation: key-sorted buffered records plus their value count
//! - RecordSet: columnar form used by blocks and range reads
//! - Timestamp: microsecond clock values and the ingestible range
//! - Error: error taxonomy shared by every layer

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod generation;
pub mod record;
pub mod record_set;
pub mod timestamp;

pub use error::{Error, Result};
pub use generation::Generation;
pub use record::{end_micros_for, HfRecord, LfRecord, Record, RecordKind};
pub use record_set::{HfColumns, LfColumns, RecordSet};
pub use timestamp::{validate_micros, Timestamp, MAX_INGEST_MICROS, MIN_INGEST_MICROS};
