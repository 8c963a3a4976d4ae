//! Pancarte - time-partitioned block store for physiological signals
//!
//! Pancarte ingests two kinds of records:
//! - lf (low frequency): one value per timestamp
//! - hf (high frequency): a run of samples at a fixed rate
//!
//! Records are buffered and reordered in memory, then written as immutable
//! columnar blocks under calendar partition directories. Range reads find
//! the overlapping blocks and filter their contents.
//!
//! # Quick Start
//!
//! ```ignore
//! use pancarte::{ImmutableStore, PancarteConfig, RangeQuery};
//!
//! let store = ImmutableStore::open(PancarteConfig::new("/var/lib/pancarte"))?;
//! store.write_lf(7, 1, 1_700_000_000_000_000, 36.6)?;
//! store.write_hf(7, 2, 1_700_000_000_000_000, 250.0, samples)?;
//! store.close();
//!
//! let result = store.read_all_blocks(
//!     &RangeQuery::new(1_700_000_000_000_000, 1_700_000_060_000_000).filter("source_id", 7i64),
//! )?;
//! ```

pub use pancarte_core::{
    Error, Generation, HfColumns, HfRecord, LfColumns, LfRecord, Record, RecordKind, RecordSet,
    Result, Timestamp, MAX_INGEST_MICROS, MIN_INGEST_MICROS,
};
pub use pancarte_durability::{BlockInfo, BlockStore, PartitionDepth, PartitionLayout};
pub use pancarte_engine::*;
