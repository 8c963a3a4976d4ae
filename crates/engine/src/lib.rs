//! Store engine for pancarte
//!
//! This crate ties the lower layers together:
//! - ImmutableStore: open/close, ingestion, range reads
//! - Reorder buffer: size threshold and lateness watermark
//! - Flush worker: writes handed-off generations off the ingestion path
//! - Range reader: block scans with kind and field filters
//! - Configuration via `pancarte.toml`
//!
//! The engine is the only component that knows about time: it samples the
//! injected clock to drive the watermark.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod background;
pub mod clock;
pub mod config;
pub mod reader;
pub mod reorder_buffer;
pub mod store;

pub use background::{FlushScheduler, SchedulerClosed, SchedulerStats};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{PancarteConfig, CONFIG_FILE_NAME, DEFAULT_CACHE_SIZE, DEFAULT_LATENESS_MARGIN_MS};
pub use reader::{BlockRead, BlockScan, FieldValue, RangeQuery, RangeReader, RangeResult};
pub use reorder_buffer::{BufferStats, ReorderBuffer};
pub use store::{ImmutableStore, StoreStats};
