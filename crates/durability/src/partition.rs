//! Calendar partition layout
//!
//! Blocks live under a directory derived from their `block_start`, formatted
//! as UTC calendar components and truncated to the configured depth:
//!
//! ```text
//! depth 1: 2024/
//! depth 4: 2024/03/09/17/            (default)
//! depth 6: 2024/03/09/17/05/42/
//! ```
//!
//! Year is always four digits; every other component is two.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, NaiveDate, Timelike};
use pancarte_core::{MAX_INGEST_MICROS, MIN_INGEST_MICROS};

use crate::block_store::BlockStoreError;

/// Number of calendar components in a partition path
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionDepth(u8);

impl PartitionDepth {
    /// Year only
    pub const MIN: u8 = 1;
    /// Down to the second
    pub const MAX: u8 = 6;
    /// Year/month/day/hour
    pub const DEFAULT: PartitionDepth = PartitionDepth(4);

    /// Create a depth, `None` outside `1..=6`
    pub fn new(depth: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX)
            .contains(&depth)
            .then_some(PartitionDepth(depth))
    }

    /// Depth as a number of directory levels
    pub fn get(self) -> usize {
        self.0 as usize
    }
}

impl Default for PartitionDepth {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Calendar components in path order
const COMPONENT_WIDTHS: [usize; 6] = [4, 2, 2, 2, 2, 2];
const COMPONENT_RANGES: [(u32, u32); 6] = [(0, 9999), (1, 12), (1, 31), (0, 23), (0, 59), (0, 59)];

/// Maps timestamps to partition directories and back
#[derive(Debug, Clone, Copy, Default)]
pub struct PartitionLayout {
    depth: PartitionDepth,
}

impl PartitionLayout {
    /// Create a layout with the given depth
    pub fn new(depth: PartitionDepth) -> Self {
        PartitionLayout { depth }
    }

    /// Configured depth
    pub fn depth(&self) -> PartitionDepth {
        self.depth
    }

    /// Calendar components of `micros`, truncated to the depth
    pub fn components(&self, micros: i64) -> Result<Vec<u32>, BlockStoreError> {
        if !(MIN_INGEST_MICROS..=MAX_INGEST_MICROS).contains(&micros) {
            return Err(BlockStoreError::TimestampOutOfRange { micros });
        }
        let dt = DateTime::from_timestamp_micros(micros)
            .ok_or(BlockStoreError::TimestampOutOfRange { micros })?;
        let all = [
            dt.year() as u32,
            dt.month(),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second(),
        ];
        Ok(all[..self.depth.get()].to_vec())
    }

    /// Relative directory for a block starting at `micros`
    pub fn relative_path(&self, micros: i64) -> Result<PathBuf, BlockStoreError> {
        let mut path = PathBuf::new();
        for (level, value) in self.components(micros)?.into_iter().enumerate() {
            path.push(format_component(level, value));
        }
        Ok(path)
    }

    /// Absolute directory for a block starting at `micros` under `root`
    pub fn path_for(&self, root: &Path, micros: i64) -> Result<PathBuf, BlockStoreError> {
        Ok(root.join(self.relative_path(micros)?))
    }
}

/// Render one component at its fixed width
pub fn format_component(level: usize, value: u32) -> String {
    format!("{:0width$}", value, width = COMPONENT_WIDTHS[level])
}

/// Parse a directory name at `level`
///
/// Only names written by [`format_component`] are accepted.
pub fn parse_component(level: usize, name: &str) -> Option<u32> {
    let width = *COMPONENT_WIDTHS.get(level)?;
    if name.len() != width || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u32 = name.parse().ok()?;
    let (lo, hi) = COMPONENT_RANGES[level];
    (lo..=hi).contains(&value).then_some(value)
}

/// First microsecond of the calendar window named by `components`
///
/// Missing trailing components default to the start of their range. Returns
/// `None` for prefixes that name no real date, such as February 30th.
pub fn window_start_micros(components: &[u32]) -> Option<i64> {
    let get = |i: usize, default: u32| components.get(i).copied().unwrap_or(default);
    let date = NaiveDate::from_ymd_opt(get(0, 1970) as i32, get(1, 1), get(2, 1))?;
    let time = date.and_hms_opt(get(3, 0), get(4, 0), get(5, 0))?;
    Some(time.and_utc().timestamp_micros())
}
