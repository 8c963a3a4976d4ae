//! Range reads over the block tree
//!
//! A read lists the candidate blocks for the query window, then decodes and
//! filters them one at a time:
//!
//! - lf records are kept when `start <= timestamp_micros < end`
//! - hf records are kept when `start_micros >= start` and `end_micros < end`
//! - every filter must match exactly
//!
//! Within a block the on-disk key order is preserved; blocks come back in
//! path order.

use std::path::PathBuf;
use std::sync::Arc;

use pancarte_core::{Error, HfColumns, LfColumns, RecordKind, RecordSet, Result};
use pancarte_durability::BlockStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Value a filter compares against
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Integer comparand
    Int(i64),
    /// Float comparand
    Float(f64),
}

impl FieldValue {
    fn eq_i64(&self, v: i64) -> bool {
        match *self {
            FieldValue::Int(x) => x == v,
            FieldValue::Float(x) => x == v as f64,
        }
    }

    fn eq_f64(&self, v: f64) -> bool {
        match *self {
            FieldValue::Int(x) => x as f64 == v,
            FieldValue::Float(x) => x == v,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

/// A range query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeQuery {
    /// Inclusive lower bound, microseconds
    pub start_micros: i64,
    /// Exclusive upper bound, microseconds
    pub end_micros: i64,
    /// Return lf records
    pub lf: bool,
    /// Return hf records
    pub hf: bool,
    /// Exact-match filters on scalar fields
    #[serde(default)]
    pub filters: Vec<(String, FieldValue)>,
}

impl RangeQuery {
    /// Both kinds over `[start_micros, end_micros)`, no filters
    pub fn new(start_micros: i64, end_micros: i64) -> Self {
        RangeQuery {
            start_micros,
            end_micros,
            lf: true,
            hf: true,
            filters: Vec::new(),
        }
    }

    /// Choose which kinds to return
    pub fn with_kinds(mut self, lf: bool, hf: bool) -> Self {
        self.lf = lf;
        self.hf = hf;
        self
    }

    /// Require `field == value`
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    fn kinds(&self) -> impl Iterator<Item = RecordKind> + '_ {
        RecordKind::ALL.into_iter().filter(move |k| match k {
            RecordKind::Lf => self.lf,
            RecordKind::Hf => self.hf,
        })
    }

    /// Reject filters on fields a requested kind does not have
    pub fn validate(&self) -> Result<()> {
        for (field, _) in &self.filters {
            if let Some(kind) = self.kinds().find(|k| !k.has_field(field)) {
                return Err(Error::UnknownFilterField {
                    field: field.clone(),
                    kind,
                });
            }
        }
        Ok(())
    }

    fn keep_lf(&self, lf: &LfColumns, i: usize) -> bool {
        let ts = lf.timestamp_micros[i];
        if ts < self.start_micros || ts >= self.end_micros {
            return false;
        }
        self.filters.iter().all(|(field, want)| match field.as_str() {
            "source_id" => want.eq_i64(lf.source_id[i]),
            "type_id" => want.eq_i64(lf.type_id[i]),
            "timestamp_micros" => want.eq_i64(ts),
            "value" => want.eq_f64(lf.value[i]),
            _ => false,
        })
    }

    fn keep_hf(&self, hf: &HfColumns, i: usize) -> bool {
        if hf.start_micros[i] < self.start_micros || hf.end_micros[i] >= self.end_micros {
            return false;
        }
        self.filters.iter().all(|(field, want)| match field.as_str() {
            "source_id" => want.eq_i64(hf.source_id[i]),
            "type_id" => want.eq_i64(hf.type_id[i]),
            "start_micros" => want.eq_i64(hf.start_micros[i]),
            "end_micros" => want.eq_i64(hf.end_micros[i]),
            "frequency" => want.eq_f64(hf.frequency[i]),
            _ => false,
        })
    }

    /// Rows of `block` this query selects
    pub fn select(&self, block: &RecordSet) -> RecordSet {
        let mut out = RecordSet::new();
        if self.lf {
            for i in (0..block.lf.len()).filter(|i| self.keep_lf(&block.lf, *i)) {
                out.lf.push_row(&block.lf, i);
            }
        }
        if self.hf {
            for i in (0..block.hf.len()).filter(|i| self.keep_hf(&block.hf, *i)) {
                out.hf.push_row(&block.hf, i);
            }
        }
        out
    }
}

/// Records selected from one block
#[derive(Debug, Clone, PartialEq)]
pub struct BlockRead {
    /// Block file the records came from
    pub path: PathBuf,
    /// Selected records
    pub records: RecordSet,
}

/// Result of [`RangeReader::read_all`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeResult {
    /// Selected records, concatenated in block order
    pub records: RecordSet,
    /// Blocks visited successfully
    pub blocks_read: usize,
    /// Blocks skipped because they could not be decoded
    pub malformed_blocks: Vec<PathBuf>,
}

/// Lazy scan over candidate blocks
///
/// Yields one item per candidate block. A block that fails to decode yields
/// `Err(Error::MalformedBlock)` and the scan moves on.
pub struct BlockScan {
    store: Arc<BlockStore>,
    query: RangeQuery,
    paths: std::vec::IntoIter<PathBuf>,
}

impl Iterator for BlockScan {
    type Item = Result<BlockRead>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.next()?;
        let item = self
            .store
            .read_block(&path)
            .map(|block| BlockRead {
                records: self.query.select(&block),
                path,
            })
            .map_err(Error::from);
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.paths.size_hint()
    }
}

/// Reads record ranges from a block store
#[derive(Debug, Clone)]
pub struct RangeReader {
    store: Arc<BlockStore>,
}

impl RangeReader {
    /// Reader over `store`
    pub fn new(store: Arc<BlockStore>) -> Self {
        RangeReader { store }
    }

    /// Start a scan; each call lists blocks afresh
    ///
    /// # Errors
    ///
    /// `UnknownFilterField` for a bad filter, or an I/O error while listing.
    pub fn read(&self, query: &RangeQuery) -> Result<BlockScan> {
        query.validate()?;
        let paths = if (!query.lf && !query.hf) || query.start_micros >= query.end_micros {
            Vec::new()
        } else {
            self.store.find_blocks(query.start_micros, query.end_micros)?
        };
        debug!(
            target: "pancarte::reader",
            start = query.start_micros,
            end = query.end_micros,
            candidates = paths.len(),
            "Range scan started"
        );
        Ok(BlockScan {
            store: Arc::clone(&self.store),
            query: query.clone(),
            paths: paths.into_iter(),
        })
    }

    /// Run a scan to completion, skipping malformed blocks
    pub fn read_all(&self, query: &RangeQuery) -> Result<RangeResult> {
        let mut result = RangeResult::default();
        for item in self.read(query)? {
            match item {
                Ok(read) => {
                    result.records.extend(read.records);
                    result.blocks_read += 1;
                }
                Err(Error::MalformedBlock { path, reason }) => {
                    warn!(target: "pancarte::reader", path = %path.display(), reason = %reason, "Skipping malformed block");
                    result.malformed_blocks.push(path);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(result)
    }
}
