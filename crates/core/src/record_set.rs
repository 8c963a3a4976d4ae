//! Columnar record sets
//!
//! Blocks store each kind column by column, and reads hand results back in
//! the same shape. A [`RecordSet`] is what a decoded block looks like and
//! what a range read returns.

use serde::{Deserialize, Serialize};

use crate::generation::Generation;
use crate::record::{HfRecord, LfRecord, RecordKind};

/// lf records as parallel columns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LfColumns {
    /// `source_id` column
    pub source_id: Vec<i64>,
    /// `type_id` column
    pub type_id: Vec<i64>,
    /// `timestamp_micros` column
    pub timestamp_micros: Vec<i64>,
    /// `value` column
    pub value: Vec<f64>,
}

impl LfColumns {
    /// Number of rows
    pub fn len(&self) -> usize {
        self.timestamp_micros.len()
    }

    /// Whether there are no rows
    pub fn is_empty(&self) -> bool {
        self.timestamp_micros.is_empty()
    }

    /// Append one record
    pub fn push(&mut self, r: &LfRecord) {
        self.source_id.push(r.source_id);
        self.type_id.push(r.type_id);
        self.timestamp_micros.push(r.timestamp_micros);
        self.value.push(r.value);
    }

    /// Copy row `idx` of `other` onto the end of `self`
    pub fn push_row(&mut self, other: &LfColumns, idx: usize) {
        self.source_id.push(other.source_id[idx]);
        self.type_id.push(other.type_id[idx]);
        self.timestamp_micros.push(other.timestamp_micros[idx]);
        self.value.push(other.value[idx]);
    }

    /// Append all rows of `other`
    pub fn extend(&mut self, other: LfColumns) {
        self.source_id.extend(other.source_id);
        self.type_id.extend(other.type_id);
        self.timestamp_micros.extend(other.timestamp_micros);
        self.value.extend(other.value);
    }

    /// Reassemble row `idx` as a record
    pub fn row(&self, idx: usize) -> LfRecord {
        LfRecord {
            source_id: self.source_id[idx],
            type_id: self.type_id[idx],
            timestamp_micros: self.timestamp_micros[idx],
            value: self.value[idx],
        }
    }
}

/// hf records as parallel columns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HfColumns {
    /// `source_id` column
    pub source_id: Vec<i64>,
    /// `type_id` column
    pub type_id: Vec<i64>,
    /// `start_micros` column
    pub start_micros: Vec<i64>,
    /// `end_micros` column
    pub end_micros: Vec<i64>,
    /// `frequency` column
    pub frequency: Vec<f64>,
    /// `values` column, one sample run per row
    pub values: Vec<Vec<f64>>,
}

impl HfColumns {
    /// Number of rows
    pub fn len(&self) -> usize {
        self.start_micros.len()
    }

    /// Whether there are no rows
    pub fn is_empty(&self) -> bool {
        self.start_micros.is_empty()
    }

    /// Total samples across all rows
    pub fn value_count(&self) -> usize {
        self.values.iter().map(Vec::len).sum()
    }

    /// Append one record
    pub fn push(&mut self, r: &HfRecord) {
        self.source_id.push(r.source_id);
        self.type_id.push(r.type_id);
        self.start_micros.push(r.start_micros);
        self.end_micros.push(r.end_micros);
        self.frequency.push(r.frequency);
        self.values.push(r.values.clone());
    }

    /// Copy row `idx` of `other` onto the end of `self`
    pub fn push_row(&mut self, other: &HfColumns, idx: usize) {
        self.source_id.push(other.source_id[idx]);
        self.type_id.push(other.type_id[idx]);
        self.start_micros.push(other.start_micros[idx]);
        self.end_micros.push(other.end_micros[idx]);
        self.frequency.push(other.frequency[idx]);
        self.values.push(other.values[idx].clone());
    }

    /// Append all rows of `other`
    pub fn extend(&mut self, other: HfColumns) {
        self.source_id.extend(other.source_id);
        self.type_id.extend(other.type_id);
        self.start_micros.extend(other.start_micros);
        self.end_micros.extend(other.end_micros);
        self.frequency.extend(other.frequency);
        self.values.extend(other.values);
    }

    /// Reassemble row `idx` as a record
    pub fn row(&self, idx: usize) -> HfRecord {
        HfRecord {
            source_id: self.source_id[idx],
            type_id: self.type_id[idx],
            start_micros: self.start_micros[idx],
            end_micros: self.end_micros[idx],
            frequency: self.frequency[idx],
            values: self.values[idx].clone(),
        }
    }
}

/// Records of both kinds in columnar form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    /// Low-frequency records
    pub lf: LfColumns,
    /// High-frequency records
    pub hf: HfColumns,
}

impl RecordSet {
    /// Create an empty record set
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows of one kind
    pub fn kind_len(&self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::Lf => self.lf.len(),
            RecordKind::Hf => self.hf.len(),
        }
    }

    /// Total rows
    pub fn len(&self) -> usize {
        self.lf.len() + self.hf.len()
    }

    /// Whether both kinds are empty
    pub fn is_empty(&self) -> bool {
        self.lf.is_empty() && self.hf.is_empty()
    }

    /// Append every row of `other`, kind by kind
    pub fn extend(&mut self, other: RecordSet) {
        self.lf.extend(other.lf);
        self.hf.extend(other.hf);
    }
}

impl From<&Generation> for RecordSet {
    fn from(generation: &Generation) -> Self {
        let mut set = RecordSet::new();
        for (_, r) in generation.lf() {
            set.lf.push(r);
        }
        for (_, r) in generation.hf() {
            set.hf.push(r);
        }
        set
    }
}
