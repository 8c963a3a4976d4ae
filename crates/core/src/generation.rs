//! Generation: one flush cycle's worth of buffered records
//!
//! A generation keeps, per record kind, a sequence of `(key, record)` pairs
//! sorted ascending by key. Records with equal keys keep arrival order.
//! It also tracks `number_of_values`: 1 per lf record, `values.len()` per hf
//! record. The reorder buffer uses that count as its size threshold.

use crate::record::{HfRecord, LfRecord, Record, RecordKind};

/// Buffered records of all kinds, sorted by key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    lf: Vec<(i64, LfRecord)>,
    hf: Vec<(i64, HfRecord)>,
    number_of_values: u64,
}

impl Generation {
    /// Create an empty generation
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record at its sorted position
    ///
    /// The insertion point is found by binary search and placed after any
    /// existing records with the same key.
    pub fn insert(&mut self, record: Record) {
        self.number_of_values += record.value_count();
        let key = record.key();
        match record {
            Record::Lf(r) => insert_sorted(&mut self.lf, key, r),
            Record::Hf(r) => insert_sorted(&mut self.hf, key, r),
        }
    }

    /// Move every record of `other` into this generation
    ///
    /// Records of `other` land after records here with the same key.
    pub fn merge(&mut self, other: Generation) {
        self.number_of_values += other.number_of_values;
        for (key, r) in other.lf {
            insert_sorted(&mut self.lf, key, r);
        }
        for (key, r) in other.hf {
            insert_sorted(&mut self.hf, key, r);
        }
    }

    /// Sorted lf pairs
    pub fn lf(&self) -> &[(i64, LfRecord)] {
        &self.lf
    }

    /// Sorted hf pairs
    pub fn hf(&self) -> &[(i64, HfRecord)] {
        &self.hf
    }

    /// Aggregate value count
    pub fn number_of_values(&self) -> u64 {
        self.number_of_values
    }

    /// Number of records of one kind
    pub fn kind_len(&self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::Lf => self.lf.len(),
            RecordKind::Hf => self.hf.len(),
        }
    }

    /// Total number of records
    pub fn len(&self) -> usize {
        self.lf.len() + self.hf.len()
    }

    /// Whether no record of any kind is buffered
    pub fn is_empty(&self) -> bool {
        self.lf.is_empty() && self.hf.is_empty()
    }

    /// Smallest key of one kind, if any record of that kind is present
    pub fn min_key(&self, kind: RecordKind) -> Option<i64> {
        match kind {
            RecordKind::Lf => self.lf.first().map(|(k, _)| *k),
            RecordKind::Hf => self.hf.first().map(|(k, _)| *k),
        }
    }

    /// Largest key of one kind, if any record of that kind is present
    pub fn max_key(&self, kind: RecordKind) -> Option<i64> {
        match kind {
            RecordKind::Lf => self.lf.last().map(|(k, _)| *k),
            RecordKind::Hf => self.hf.last().map(|(k, _)| *k),
        }
    }

    /// `(min key, max key)` across all kinds; `None` when empty
    pub fn span(&self) -> Option<(i64, i64)> {
        let start = RecordKind::ALL.iter().filter_map(|k| self.min_key(*k)).min()?;
        let end = RecordKind::ALL.iter().filter_map(|k| self.max_key(*k)).max()?;
        Some((start, end))
    }

    /// Whether every kind's sequence is sorted by key
    pub fn is_sorted(&self) -> bool {
        self.lf.windows(2).all(|w| w[0].0 <= w[1].0)
            && self.hf.windows(2).all(|w| w[0].0 <= w[1].0)
    }
}

fn insert_sorted<T>(seq: &mut Vec<(i64, T)>, key: i64, record: T) {
    let pos = seq.partition_point(|(k, _)| *k <= key);
    seq.insert(pos, (key, record));
}
