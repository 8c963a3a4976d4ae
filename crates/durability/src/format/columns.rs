//! Little-endian column encoding
//!
//! Columns are written as a contiguous run of 8-byte little-endian values.
//! Integers keep full 64-bit precision; floats are stored by bit pattern,
//! so NaN payloads and signed zeros survive a round trip.

use byteorder::{ByteOrder, LittleEndian};

use super::block::BlockFormatError;

/// Append a `u64` length or count
pub fn put_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Append an `i64` column
pub fn put_i64_column(buf: &mut Vec<u8>, col: &[i64]) {
    let start = grow(buf, col.len());
    LittleEndian::write_i64_into(col, &mut buf[start..]);
}

/// Append a `u64` column
pub fn put_u64_column(buf: &mut Vec<u8>, col: &[u64]) {
    let start = grow(buf, col.len());
    LittleEndian::write_u64_into(col, &mut buf[start..]);
}

/// Append an `f64` column
pub fn put_f64_column(buf: &mut Vec<u8>, col: &[f64]) {
    let start = grow(buf, col.len());
    LittleEndian::write_f64_into(col, &mut buf[start..]);
}

fn grow(buf: &mut Vec<u8>, n: usize) -> usize {
    let start = buf.len();
    buf.resize(start + n * 8, 0);
    start
}

/// Cursor over one section's bytes
///
/// Every read is bounds-checked before allocating, so a corrupt count can
/// not make the decoder reserve more memory than the section holds.
pub struct ColumnReader<'a> {
    data: &'a [u8],
    pos: usize,
    section: &'static str,
}

impl<'a> ColumnReader<'a> {
    /// Wrap a section payload
    pub fn new(data: &'a [u8], section: &'static str) -> Self {
        ColumnReader {
            data,
            pos: 0,
            section,
        }
    }

    /// Bytes not consumed yet
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n_values: u64, what: &'static str) -> Result<&'a [u8], BlockFormatError> {
        let len = usize::try_from(n_values)
            .ok()
            .and_then(|n| n.checked_mul(8))
            .filter(|len| *len <= self.remaining())
            .ok_or(BlockFormatError::Truncated {
                section: self.section,
                what,
            })?;
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Read a `u64` length or count
    pub fn u64(&mut self, what: &'static str) -> Result<u64, BlockFormatError> {
        let bytes = self.take(1, what)?;
        Ok(LittleEndian::read_u64(bytes))
    }

    /// Read an `i64` column of `n` values
    pub fn i64_column(&mut self, n: u64, what: &'static str) -> Result<Vec<i64>, BlockFormatError> {
        let bytes = self.take(n, what)?;
        let mut col = vec![0i64; bytes.len() / 8];
        LittleEndian::read_i64_into(bytes, &mut col);
        Ok(col)
    }

    /// Read a `u64` column of `n` values
    pub fn u64_column(&mut self, n: u64, what: &'static str) -> Result<Vec<u64>, BlockFormatError> {
        let bytes = self.take(n, what)?;
        let mut col = vec![0u64; bytes.len() / 8];
        LittleEndian::read_u64_into(bytes, &mut col);
        Ok(col)
    }

    /// Read an `f64` column of `n` values
    pub fn f64_column(&mut self, n: u64, what: &'static str) -> Result<Vec<f64>, BlockFormatError> {
        let bytes = self.take(n, what)?;
        let mut col = vec![0f64; bytes.len() / 8];
        LittleEndian::read_f64_into(bytes, &mut col);
        Ok(col)
    }

    /// Fail if any bytes were left unread
    pub fn finish(self) -> Result<(), BlockFormatError> {
        if self.remaining() != 0 {
            return Err(BlockFormatError::TrailingBytes {
                section: self.section,
                extra: self.remaining(),
            });
        }
        Ok(())
    }
}
