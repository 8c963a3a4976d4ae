//! On-disk byte formats for blocks.
//!
//! This module centralizes block serialization and block file naming.
//! Keeping serialization separate from operational logic (how blocks are
//! placed, written and discovered) makes format evolution easier to manage.
//!
//! # Module Structure
//!
//! - `block`: block header, sections, encode/decode
//! - `columns`: little-endian column encoding shared by sections

pub mod block;
pub mod columns;

pub use block::{
    decode_block, encode_block, section_tags, BlockFormatError, BlockHeader, DecodedBlock,
    BLOCK_FORMAT_VERSION, BLOCK_HEADER_SIZE, BLOCK_MAGIC,
};

/// Block file extension, format version included
pub const BLOCK_EXTENSION: &str = ".v1.pblk";

/// Largest sequence number a block name can carry
pub const MAX_BLOCK_SEQUENCE: u32 = 9_999;

const KEY_WIDTH: usize = 19;
const SEQUENCE_WIDTH: usize = 4;

/// Identity of a block file: its span plus a sequence number
///
/// The first block for a span is named `<start>-<end>.v1.pblk`. Later blocks
/// with the same span get `<start>-<end>-<seq>.v1.pblk`, `seq` counting up
/// from 1. Ordering is by span, then sequence, which is write order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockName {
    /// Smallest key in the block
    pub start: i64,
    /// Largest key in the block
    pub end: i64,
    /// 0 for the first block with this span
    pub sequence: u32,
}

impl BlockName {
    /// First name for a span
    pub fn new(start: i64, end: i64) -> Self {
        BlockName {
            start,
            end,
            sequence: 0,
        }
    }

    /// Same span, given sequence number
    pub fn with_sequence(self, sequence: u32) -> Self {
        BlockName { sequence, ..self }
    }

    /// File name on disk
    ///
    /// Keys are zero-padded to a fixed width so that names sort in key order.
    pub fn file_name(&self) -> String {
        if self.sequence == 0 {
            format!("{:019}-{:019}{}", self.start, self.end, BLOCK_EXTENSION)
        } else {
            format!(
                "{:019}-{:019}-{:04}{}",
                self.start, self.end, self.sequence, BLOCK_EXTENSION
            )
        }
    }
}

/// File name for the first block covering `[start, end]`
pub fn block_file_name(start: i64, end: i64) -> String {
    BlockName::new(start, end).file_name()
}

/// Name of the temporary file a block is written to before it is linked
pub fn temp_file_name(final_name: &str) -> String {
    format!(".{}.tmp", final_name)
}

/// Parse a block file name
///
/// Returns `None` for anything that is not a block name, including
/// temporary files and non-canonical sequence numbers.
pub fn parse_block_file_name(name: &str) -> Option<BlockName> {
    let stem = name.strip_suffix(BLOCK_EXTENSION)?;
    let mut parts = stem.split('-');
    let start = parse_digits(parts.next()?, KEY_WIDTH)?;
    let end = parse_digits(parts.next()?, KEY_WIDTH)?;
    let sequence = match parts.next() {
        None => 0,
        Some(seq) => {
            let seq = u32::try_from(parse_digits(seq, SEQUENCE_WIDTH)?).ok()?;
            if seq == 0 {
                return None;
            }
            seq
        }
    };
    if parts.next().is_some() || start > end {
        return None;
    }
    Some(BlockName {
        start,
        end,
        sequence,
    })
}

fn parse_digits(s: &str, width: usize) -> Option<i64> {
    if s.len() != width || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
