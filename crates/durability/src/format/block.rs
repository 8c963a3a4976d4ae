//! Block file format
//!
//! A block is one flushed generation, self-describing and immutable.
//!
//! # File Structure
//!
//! ```text
//! +------------------+ 0
//! | BlockHeader      | 48 bytes
//! +------------------+ 48
//! | Codec ID         | variable (header.codec_id_len bytes)
//! +------------------+
//! | Body             | codec-encoded sections
//! +------------------+
//! | Footer CRC32     | 4 bytes, over everything above
//! +------------------+
//! ```
//!
//! Decoded, the body is a sequence of sections, one per non-empty kind:
//!
//! ```text
//! tag: u8 | data_len: u64 | data
//!
//! lf data: n | source_id[n] | type_id[n] | timestamp_micros[n] | value[n]
//! hf data: n | source_id[n] | type_id[n] | start_micros[n] | end_micros[n]
//!            | frequency[n] | value_len[n] | total | values[total]
//! ```
//!
//! All integers are little-endian; floats are stored by bit pattern.

use pancarte_core::{Generation, HfColumns, LfColumns, RecordKind, RecordSet};

use super::columns::{
    put_f64_column, put_i64_column, put_u64, put_u64_column, ColumnReader,
};
use crate::codec::{get_codec, CodecError, StorageCodec};

/// Magic bytes: "PBLK"
pub const BLOCK_MAGIC: [u8; 4] = *b"PBLK";

/// Block format version for forward compatibility
pub const BLOCK_FORMAT_VERSION: u32 = 1;

/// Block header size in bytes
pub const BLOCK_HEADER_SIZE: usize = 48;

/// Section tags
pub mod section_tags {
    /// Low-frequency records
    pub const LF: u8 = 1;
    /// High-frequency records
    pub const HF: u8 = 2;
}

const SECTION_HEADER_SIZE: usize = 9;

/// Block header (48 bytes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    /// Magic bytes: "PBLK"
    pub magic: [u8; 4],
    /// Format version
    pub format_version: u32,
    /// Number of lf records in the block
    pub lf_count: u64,
    /// Number of hf records in the block
    pub hf_count: u64,
    /// Smallest key across all kinds
    pub block_start: i64,
    /// Largest key across all kinds
    pub block_end: i64,
    /// Codec ID length (followed by codec ID string)
    pub codec_id_len: u8,
    /// Reserved for future use
    pub reserved: [u8; 7],
}

impl BlockHeader {
    /// Create a header for the given counts and span
    pub fn new(lf_count: u64, hf_count: u64, block_start: i64, block_end: i64, codec_id_len: u8) -> Self {
        BlockHeader {
            magic: BLOCK_MAGIC,
            format_version: BLOCK_FORMAT_VERSION,
            lf_count,
            hf_count,
            block_start,
            block_end,
            codec_id_len,
            reserved: [0u8; 7],
        }
    }

    /// Serialize header to bytes
    pub fn to_bytes(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let mut bytes = [0u8; BLOCK_HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4..8].copy_from_slice(&self.format_version.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.lf_count.to_le_bytes());
        bytes[16..24].copy_from_slice(&self.hf_count.to_le_bytes());
        bytes[24..32].copy_from_slice(&self.block_start.to_le_bytes());
        bytes[32..40].copy_from_slice(&self.block_end.to_le_bytes());
        bytes[40] = self.codec_id_len;
        bytes[41..48].copy_from_slice(&self.reserved);
        bytes
    }

    /// Parse header from bytes
    pub fn from_bytes(bytes: &[u8; BLOCK_HEADER_SIZE]) -> Option<Self> {
        Some(BlockHeader {
            magic: bytes[0..4].try_into().ok()?,
            format_version: u32::from_le_bytes(bytes[4..8].try_into().ok()?),
            lf_count: u64::from_le_bytes(bytes[8..16].try_into().ok()?),
            hf_count: u64::from_le_bytes(bytes[16..24].try_into().ok()?),
            block_start: i64::from_le_bytes(bytes[24..32].try_into().ok()?),
            block_end: i64::from_le_bytes(bytes[32..40].try_into().ok()?),
            codec_id_len: bytes[40],
            reserved: bytes[41..48].try_into().ok()?,
        })
    }

    /// Validate magic and version
    pub fn validate(&self) -> Result<(), BlockFormatError> {
        if self.magic != BLOCK_MAGIC {
            return Err(BlockFormatError::InvalidMagic {
                expected: BLOCK_MAGIC,
                actual: self.magic,
            });
        }
        if self.format_version > BLOCK_FORMAT_VERSION {
            return Err(BlockFormatError::UnsupportedVersion {
                version: self.format_version,
                max_supported: BLOCK_FORMAT_VERSION,
            });
        }
        Ok(())
    }
}

/// A decoded block
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBlock {
    /// Block header
    pub header: BlockHeader,
    /// Codec the body was stored with
    pub codec_id: String,
    /// Records, in key order per kind
    pub records: RecordSet,
}

/// Errors that can occur when decoding a block
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BlockFormatError {
    /// File is too small to be a valid block
    #[error("Block too small: {size} bytes")]
    TooSmall {
        /// Actual size
        size: usize,
    },
    /// Invalid magic bytes
    #[error("Invalid magic bytes: expected {expected:?}, got {actual:?}")]
    InvalidMagic {
        /// Expected magic bytes
        expected: [u8; 4],
        /// Actual magic bytes found
        actual: [u8; 4],
    },
    /// Unsupported format version
    #[error("Unsupported block version {version}, max supported is {max_supported}")]
    UnsupportedVersion {
        /// Version found in the file
        version: u32,
        /// Maximum supported version
        max_supported: u32,
    },
    /// Codec ID is not valid UTF-8
    #[error("Invalid codec ID")]
    InvalidCodecId,
    /// Footer CRC does not match contents
    #[error("CRC mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    CrcMismatch {
        /// CRC stored in the footer
        stored: u32,
        /// CRC computed over the contents
        computed: u32,
    },
    /// Codec failure on the body
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
    /// A section or column ends early
    #[error("Truncated {section} section while reading {what}")]
    Truncated {
        /// Section being read
        section: &'static str,
        /// Column or field being read
        what: &'static str,
    },
    /// A section has bytes after its last column
    #[error("{extra} trailing bytes in {section} section")]
    TrailingBytes {
        /// Section being read
        section: &'static str,
        /// Unread byte count
        extra: usize,
    },
    /// Unknown section tag
    #[error("Unknown section tag {tag}")]
    UnknownSection {
        /// Tag found
        tag: u8,
    },
    /// The same kind appears twice
    #[error("Duplicate {kind} section")]
    DuplicateSection {
        /// Kind of the repeated section
        kind: RecordKind,
    },
    /// Section row count disagrees with the header
    #[error("{kind} record count mismatch: header says {header}, section has {section}")]
    CountMismatch {
        /// Kind being checked
        kind: RecordKind,
        /// Count in the header
        header: u64,
        /// Count in the section
        section: u64,
    },
    /// hf value lengths disagree with the flat values payload
    #[error("hf values length mismatch: lengths sum to {declared}, payload holds {actual}")]
    ValuesLengthMismatch {
        /// Sum of per-record lengths
        declared: u64,
        /// Number of values stored
        actual: u64,
    },
    /// Record keys fall outside the span in the header
    #[error("Key span [{actual_start}, {actual_end}] does not match header [{header_start}, {header_end}]")]
    SpanMismatch {
        /// Header block_start
        header_start: i64,
        /// Header block_end
        header_end: i64,
        /// Smallest key in the body
        actual_start: i64,
        /// Largest key in the body
        actual_end: i64,
    },
}

/// Encode a generation as a block
///
/// Columns follow the generation's key order. An empty generation encodes
/// to a valid block with no sections and a `[0, 0]` span.
pub fn encode_block(generation: &Generation, codec: &dyn StorageCodec) -> Result<Vec<u8>, BlockFormatError> {
    let records = RecordSet::from(generation);
    let (block_start, block_end) = generation.span().unwrap_or((0, 0));

    let mut body = Vec::new();
    if !records.lf.is_empty() {
        write_section(&mut body, section_tags::LF, &encode_lf(&records.lf));
    }
    if !records.hf.is_empty() {
        write_section(&mut body, section_tags::HF, &encode_hf(&records.hf));
    }
    let body = codec.encode(&body)?;

    let codec_id = codec.codec_id();
    let header = BlockHeader::new(
        records.lf.len() as u64,
        records.hf.len() as u64,
        block_start,
        block_end,
        codec_id.len() as u8,
    );

    let mut bytes = Vec::with_capacity(BLOCK_HEADER_SIZE + codec_id.len() + body.len() + 4);
    bytes.extend_from_slice(&header.to_bytes());
    bytes.extend_from_slice(codec_id.as_bytes());
    bytes.extend_from_slice(&body);

    let crc = crc32fast::hash(&bytes);
    bytes.extend_from_slice(&crc.to_le_bytes());
    Ok(bytes)
}

/// Decode a block
///
/// The codec is taken from the block itself.
pub fn decode_block(bytes: &[u8]) -> Result<DecodedBlock, BlockFormatError> {
    if bytes.len() < BLOCK_HEADER_SIZE + 4 {
        return Err(BlockFormatError::TooSmall { size: bytes.len() });
    }

    let header_bytes: &[u8; BLOCK_HEADER_SIZE] = bytes[..BLOCK_HEADER_SIZE]
        .try_into()
        .map_err(|_| BlockFormatError::TooSmall { size: bytes.len() })?;
    let header = BlockHeader::from_bytes(header_bytes).ok_or(BlockFormatError::TooSmall { size: bytes.len() })?;
    header.validate()?;

    let (contents, footer) = bytes.split_at(bytes.len() - 4);
    let stored = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
    let computed = crc32fast::hash(contents);
    if stored != computed {
        return Err(BlockFormatError::CrcMismatch { stored, computed });
    }

    let codec_end = BLOCK_HEADER_SIZE + header.codec_id_len as usize;
    if codec_end > contents.len() {
        return Err(BlockFormatError::TooSmall { size: bytes.len() });
    }
    let codec_id = std::str::from_utf8(&contents[BLOCK_HEADER_SIZE..codec_end])
        .map_err(|_| BlockFormatError::InvalidCodecId)?
        .to_string();
    let codec = get_codec(&codec_id)?;
    let body = codec.decode(&contents[codec_end..])?;

    let records = decode_sections(&body)?;
    check_header(&header, &records)?;

    Ok(DecodedBlock {
        header,
        codec_id,
        records,
    })
}

fn write_section(body: &mut Vec<u8>, tag: u8, data: &[u8]) {
    body.push(tag);
    put_u64(body, data.len() as u64);
    body.extend_from_slice(data);
}

fn encode_lf(lf: &LfColumns) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8 + lf.len() * 32);
    put_u64(&mut buf, lf.len() as u64);
    put_i64_column(&mut buf, &lf.source_id);
    put_i64_column(&mut buf, &lf.type_id);
    put_i64_column(&mut buf, &lf.timestamp_micros);
    put_f64_column(&mut buf, &lf.value);
    buf
}

fn encode_hf(hf: &HfColumns) -> Vec<u8> {
    let total = hf.value_count();
    let mut buf = Vec::with_capacity(16 + hf.len() * 48 + total * 8);
    put_u64(&mut buf, hf.len() as u64);
    put_i64_column(&mut buf, &hf.source_id);
    put_i64_column(&mut buf, &hf.type_id);
    put_i64_column(&mut buf, &hf.start_micros);
    put_i64_column(&mut buf, &hf.end_micros);
    put_f64_column(&mut buf, &hf.frequency);
    let lengths: Vec<u64> = hf.values.iter().map(|v| v.len() as u64).collect();
    put_u64_column(&mut buf, &lengths);
    put_u64(&mut buf, total as u64);
    for values in &hf.values {
        put_f64_column(&mut buf, values);
    }
    buf
}

fn decode_sections(body: &[u8]) -> Result<RecordSet, BlockFormatError> {
    let mut records = RecordSet::new();
    let mut seen_lf = false;
    let mut seen_hf = false;
    let mut cursor = 0;

    while cursor < body.len() {
        if cursor + SECTION_HEADER_SIZE > body.len() {
            return Err(BlockFormatError::Truncated {
                section: "body",
                what: "section header",
            });
        }
        let tag = body[cursor];
        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&body[cursor + 1..cursor + SECTION_HEADER_SIZE]);
        let data_len = u64::from_le_bytes(len_bytes);
        cursor += SECTION_HEADER_SIZE;

        let data_end = usize::try_from(data_len)
            .ok()
            .and_then(|len| cursor.checked_add(len))
            .filter(|end| *end <= body.len())
            .ok_or(BlockFormatError::Truncated {
                section: "body",
                what: "section data",
            })?;
        let data = &body[cursor..data_end];
        cursor = data_end;

        match tag {
            section_tags::LF => {
                if std::mem::replace(&mut seen_lf, true) {
                    return Err(BlockFormatError::DuplicateSection { kind: RecordKind::Lf });
                }
                records.lf = decode_lf(data)?;
            }
            section_tags::HF => {
                if std::mem::replace(&mut seen_hf, true) {
                    return Err(BlockFormatError::DuplicateSection { kind: RecordKind::Hf });
                }
                records.hf = decode_hf(data)?;
            }
            tag => return Err(BlockFormatError::UnknownSection { tag }),
        }
    }

    Ok(records)
}

fn decode_lf(data: &[u8]) -> Result<LfColumns, BlockFormatError> {
    let mut reader = ColumnReader::new(data, "lf");
    let n = reader.u64("count")?;
    let lf = LfColumns {
        source_id: reader.i64_column(n, "source_id")?,
        type_id: reader.i64_column(n, "type_id")?,
        timestamp_micros: reader.i64_column(n, "timestamp_micros")?,
        value: reader.f64_column(n, "value")?,
    };
    reader.finish()?;
    Ok(lf)
}

fn decode_hf(data: &[u8]) -> Result<HfColumns, BlockFormatError> {
    let mut reader = ColumnReader::new(data, "hf");
    let n = reader.u64("count")?;
    let source_id = reader.i64_column(n, "source_id")?;
    let type_id = reader.i64_column(n, "type_id")?;
    let start_micros = reader.i64_column(n, "start_micros")?;
    let end_micros = reader.i64_column(n, "end_micros")?;
    let frequency = reader.f64_column(n, "frequency")?;
    let lengths = reader.u64_column(n, "value_len")?;
    let total = reader.u64("values total")?;

    let declared = lengths
        .iter()
        .try_fold(0u64, |acc, len| acc.checked_add(*len))
        .unwrap_or(u64::MAX);
    if declared != total {
        return Err(BlockFormatError::ValuesLengthMismatch {
            declared,
            actual: total,
        });
    }

    let flat = reader.f64_column(total, "values")?;
    reader.finish()?;

    let mut values = Vec::with_capacity(lengths.len());
    let mut offset = 0usize;
    for len in lengths {
        let len = len as usize;
        values.push(flat[offset..offset + len].to_vec());
        offset += len;
    }

    Ok(HfColumns {
        source_id,
        type_id,
        start_micros,
        end_micros,
        frequency,
        values,
    })
}

fn check_header(header: &BlockHeader, records: &RecordSet) -> Result<(), BlockFormatError> {
    for (kind, count) in [(RecordKind::Lf, header.lf_count), (RecordKind::Hf, header.hf_count)] {
        let section = records.kind_len(kind) as u64;
        if section != count {
            return Err(BlockFormatError::CountMismatch {
                kind,
                header: count,
                section,
            });
        }
    }

    let keys = records
        .lf
        .timestamp_micros
        .iter()
        .chain(records.hf.start_micros.iter());
    let actual = keys.fold(None, |acc: Option<(i64, i64)>, k| match acc {
        None => Some((*k, *k)),
        Some((lo, hi)) => Some((lo.min(*k), hi.max(*k))),
    });
    if let Some((actual_start, actual_end)) = actual {
        if actual_start != header.block_start || actual_end != header.block_end {
            return Err(BlockFormatError::SpanMismatch {
                header_start: header.block_start,
                header_end: header.block_end,
                actual_start,
                actual_end,
            });
        }
    }
    Ok(())
}
