//! Partitioned block store
//!
//! The store exclusively owns a directory tree of immutable block files:
//!
//! ```text
//! location/
//! └── 2024/03/09/17/
//!     ├── 0001710003942123456-0001710004100000000.v1.pblk
//!     └── ...
//! ```
//!
//! Each block sits in the partition directory of its `block_start` and is
//! named after its `[block_start, block_end]` span, plus a sequence suffix
//! when an earlier block already has that span. Blocks are written once
//! through a temporary file that is then hard-linked into place, so readers
//! never observe a partial block and an existing block is never replaced.

mod discovery;
mod writer;

use std::io;
use std::path::{Path, PathBuf};

use pancarte_core::{Error, RecordSet};

use crate::codec::StorageCodec;
use crate::format::{decode_block, BlockFormatError};
use crate::partition::PartitionLayout;

/// Errors from block store operations
#[derive(Debug, thiserror::Error)]
pub enum BlockStoreError {
    /// Filesystem failure
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// A block file could not be decoded
    #[error("Malformed block {}: {source}", path.display())]
    Malformed {
        /// Path of the block file
        path: PathBuf,
        /// Decode failure
        #[source]
        source: BlockFormatError,
    },

    /// A generation could not be encoded
    #[error("Block encode failed: {0}")]
    Encode(#[source] BlockFormatError),

    /// Every file name for this span is already taken
    #[error("Block already exists: {}", path.display())]
    Duplicate {
        /// Existing block path
        path: PathBuf,
    },

    /// Empty generations produce no block
    #[error("Cannot write an empty generation")]
    EmptyGeneration,

    /// Timestamp outside the partitionable range
    #[error("Timestamp {micros} is outside the partitionable range")]
    TimestampOutOfRange {
        /// Offending value
        micros: i64,
    },
}

impl BlockStoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BlockStoreError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<BlockStoreError> for Error {
    fn from(e: BlockStoreError) -> Self {
        match e {
            BlockStoreError::Io { path, source } => Error::Io(io::Error::new(
                source.kind(),
                format!("{}: {}", path.display(), source),
            )),
            BlockStoreError::Malformed { path, source } => Error::malformed(path, source.to_string()),
            BlockStoreError::Encode(source) => {
                Error::Io(io::Error::new(io::ErrorKind::Other, source.to_string()))
            }
            BlockStoreError::Duplicate { path } => Error::DuplicateBlock { path },
            e @ BlockStoreError::EmptyGeneration => Error::validation(e.to_string()),
            e @ BlockStoreError::TimestampOutOfRange { .. } => Error::validation(e.to_string()),
        }
    }
}

/// Information about a written block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    /// Final path of the block file
    pub path: PathBuf,
    /// Smallest key in the block
    pub block_start: i64,
    /// Largest key in the block
    pub block_end: i64,
    /// Sequence number among blocks sharing this span
    pub sequence: u32,
    /// lf records written
    pub lf_count: usize,
    /// hf records written
    pub hf_count: usize,
    /// Aggregate value count of the generation
    pub number_of_values: u64,
    /// Encoded size on disk
    pub size_bytes: u64,
    /// Footer checksum
    pub crc: u32,
}

/// Block store rooted at one directory
pub struct BlockStore {
    root: PathBuf,
    layout: PartitionLayout,
    codec: Box<dyn StorageCodec>,
}

impl BlockStore {
    /// Create a store over `root`
    ///
    /// Nothing is touched on disk until the first write; a missing root is
    /// simply an empty store.
    pub fn new(root: impl Into<PathBuf>, layout: PartitionLayout, codec: Box<dyn StorageCodec>) -> Self {
        BlockStore {
            root: root.into(),
            layout,
            codec,
        }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Partition layout
    pub fn layout(&self) -> PartitionLayout {
        self.layout
    }

    /// Codec used for new blocks
    pub fn codec_id(&self) -> &str {
        self.codec.codec_id()
    }

    /// Partition directory for a block starting at `micros`
    pub fn path_for(&self, micros: i64) -> Result<PathBuf, BlockStoreError> {
        self.layout.path_for(&self.root, micros)
    }

    /// Load and decode one block
    ///
    /// The codec comes from the block header, so blocks written under a
    /// different codec setting stay readable.
    pub fn read_block(&self, path: &Path) -> Result<RecordSet, BlockStoreError> {
        let bytes = std::fs::read(path).map_err(|e| BlockStoreError::io(path, e))?;
        let block = decode_block(&bytes).map_err(|source| BlockStoreError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(block.records)
    }
}

impl std::fmt::Debug for BlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockStore")
            .field("root", &self.root)
            .field("layout", &self.layout)
            .field("codec", &self.codec.codec_id())
            .finish()
    }
}
