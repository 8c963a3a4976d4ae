//! Durability layer for pancarte
//!
//! This crate handles everything that touches disk:
//!
//! - Block format: self-describing columnar blocks with a CRC32 footer
//! - Storage codec abstraction (identity, zstd)
//! - Partition layout: timestamp to calendar directory
//! - Block store: crash-safe block writes, range discovery, temp cleanup

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod block_store;
pub mod codec;
pub mod format;
pub mod partition;

pub use block_store::{BlockInfo, BlockStore, BlockStoreError};
pub use codec::{get_codec, CodecError, IdentityCodec, StorageCodec, ZstdCodec};
pub use format::{
    block_file_name, decode_block, encode_block, parse_block_file_name, BlockFormatError,
    BlockHeader, BlockName, DecodedBlock, BLOCK_EXTENSION, BLOCK_FORMAT_VERSION, BLOCK_MAGIC,
    MAX_BLOCK_SEQUENCE,
};
pub use partition::{PartitionDepth, PartitionLayout};
