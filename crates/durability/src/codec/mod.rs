//! Storage codec abstraction
//!
//! Block bodies pass through a codec before they reach disk. The codec id is
//! written into every block header, so a reader can always pick the right
//! codec for a block regardless of how the store is currently configured.
//!
//! Available codecs:
//! - `identity`: bytes pass through unchanged (default)
//! - `zstd`: zstd-compressed body

mod compressed;
mod identity;
mod traits;

pub use compressed::ZstdCodec;
pub use identity::IdentityCodec;
pub use traits::{CodecError, StorageCodec};

/// Look up a codec by its identifier
pub fn get_codec(codec_id: &str) -> Result<Box<dyn StorageCodec>, CodecError> {
    match codec_id {
        "identity" => Ok(Box::new(IdentityCodec)),
        "zstd" => Ok(Box::new(ZstdCodec::default())),
        _ => Err(CodecError::UnknownCodec(codec_id.to_string())),
    }
}
