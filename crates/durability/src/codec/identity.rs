//! Identity codec (no transformation).

use super::traits::{CodecError, StorageCodec};

/// Identity codec: bytes pass through unchanged. This is the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

impl StorageCodec for IdentityCodec {
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(data.to_vec())
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(data.to_vec())
    }

    fn codec_id(&self) -> &str {
        "identity"
    }
}
