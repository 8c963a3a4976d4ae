//! zstd codec
//!
//! Signal columns compress well (repeated ids, slowly varying timestamps),
//! so this codec trades some flush CPU for smaller blocks.

use super::traits::{CodecError, StorageCodec};

/// Default zstd compression level
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

/// zstd-compressed block bodies
#[derive(Debug, Clone, Copy)]
pub struct ZstdCodec {
    level: i32,
}

impl ZstdCodec {
    /// Create a codec with an explicit compression level
    pub fn with_level(level: i32) -> Self {
        ZstdCodec { level }
    }
}

impl Default for ZstdCodec {
    fn default() -> Self {
        ZstdCodec::with_level(DEFAULT_ZSTD_LEVEL)
    }
}

impl StorageCodec for ZstdCodec {
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        zstd::stream::encode_all(data, self.level)
            .map_err(|e| CodecError::encode(e.to_string(), self.codec_id()))
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        zstd::stream::decode_all(data)
            .map_err(|e| CodecError::decode(e.to_string(), self.codec_id(), data.len()))
    }

    fn codec_id(&self) -> &str {
        "zstd"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zstd_roundtrip_compresses() {
        let codec = ZstdCodec::default();
        // 1MB of highly repetitive data
        let data: Vec<u8> = (0..1_000_000).map(|i| (i % 16) as u8).collect();

        let encoded = codec.encode(&data).unwrap();
        assert!(encoded.len() < data.len() / 10);
        assert_eq!(codec.decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_zstd_rejects_garbage() {
        let codec = ZstdCodec::default();
        let result = codec.decode(b"definitely not a zstd frame");
        assert!(matches!(result, Err(CodecError::DecodeError { .. })));
    }
}
