//! Storage codec trait definitions.

/// Storage codec trait.
///
/// Every block body goes through the codec on its way to and from disk.
///
/// # Thread Safety
///
/// Codecs must be `Send + Sync`: the flush worker encodes while any number
/// of readers decode.
pub trait StorageCodec: Send + Sync {
    /// Encode bytes for storage.
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Decode bytes from storage.
    ///
    /// Reverses the encode operation. Returns an error if the data
    /// cannot be decoded (e.g. corrupt compressed stream).
    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Unique codec identifier, stored in each block header.
    fn codec_id(&self) -> &str;
}

/// Codec errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Encoding failed
    #[error("Encode error (codec={codec_id}): {detail}")]
    EncodeError {
        /// Human-readable error description
        detail: String,
        /// Codec ID that attempted the encode
        codec_id: String,
    },

    /// Decoding failed.
    ///
    /// Carries the codec identity and data length so callers can
    /// distinguish a wrong-codec error from data corruption.
    #[error("Decode error (codec={codec_id}, data_len={data_len}): {detail}")]
    DecodeError {
        /// Human-readable error description
        detail: String,
        /// Codec ID that attempted the decode
        codec_id: String,
        /// Length of the data that failed to decode
        data_len: usize,
    },

    /// Unknown codec identifier.
    #[error("Unknown codec: {0}")]
    UnknownCodec(String),
}

impl CodecError {
    /// Create a decode error with full diagnostic context.
    pub fn decode(detail: impl Into<String>, codec_id: impl Into<String>, data_len: usize) -> Self {
        CodecError::DecodeError {
            detail: detail.into(),
            codec_id: codec_id.into(),
            data_len,
        }
    }

    /// Create an encode error.
    pub fn encode(detail: impl Into<String>, codec_id: impl Into<String>) -> Self {
        CodecError::EncodeError {
            detail: detail.into(),
            codec_id: codec_id.into(),
        }
    }
}
