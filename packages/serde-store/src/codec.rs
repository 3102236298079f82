//! Structured record codecs.

use bytes::Bytes;
use stowage_core_store::{Error, Result};

/// Encodes records to bytes and back.
///
/// Records travel as `serde_json::Value` so the codec can stay object-safe;
/// typed conversion happens in [`crate::convert`].
pub trait RecordCodec: Send + Sync {
    fn encode(&self, value: &serde_json::Value) -> Result<Bytes>;

    fn decode(&self, bytes: &Bytes) -> Result<serde_json::Value>;
}

/// A codec that handles JSON encoding/decoding.
///
/// This is the default record codec.
///
/// # Example
///
/// ```rust
/// use stowage_serde_store::{JsonCodec, RecordCodec};
///
/// let codec = JsonCodec::default();
/// let value = serde_json::json!({ "body": "hello" });
///
/// let bytes = codec.encode(&value).unwrap();
/// assert_eq!(&bytes[..], br#"{"body":"hello"}"#);
/// assert_eq!(codec.decode(&bytes).unwrap(), value);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    /// Indent the output.
    pub pretty: bool,
}

impl JsonCodec {
    pub fn pretty() -> Self {
        JsonCodec { pretty: true }
    }
}

impl RecordCodec for JsonCodec {
    fn encode(&self, value: &serde_json::Value) -> Result<Bytes> {
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        encoded
            .map(Bytes::from)
            .map_err(|e| Error::serialization("record", e.to_string()))
    }

    fn decode(&self, bytes: &Bytes) -> Result<serde_json::Value> {
        serde_json::from_slice(bytes).map_err(|e| Error::deserialization(e.to_string()))
    }
}
