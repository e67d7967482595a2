//! Encoding of attribute mappings into persisted blobs.

use crate::error::{Error, Result};
use crate::value::Attributes;

/// Converts an attribute mapping to and from an opaque byte blob.
///
/// Implementations must round-trip: `decode(encode(m)) == m`.
pub trait AttributeCodec: Send + Sync {
    /// Encode a mapping into a blob.
    fn encode(&self, attributes: &Attributes) -> Result<Vec<u8>>;

    /// Decode a blob produced by [`encode`](Self::encode).
    fn decode(&self, blob: &[u8]) -> Result<Attributes>;
}

/// JSON codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl AttributeCodec for JsonCodec {
    fn encode(&self, attributes: &Attributes) -> Result<Vec<u8>> {
        serde_json::to_vec(attributes).map_err(|e| Error::Encode(e.to_string()))
    }

    fn decode(&self, blob: &[u8]) -> Result<Attributes> {
        serde_json::from_slice(blob).map_err(|e| Error::Decode(e.to_string()))
    }
}
