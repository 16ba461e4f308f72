//! Pluggable payload serialization.
//!
//! Endpoints carry opaque byte payloads; the [`MessageCodec`] turns typed
//! requests and replies into those bytes and back. [`JsonCodec`] is the
//! default and is handy when reading traces.
//!
//! # Example
//!
//! ```rust
//! use tether_core::{JsonCodec, MessageCodec};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct Echo {
//!     value: i32,
//! }
//!
//! let codec = JsonCodec;
//! let bytes = codec.encode(&Echo { value: 1024 }).unwrap();
//! assert_eq!(&bytes, br#"{"value":1024}"#);
//!
//! let decoded: Echo = codec.decode(&bytes).unwrap();
//! assert_eq!(decoded, Echo { value: 1024 });
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Error type for codec operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Failed to encode a value to bytes.
    #[error("encode error: {0}")]
    Encode(Box<dyn std::error::Error + Send + Sync>),

    /// Failed to decode bytes to a value.
    #[error("decode error: {0}")]
    Decode(Box<dyn std::error::Error + Send + Sync>),
}

/// Pluggable serialization format for endpoint payloads.
///
/// Codecs are cloned into every endpoint and responder and used from
/// whichever executor thread handles the message, hence the
/// `Clone + Send + Sync + 'static` bounds.
pub trait MessageCodec: Clone + Send + Sync + 'static {
    /// Encode a serializable value to bytes.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    /// Decode bytes into a value.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Decode` if deserialization fails.
    fn decode<T: DeserializeOwned>(&self, buf: &[u8]) -> Result<T, CodecError>;
}

/// JSON codec using serde_json.
#[derive(Clone, Default, Debug, Copy)]
pub struct JsonCodec;

impl MessageCodec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encode(Box::new(e)))
    }

    fn decode<T: DeserializeOwned>(&self, buf: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(buf).map_err(|e| CodecError::Decode(Box::new(e)))
    }
}
