//! Errors delivered in place of a reply.
//!
//! These travel inside reply payloads (encoded as `Result<T, ReplyError>`),
//! so they are serializable:
//! - Handler dropped its responder ([`ReplyError::BrokenPromise`])
//! - No handler registered on the callee ([`ReplyError::Unhandled`])
//! - Payload did not encode/decode ([`ReplyError::Serialization`])
//!
//! [`ReplyError::ConnectionClosed`] never crosses the link; receivers produce it
//! locally when the call is abandoned.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tether_core::MessageCodec;

/// Errors a caller can observe instead of a reply value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ReplyError {
    /// The handler dropped its responder without replying.
    #[error("handler dropped the responder without replying")]
    BrokenPromise,

    /// The endpoint closed before the reply arrived.
    ///
    /// Only reply receivers observe this; reply callbacks are dropped instead.
    #[error("connection closed before a reply arrived")]
    ConnectionClosed,

    /// The callee had no handler registered.
    #[error("no handler registered on the callee")]
    Unhandled,

    /// Encoding or decoding a payload failed.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the failure.
        message: String,
    },
}

/// Decode a reply payload, folding codec failures into [`ReplyError`].
pub(crate) fn decode_reply<T, C>(codec: &C, payload: &[u8]) -> Result<T, ReplyError>
where
    T: DeserializeOwned,
    C: MessageCodec,
{
    codec
        .decode::<Result<T, ReplyError>>(payload)
        .unwrap_or_else(|e| {
            Err(ReplyError::Serialization {
                message: e.to_string(),
            })
        })
}
