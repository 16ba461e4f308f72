//! Error types for endpoint operations.

use tether_core::{CodecError, InterfaceId};

/// Errors returned synchronously by endpoint and pair operations.
///
/// Connection loss is never reported here: it surfaces through the
/// connection-error handler registered on the endpoint.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// The endpoint was closed; calling into it is a caller bug.
    #[error("endpoint {interface} is closed")]
    Closed {
        /// Interface of the closed endpoint.
        interface: InterfaceId,
    },

    /// The link side this operation targets has shut down.
    #[error("link is closed")]
    LinkClosed,

    /// Encoding the request failed.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The interface already has a local endpoint (or had one).
    #[error("interface {interface} is already bound")]
    AlreadyBound {
        /// The interface that was bound twice.
        interface: InterfaceId,
    },

    /// The interface id was not allocated by the peer side.
    #[error("interface {interface} cannot be bound on this side")]
    InvalidInterface {
        /// The rejected interface.
        interface: InterfaceId,
    },

    /// The per-side limit on associated endpoints was reached.
    #[error("too many associated endpoints (max: {max})")]
    TooManyAssociated {
        /// Configured limit.
        max: usize,
    },
}
