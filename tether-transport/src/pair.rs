//! Endpoint pair: the public face of one link side.
//!
//! Associated endpoints share their side's link with the master endpoint.
//! One side creates the interface and sends the resulting
//! [`AssociatedRequest`] to the peer inside an ordinary message; the peer binds
//! it to whatever executor should serve it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tether_core::{InterfaceId, JsonCodec, MessageCodec, TaskRunner};

use crate::endpoint::Endpoint;
use crate::error::EndpointError;
use crate::router::Router;

/// Token naming an associated interface created by the other side.
///
/// Serializable so it can travel inside any message.
#[must_use = "send the request to the peer so it can bind the interface"]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssociatedRequest {
    interface: InterfaceId,
}

impl AssociatedRequest {
    /// Interface the request refers to.
    pub fn interface_id(&self) -> InterfaceId {
        self.interface
    }
}

/// Handle on one side of a link.
///
/// Cheap to clone; it does not keep the link open.
pub struct EndpointPair<C: MessageCodec = JsonCodec> {
    router: Arc<Router<C>>,
}

impl<C: MessageCodec> Clone for EndpointPair<C> {
    fn clone(&self) -> Self {
        Self {
            router: self.router.clone(),
        }
    }
}

impl<C: MessageCodec> EndpointPair<C> {
    pub(crate) fn new(router: Arc<Router<C>>) -> Self {
        Self { router }
    }

    /// Label of the link.
    pub fn label(&self) -> &str {
        self.router.label()
    }

    /// Whether this side of the link has shut down.
    pub fn is_closed(&self) -> bool {
        self.router.is_closed()
    }

    /// Number of live associated endpoints on this side.
    pub fn associated_count(&self) -> usize {
        self.router.associated_count()
    }

    /// Create an associated endpoint bound to `runner`.
    ///
    /// # Errors
    ///
    /// [`EndpointError::LinkClosed`] once this side shut down,
    /// [`EndpointError::TooManyAssociated`] when the configured limit is reached.
    pub fn create_associated(
        &self,
        runner: TaskRunner,
    ) -> Result<(Endpoint<C>, AssociatedRequest), EndpointError> {
        let core = self.router.create_associated(runner)?;
        let request = AssociatedRequest {
            interface: core.interface(),
        };
        Ok((Endpoint::from_core(core), request))
    }

    /// Bind the interface named by a peer's `request` to `runner`.
    ///
    /// Messages the peer sent before binding are delivered in order. If the
    /// peer already closed the interface, the endpoint is torn down right away.
    ///
    /// # Errors
    ///
    /// [`EndpointError::InvalidInterface`] if the request was created on this
    /// side, [`EndpointError::AlreadyBound`] if it was bound before, plus the
    /// errors of [`create_associated`](Self::create_associated).
    pub fn bind_associated(
        &self,
        request: AssociatedRequest,
        runner: TaskRunner,
    ) -> Result<Endpoint<C>, EndpointError> {
        let core = self.router.bind_associated(request.interface, runner)?;
        Ok(Endpoint::from_core(core))
    }
}

impl<C: MessageCodec> std::fmt::Debug for EndpointPair<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointPair")
            .field("link", &self.router.label())
            .field("closed", &self.is_closed())
            .finish()
    }
}
