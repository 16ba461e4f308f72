//! Responder: handler-side handle for answering one inbound call.
//!
//! Every inbound message handed to a handler comes with a `Responder`. For a
//! request it must be fulfilled with [`send`](Responder::send) or
//! [`send_error`](Responder::send_error); dropping it unfulfilled answers
//! [`ReplyError::BrokenPromise`] so the caller is never left waiting on a live
//! connection. For one-way messages the responder is inert.
//!
//! The reply takes the reverse path of the request: it is written to the link
//! from the handler's executor, accepted on the caller side's master executor,
//! then forwarded to the calling endpoint's executor.
//!
//! # Example
//!
//! ```rust,ignore
//! endpoint.set_handler(|value: i32, responder: Responder<i32>| {
//!     responder.send(value);
//! });
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use tether_core::{JsonCodec, MessageCodec, RequestId};

use super::reply_error::ReplyError;
use crate::endpoint::EndpointCore;
use crate::pair::EndpointPair;

/// Reply handle for one inbound call.
///
/// `Send`, so a handler may move it elsewhere and answer later; the reply is
/// then routed through the endpoint's executor.
pub struct Responder<T: Serialize, C: MessageCodec = JsonCodec> {
    /// Endpoint that received the call.
    core: Arc<EndpointCore<C>>,

    /// `None` for one-way messages.
    request: Option<RequestId>,

    fulfilled: bool,

    _reply: PhantomData<fn(T)>,
}

impl<T: Serialize, C: MessageCodec> Responder<T, C> {
    pub(crate) fn new(core: Arc<EndpointCore<C>>, request: Option<RequestId>) -> Self {
        Self {
            core,
            request,
            fulfilled: false,
            _reply: PhantomData,
        }
    }

    /// Whether the caller is waiting for a reply.
    pub fn expects_response(&self) -> bool {
        self.request.is_some()
    }

    /// Request id of the call being answered.
    pub fn request_id(&self) -> Option<RequestId> {
        self.request
    }

    /// The pair owning the endpoint that received this call.
    ///
    /// Handlers use it to bind an [`AssociatedRequest`](crate::AssociatedRequest)
    /// carried in the request.
    pub fn pair(&self) -> EndpointPair<C> {
        EndpointPair::new(self.core.router().clone())
    }

    /// Send a successful reply.
    pub fn send(mut self, value: T) {
        self.fulfilled = true;
        let Some(request) = self.request else {
            tracing::trace!(interface = %self.core.interface(), "reply to one-way message discarded");
            return;
        };

        let result: Result<T, ReplyError> = Ok(value);
        match self.core.codec().encode(&result) {
            Ok(payload) => self.core.respond(request, payload),
            Err(e) => {
                tracing::error!(
                    interface = %self.core.interface(),
                    request_id = %request,
                    error = %e,
                    "failed to encode reply"
                );
                self.core.reply_error(
                    request,
                    ReplyError::Serialization {
                        message: e.to_string(),
                    },
                );
            }
        }
    }

    /// Send an error in place of a reply.
    pub fn send_error(mut self, error: ReplyError) {
        self.fulfilled = true;
        if let Some(request) = self.request {
            self.core.reply_error(request, error);
        }
    }
}

impl<T: Serialize, C: MessageCodec> Drop for Responder<T, C> {
    fn drop(&mut self) {
        if self.fulfilled {
            return;
        }
        if let Some(request) = self.request {
            tracing::warn!(
                interface = %self.core.interface(),
                request_id = %request,
                "responder dropped without reply, sending BrokenPromise"
            );
            self.core.reply_error(request, ReplyError::BrokenPromise);
        }
    }
}

impl<T: Serialize, C: MessageCodec> std::fmt::Debug for Responder<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder")
            .field("interface", &self.core.interface())
            .field("request", &self.request)
            .field("fulfilled", &self.fulfilled)
            .finish()
    }
}
