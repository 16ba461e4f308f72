//! ReplyReceiver: caller-side handle for a reply that has not arrived yet.
//!
//! Returned by [`Endpoint::call_with_receiver`](crate::Endpoint::call_with_receiver).
//! The reply still completes on the calling endpoint's executor; the receiver
//! only lets another thread (or an async task) pick it up.
//!
//! Do not block on a receiver from the thread that owns the calling
//! endpoint's executor: that thread is the one that must run the reply task.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde::de::DeserializeOwned;
use tether_core::{JsonCodec, MessageCodec, RequestId};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use super::reply_error::{decode_reply, ReplyError};

/// Receives the reply to one call.
///
/// Resolves to [`ReplyError::ConnectionClosed`] if the endpoint closes while
/// the call is pending.
pub struct ReplyReceiver<T, C: MessageCodec = JsonCodec> {
    request: RequestId,
    receiver: oneshot::Receiver<Vec<u8>>,
    codec: C,
    _reply: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned, C: MessageCodec> ReplyReceiver<T, C> {
    pub(crate) fn new(request: RequestId, receiver: oneshot::Receiver<Vec<u8>>, codec: C) -> Self {
        Self {
            request,
            receiver,
            codec,
            _reply: PhantomData,
        }
    }

    /// Id of the call this receiver belongs to.
    pub fn request_id(&self) -> RequestId {
        self.request
    }

    /// Check for the reply without blocking.
    ///
    /// Returns `None` while the call is still pending.
    pub fn try_recv(&mut self) -> Option<Result<T, ReplyError>> {
        match self.receiver.try_recv() {
            Ok(payload) => Some(decode_reply(&self.codec, &payload)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(ReplyError::ConnectionClosed)),
        }
    }

    /// Block the current thread until the reply arrives.
    pub fn blocking_recv(self) -> Result<T, ReplyError> {
        match self.receiver.blocking_recv() {
            Ok(payload) => decode_reply(&self.codec, &payload),
            Err(_) => Err(ReplyError::ConnectionClosed),
        }
    }
}

// The codec is never pinned; only the oneshot receiver is polled.
impl<T, C: MessageCodec> Unpin for ReplyReceiver<T, C> {}

impl<T: DeserializeOwned, C: MessageCodec> Future for ReplyReceiver<T, C> {
    type Output = Result<T, ReplyError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.receiver).poll(cx).map(|result| match result {
            Ok(payload) => decode_reply(&this.codec, &payload),
            Err(_) => Err(ReplyError::ConnectionClosed),
        })
    }
}

impl<T, C: MessageCodec> std::fmt::Debug for ReplyReceiver<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyReceiver")
            .field("request", &self.request)
            .finish()
    }
}
