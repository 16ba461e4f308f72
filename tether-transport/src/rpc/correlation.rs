//! Pending-call bookkeeping for request/reply correlation.
//!
//! Every call that expects a reply registers a [`Continuation`] under a fresh
//! [`RequestId`] before the request leaves the endpoint. The matching
//! `Response` message consumes it exactly once. Closing the endpoint drops the
//! whole table: callbacks are never invoked, channel waiters see their sender
//! vanish.
//!
//! ```text
//!  call()                         Response(id) arrives
//!    │ register(cont) → id           │ take(id)
//!    ▼                               ▼
//!  ┌──────────────────────────────────────────┐
//!  │ PendingCalls { id → Continuation }        │ ── close() → take_all() → drop
//!  └──────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use tether_core::RequestId;
use tokio::sync::oneshot;

/// What to do with a reply payload once it arrives.
pub(crate) enum Continuation {
    /// Invoke a callback on the endpoint's executor.
    Callback(Box<dyn FnOnce(Vec<u8>) + Send>),

    /// Hand the payload to a waiting [`ReplyReceiver`](super::ReplyReceiver).
    Channel(oneshot::Sender<Vec<u8>>),
}

impl Continuation {
    pub(crate) fn callback<F>(f: F) -> Self
    where
        F: FnOnce(Vec<u8>) + Send + 'static,
    {
        Continuation::Callback(Box::new(f))
    }

    /// Consume the continuation with the reply payload.
    pub(crate) fn complete(self, payload: Vec<u8>) {
        match self {
            Continuation::Callback(f) => f(payload),
            Continuation::Channel(sender) => {
                if sender.send(payload).is_err() {
                    tracing::debug!("reply receiver dropped before the reply arrived");
                }
            }
        }
    }
}

impl std::fmt::Debug for Continuation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Continuation::Callback(_) => write!(f, "Continuation::Callback"),
            Continuation::Channel(_) => write!(f, "Continuation::Channel"),
        }
    }
}

/// Outstanding calls of one endpoint, keyed by request id.
#[derive(Debug)]
pub(crate) struct PendingCalls {
    next_id: u64,
    calls: HashMap<RequestId, Continuation>,
}

impl PendingCalls {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 1,
            calls: HashMap::new(),
        }
    }

    /// Store a continuation under a freshly allocated id.
    pub(crate) fn register(&mut self, continuation: Continuation) -> RequestId {
        let id = RequestId::new(self.next_id);
        self.next_id += 1;
        self.calls.insert(id, continuation);
        id
    }

    /// Remove and return the continuation for `id`, if still pending.
    pub(crate) fn take(&mut self, id: RequestId) -> Option<Continuation> {
        self.calls.remove(&id)
    }

    /// Remove every pending continuation.
    pub(crate) fn take_all(&mut self) -> HashMap<RequestId, Continuation> {
        std::mem::take(&mut self.calls)
    }

    pub(crate) fn len(&self) -> usize {
        self.calls.len()
    }
}
