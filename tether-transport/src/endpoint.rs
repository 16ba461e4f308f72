//! Endpoint: one side of one interface on a link.
//!
//! An endpoint is bound to a single executor. Inbound requests, replies and
//! its connection-error notification all run there.
//!
//! # Lifecycle
//!
//! ```text
//!   Open ──close()/peer closed──▶ Closing ──(task on own executor)──▶ Closed
//!          pending calls dropped            connection-error handler runs
//!          inbound handler dropped
//! ```
//!
//! Once an endpoint leaves `Open` nothing more is written to or delivered
//! through it.
//!
//! # Split
//!
//! [`EndpointCore`] carries the state and is shared with the router and with
//! outstanding responders. [`Endpoint`] is the unique user handle: dropping it
//! closes the endpoint.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tether_core::{InterfaceId, JsonCodec, MessageCodec, RequestId, TaskRunner};
use tokio::sync::oneshot;

use crate::error::EndpointError;
use crate::message::{Message, MessageKind};
use crate::pair::{AssociatedRequest, EndpointPair};
use crate::router::Router;
use crate::rpc::{decode_reply, Continuation, PendingCalls, ReplyError, ReplyReceiver, Responder};

/// Type-erased inbound handler: decodes the payload and calls user code.
type InboundHandler<C> =
    Box<dyn FnMut(&Arc<EndpointCore<C>>, Option<RequestId>, Vec<u8>) + Send>;

type ErrorHandler = Box<dyn FnOnce() + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Open,
    Closing,
    Closed,
}

struct CoreState<C: MessageCodec> {
    phase: Phase,
    handler: Option<InboundHandler<C>>,
    error_handler: Option<ErrorHandler>,
    pending: PendingCalls,
    /// Writes posted to the executor and not yet run.
    queued_writes: usize,
}

/// Shared state of an endpoint.
pub(crate) struct EndpointCore<C: MessageCodec> {
    interface: InterfaceId,
    runner: TaskRunner,
    router: Arc<Router<C>>,
    state: Mutex<CoreState<C>>,
}

impl<C: MessageCodec> EndpointCore<C> {
    pub(crate) fn new(interface: InterfaceId, runner: TaskRunner, router: Arc<Router<C>>) -> Arc<Self> {
        Arc::new(Self {
            interface,
            runner,
            router,
            state: Mutex::new(CoreState {
                phase: Phase::Open,
                handler: None,
                error_handler: None,
                pending: PendingCalls::new(),
                queued_writes: 0,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, CoreState<C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn interface(&self) -> InterfaceId {
        self.interface
    }

    pub(crate) fn runner(&self) -> &TaskRunner {
        &self.runner
    }

    pub(crate) fn router(&self) -> &Arc<Router<C>> {
        &self.router
    }

    pub(crate) fn codec(&self) -> &C {
        self.router.codec()
    }

    fn is_open(&self) -> bool {
        self.lock().phase == Phase::Open
    }

    fn closed_error(&self) -> EndpointError {
        EndpointError::Closed {
            interface: self.interface,
        }
    }

    /// Register the continuation, then issue the send step.
    fn call(self: &Arc<Self>, payload: Vec<u8>, continuation: Continuation) -> Result<RequestId, EndpointError> {
        let request = {
            let mut state = self.lock();
            if state.phase != Phase::Open {
                return Err(self.closed_error());
            }
            state.pending.register(continuation)
        };

        tracing::trace!(
            link = %self.router.label(),
            interface = %self.interface,
            request_id = %request,
            "call"
        );
        self.transmit(Message::new(self.interface, MessageKind::Request(request), payload));
        Ok(request)
    }

    fn notify(self: &Arc<Self>, payload: Vec<u8>) -> Result<(), EndpointError> {
        if !self.is_open() {
            return Err(self.closed_error());
        }
        self.transmit(Message::new(self.interface, MessageKind::Notify, payload));
        Ok(())
    }

    /// Send step: write inline on the owner thread, otherwise hop through
    /// the endpoint's executor.
    ///
    /// An owner-thread send still queues while earlier posted writes are
    /// pending, so messages leave in the order they were sent.
    fn transmit(self: &Arc<Self>, message: Message) {
        let inline = {
            let mut state = self.lock();
            if state.queued_writes == 0 && self.runner.runs_tasks_on_current_thread() {
                true
            } else {
                state.queued_writes += 1;
                false
            }
        };
        if inline {
            self.write(message);
        } else {
            let core = self.clone();
            self.runner.post_task(move || core.write_queued(message));
        }
    }

    fn write_queued(&self, message: Message) {
        {
            let mut state = self.lock();
            state.queued_writes = state.queued_writes.saturating_sub(1);
        }
        self.write(message);
    }

    fn write(&self, message: Message) {
        if !self.is_open() {
            tracing::trace!(
                link = %self.router.label(),
                interface = %self.interface,
                "endpoint closed, message not sent"
            );
            return;
        }
        self.router.send_to_peer(message);
    }

    /// Send an encoded `Result<T, ReplyError>` back to the caller.
    pub(crate) fn respond(self: &Arc<Self>, request: RequestId, payload: Vec<u8>) {
        self.transmit(Message::response(self.interface, request, payload));
    }

    pub(crate) fn reply_error(self: &Arc<Self>, request: RequestId, error: ReplyError) {
        match self.codec().encode(&Err::<(), ReplyError>(error)) {
            Ok(payload) => self.respond(request, payload),
            Err(e) => tracing::error!(
                interface = %self.interface,
                request_id = %request,
                error = %e,
                "failed to encode reply error"
            ),
        }
    }

    /// Handle a message routed to this endpoint. Runs on the endpoint's executor.
    pub(crate) fn deliver(self: &Arc<Self>, message: Message) {
        if !self.is_open() {
            tracing::trace!(
                link = %self.router.label(),
                interface = %self.interface,
                kind = ?message.kind,
                "endpoint closed, inbound message dropped"
            );
            return;
        }

        match message.kind {
            MessageKind::InterfaceClosed => {
                if self.teardown() {
                    tracing::debug!(
                        link = %self.router.label(),
                        interface = %self.interface,
                        "peer closed interface"
                    );
                }
            }
            MessageKind::Response(request) => {
                let continuation = self.lock().pending.take(request);
                match continuation {
                    Some(continuation) => continuation.complete(message.payload),
                    None => tracing::trace!(
                        interface = %self.interface,
                        request_id = %request,
                        "no pending call for reply"
                    ),
                }
            }
            MessageKind::Request(request) => self.dispatch(Some(request), message.payload),
            MessageKind::Notify => self.dispatch(None, message.payload),
        }
    }

    fn dispatch(self: &Arc<Self>, request: Option<RequestId>, payload: Vec<u8>) {
        let handler = self.lock().handler.take();
        let Some(mut handler) = handler else {
            match request {
                Some(request) => {
                    tracing::warn!(
                        interface = %self.interface,
                        request_id = %request,
                        "no handler registered, answering Unhandled"
                    );
                    self.reply_error(request, ReplyError::Unhandled);
                }
                None => tracing::debug!(
                    interface = %self.interface,
                    "no handler registered, one-way message dropped"
                ),
            }
            return;
        };

        handler(self, request, payload);

        // Reinstall unless the handler was replaced or the endpoint closed meanwhile.
        let mut state = self.lock();
        if state.phase == Phase::Open && state.handler.is_none() {
            state.handler = Some(handler);
        }
    }

    fn set_handler(&self, handler: InboundHandler<C>) {
        let previous = {
            let mut state = self.lock();
            if state.phase != Phase::Open {
                return;
            }
            state.handler.replace(handler)
        };
        drop(previous);
    }

    fn set_error_handler(&self, handler: ErrorHandler) {
        let mut state = self.lock();
        if state.phase == Phase::Closed {
            drop(state);
            self.runner.post_task(handler);
            return;
        }
        state.error_handler = Some(handler);
    }

    /// `Open → Closing`. Returns `false` if the endpoint was already closing.
    ///
    /// Pending calls and the inbound handler are dropped here; the error
    /// handler runs later on the endpoint's own executor.
    pub(crate) fn teardown(self: &Arc<Self>) -> bool {
        let (pending, handler) = {
            let mut state = self.lock();
            if state.phase != Phase::Open {
                return false;
            }
            state.phase = Phase::Closing;
            (state.pending.take_all(), state.handler.take())
        };

        tracing::debug!(
            link = %self.router.label(),
            interface = %self.interface,
            executor = %self.runner.name(),
            abandoned_calls = pending.len(),
            "endpoint closing"
        );
        drop(pending);
        drop(handler);

        let core = self.clone();
        self.runner.post_task(move || core.finish_close());
        true
    }

    fn finish_close(&self) {
        let error_handler = {
            let mut state = self.lock();
            state.phase = Phase::Closed;
            state.error_handler.take()
        };
        tracing::trace!(interface = %self.interface, "endpoint closed");
        if let Some(handler) = error_handler {
            handler();
        }
    }

    /// Local close: tear down, then propagate to the link.
    pub(crate) fn close(self: &Arc<Self>) {
        if !self.teardown() {
            return;
        }
        if self.interface.is_master() {
            self.router.shut_down(true);
        } else {
            self.router.detach(self.interface);
        }
    }
}

/// User handle for an endpoint.
///
/// Not `Clone`: there is exactly one handle per endpoint, and dropping it
/// closes the endpoint. Replies and handlers always run on the executor the
/// endpoint was bound to.
///
/// # Example
///
/// ```rust,ignore
/// let (client, server) = tether_transport::connect(client_runner, server_runner);
///
/// server.set_handler(|value: i32, responder: Responder<i32>| responder.send(value));
/// client.call(&1024, |reply: Result<i32, ReplyError>| assert_eq!(reply, Ok(1024)))?;
/// ```
pub struct Endpoint<C: MessageCodec = JsonCodec> {
    core: Arc<EndpointCore<C>>,
}

impl<C: MessageCodec> Endpoint<C> {
    pub(crate) fn from_core(core: Arc<EndpointCore<C>>) -> Self {
        Self { core }
    }

    /// Interface this endpoint is attached to.
    pub fn interface_id(&self) -> InterfaceId {
        self.core.interface
    }

    /// Whether this is the master endpoint of its link side.
    pub fn is_master(&self) -> bool {
        self.core.interface.is_master()
    }

    /// Whether the endpoint has left the open phase.
    pub fn is_closed(&self) -> bool {
        !self.core.is_open()
    }

    /// Runner of the executor this endpoint is bound to.
    pub fn runner(&self) -> &TaskRunner {
        &self.core.runner
    }

    /// Number of calls still waiting for a reply.
    pub fn pending_calls(&self) -> usize {
        self.core.lock().pending.len()
    }

    /// The link side this endpoint belongs to.
    pub fn pair(&self) -> EndpointPair<C> {
        EndpointPair::new(self.core.router.clone())
    }

    /// Create an associated endpoint on this endpoint's link side.
    ///
    /// Send the returned request to the peer so it can bind the other end.
    pub fn associate(&self, runner: TaskRunner) -> Result<(Endpoint<C>, AssociatedRequest), EndpointError> {
        self.pair().create_associated(runner)
    }

    /// Call the peer and run `on_reply` on this endpoint's executor.
    ///
    /// The callback is dropped without running if the endpoint closes first.
    ///
    /// # Errors
    ///
    /// [`EndpointError::Closed`] after close, [`EndpointError::Codec`] if the
    /// request does not encode.
    pub fn call<Req, Resp, F>(&self, request: &Req, on_reply: F) -> Result<RequestId, EndpointError>
    where
        Req: Serialize,
        Resp: DeserializeOwned + 'static,
        F: FnOnce(Result<Resp, ReplyError>) + Send + 'static,
    {
        let payload = self.core.codec().encode(request)?;
        let codec = self.core.codec().clone();
        self.core.call(
            payload,
            Continuation::callback(move |reply| on_reply(decode_reply(&codec, &reply))),
        )
    }

    /// Call the peer and receive the reply through a [`ReplyReceiver`].
    ///
    /// # Errors
    ///
    /// Same as [`call`](Self::call).
    pub fn call_with_receiver<Req, Resp>(&self, request: &Req) -> Result<ReplyReceiver<Resp, C>, EndpointError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let payload = self.core.codec().encode(request)?;
        let (tx, rx) = oneshot::channel();
        let request_id = self.core.call(payload, Continuation::Channel(tx))?;
        Ok(ReplyReceiver::new(request_id, rx, self.core.codec().clone()))
    }

    /// Send a one-way message.
    ///
    /// # Errors
    ///
    /// Same as [`call`](Self::call).
    pub fn send<M: Serialize>(&self, message: &M) -> Result<(), EndpointError> {
        let payload = self.core.codec().encode(message)?;
        self.core.notify(payload)
    }

    /// Install the inbound handler, replacing any previous one.
    ///
    /// The handler runs on this endpoint's executor for every request and
    /// one-way message. Ignored once the endpoint is closed.
    pub fn set_handler<Req, Resp, F>(&self, mut handler: F)
    where
        Req: DeserializeOwned + 'static,
        Resp: Serialize + 'static,
        F: FnMut(Req, Responder<Resp, C>) + Send + 'static,
    {
        self.core.set_handler(Box::new(
            move |core: &Arc<EndpointCore<C>>, request: Option<RequestId>, payload: Vec<u8>| {
                let responder = Responder::new(core.clone(), request);
                match core.codec().decode::<Req>(&payload) {
                    Ok(value) => handler(value, responder),
                    Err(e) => {
                        tracing::warn!(
                            interface = %core.interface(),
                            error = %e,
                            "failed to decode inbound message"
                        );
                        responder.send_error(ReplyError::Serialization {
                            message: e.to_string(),
                        });
                    }
                }
            },
        ));
    }

    /// Run `handler` once on this endpoint's executor when it closes.
    ///
    /// Replaces a previously registered handler. If the endpoint is already
    /// closed the handler is posted immediately.
    pub fn set_connection_error_handler<F>(&self, handler: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.core.set_error_handler(Box::new(handler));
    }

    /// Close the endpoint. Idempotent.
    ///
    /// Closing a master endpoint closes every endpoint on both sides of the
    /// link; closing an associated endpoint closes only it and its peer.
    pub fn close(&self) {
        self.core.close();
    }
}

impl<C: MessageCodec> Drop for Endpoint<C> {
    fn drop(&mut self) {
        self.core.close();
    }
}

impl<C: MessageCodec> std::fmt::Debug for Endpoint<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("link", &self.core.router.label())
            .field("interface", &self.core.interface)
            .field("executor", &self.core.runner.name())
            .field("closed", &self.is_closed())
            .finish()
    }
}
