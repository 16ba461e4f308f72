//! Router: per-side multiplexer of a link.
//!
//! Each side of a link has one router. It owns the side's master endpoint and
//! every associated endpoint bound on that side, and accepts all inbound
//! traffic on the side's master executor.
//!
//! # Forwarding
//!
//! ```text
//!  peer side                     this side
//!  ─────────                     ─────────────────────────────────────────
//!  send_to_peer ──post (hop 1)──▶ master executor: Router::accept
//!                                  ├─ master interface → deliver inline
//!                                  └─ associated       ──post (hop 2)──▶
//!                                                        endpoint executor:
//!                                                        EndpointCore::deliver
//! ```
//!
//! # Slots
//!
//! - `Bound`: a live local endpoint
//! - `Pending`: the peer allocated the interface and sent traffic before this
//!   side bound it; messages wait in order
//! - `Retired`: this side closed a peer-allocated interface and waits for the
//!   peer to acknowledge, dropping anything still in flight

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tether_core::{InterfaceId, MessageCodec, TaskRunner};

use crate::config::LinkConfig;
use crate::endpoint::EndpointCore;
use crate::error::EndpointError;
use crate::message::Message;

/// Which end of the link a router serves. Decides the interface namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    /// Allocates interface ids without the namespace bit.
    Initiator,
    /// Allocates interface ids with [`InterfaceId::PEER_NAMESPACE_BIT`] set.
    Acceptor,
}

enum Slot<C: MessageCodec> {
    Bound(Arc<EndpointCore<C>>),
    Pending { backlog: VecDeque<Message> },
    Retired,
}

struct RouterState<C: MessageCodec> {
    closed: bool,
    peer: Option<Arc<Router<C>>>,
    slots: HashMap<InterfaceId, Slot<C>>,
    next_interface: u32,
}

impl<C: MessageCodec> RouterState<C> {
    fn live_associated(&self) -> usize {
        self.slots
            .iter()
            .filter(|(id, slot)| !id.is_master() && matches!(slot, Slot::Bound(_)))
            .count()
    }
}

/// One side of a link.
pub(crate) struct Router<C: MessageCodec> {
    side: Side,
    config: LinkConfig,
    codec: C,
    master_runner: TaskRunner,
    state: Mutex<RouterState<C>>,
}

impl<C: MessageCodec> Router<C> {
    fn new(side: Side, config: LinkConfig, codec: C, master_runner: TaskRunner) -> Arc<Self> {
        Arc::new(Self {
            side,
            config,
            codec,
            master_runner,
            state: Mutex::new(RouterState {
                closed: false,
                peer: None,
                slots: HashMap::new(),
                next_interface: 1,
            }),
        })
    }

    /// Build both sides of a link and bind their master endpoints.
    ///
    /// Returns the initiator's master core first.
    pub(crate) fn link(
        config: LinkConfig,
        codec: C,
        initiator: TaskRunner,
        acceptor: TaskRunner,
    ) -> (Arc<EndpointCore<C>>, Arc<EndpointCore<C>>) {
        let a = Router::new(Side::Initiator, config.clone(), codec.clone(), initiator);
        let b = Router::new(Side::Acceptor, config, codec, acceptor);

        let master_a = a.attach_master(b.clone());
        let master_b = b.attach_master(a.clone());

        tracing::debug!(
            link = %a.label(),
            initiator = %a.master_runner.name(),
            acceptor = %b.master_runner.name(),
            "link connected"
        );
        (master_a, master_b)
    }

    fn attach_master(self: &Arc<Self>, peer: Arc<Router<C>>) -> Arc<EndpointCore<C>> {
        let core = EndpointCore::new(InterfaceId::MASTER, self.master_runner.clone(), self.clone());
        let mut state = self.lock();
        state.peer = Some(peer);
        state.slots.insert(InterfaceId::MASTER, Slot::Bound(core.clone()));
        core
    }

    fn lock(&self) -> MutexGuard<'_, RouterState<C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn label(&self) -> &str {
        &self.config.label
    }

    pub(crate) fn codec(&self) -> &C {
        &self.codec
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub(crate) fn associated_count(&self) -> usize {
        self.lock().live_associated()
    }

    fn namespace_bit(&self) -> u32 {
        match self.side {
            Side::Initiator => 0,
            Side::Acceptor => InterfaceId::PEER_NAMESPACE_BIT,
        }
    }

    /// Whether `id` is an associated interface allocated by the other side.
    fn allocated_by_peer(&self, id: InterfaceId) -> bool {
        !id.is_master() && id.in_peer_namespace() == (self.side == Side::Initiator)
    }

    /// Hop 1: queue `message` on the peer's master executor.
    pub(crate) fn send_to_peer(&self, message: Message) {
        let peer = {
            let state = self.lock();
            if state.closed {
                None
            } else {
                state.peer.clone()
            }
        };

        match peer {
            Some(peer) => {
                let runner = peer.master_runner.clone();
                runner.post_task(move || peer.accept(message));
            }
            None => tracing::trace!(
                link = %self.label(),
                interface = %message.interface,
                "link closed, message dropped"
            ),
        }
    }

    /// Route an inbound message. Runs on this side's master executor.
    fn accept(&self, message: Message) {
        let closing = message.is_interface_closed();
        let (core, acknowledge) = {
            let mut state = self.lock();
            if state.closed {
                tracing::trace!(link = %self.label(), "router closed, inbound message dropped");
                return;
            }

            let peer_allocated = self.allocated_by_peer(message.interface);
            match state.slots.entry(message.interface) {
                Entry::Occupied(mut occupied) => {
                    if let Slot::Bound(core) = occupied.get() {
                        let core = core.clone();
                        if closing {
                            occupied.remove();
                        }
                        (core, closing && !peer_allocated)
                    } else {
                        if let Slot::Pending { backlog } = occupied.get_mut() {
                            backlog.push_back(message);
                        } else if closing {
                            occupied.remove();
                        }
                        return;
                    }
                }
                Entry::Vacant(vacant) => {
                    if peer_allocated {
                        tracing::trace!(
                            link = %self.label(),
                            interface = %message.interface,
                            "buffering message for unbound interface"
                        );
                        vacant.insert(Slot::Pending {
                            backlog: VecDeque::from([message]),
                        });
                    } else {
                        tracing::trace!(
                            link = %self.label(),
                            interface = %message.interface,
                            "unknown interface, message dropped"
                        );
                    }
                    return;
                }
            }
        };

        if acknowledge {
            self.send_to_peer(Message::interface_closed(message.interface));
        }

        if core.interface().is_master() {
            core.deliver(message);
        } else {
            let runner = core.runner().clone();
            runner.post_task(move || core.deliver(message));
        }
    }

    /// Allocate an interface id on this side and bind an endpoint to it.
    pub(crate) fn create_associated(
        self: &Arc<Self>,
        runner: TaskRunner,
    ) -> Result<Arc<EndpointCore<C>>, EndpointError> {
        let mut state = self.lock();
        if state.closed {
            return Err(EndpointError::LinkClosed);
        }
        let max = self.config.max_associated_endpoints;
        if state.live_associated() >= max {
            return Err(EndpointError::TooManyAssociated { max });
        }

        let interface = loop {
            let raw = state.next_interface;
            state.next_interface = if raw + 1 >= InterfaceId::PEER_NAMESPACE_BIT {
                1
            } else {
                raw + 1
            };
            let candidate = InterfaceId::new(raw | self.namespace_bit());
            if !state.slots.contains_key(&candidate) {
                break candidate;
            }
        };

        let core = EndpointCore::new(interface, runner, self.clone());
        state.slots.insert(interface, Slot::Bound(core.clone()));
        tracing::debug!(
            link = %self.label(),
            interface = %interface,
            executor = %core.runner().name(),
            "associated endpoint created"
        );
        Ok(core)
    }

    /// Bind a peer-allocated interface, flushing anything that arrived early.
    pub(crate) fn bind_associated(
        self: &Arc<Self>,
        interface: InterfaceId,
        runner: TaskRunner,
    ) -> Result<Arc<EndpointCore<C>>, EndpointError> {
        if !self.allocated_by_peer(interface) {
            return Err(EndpointError::InvalidInterface { interface });
        }

        let (core, backlog) = {
            let mut state = self.lock();
            if state.closed {
                return Err(EndpointError::LinkClosed);
            }
            if matches!(state.slots.get(&interface), Some(Slot::Bound(_) | Slot::Retired)) {
                return Err(EndpointError::AlreadyBound { interface });
            }
            let max = self.config.max_associated_endpoints;
            if state.live_associated() >= max {
                return Err(EndpointError::TooManyAssociated { max });
            }

            let backlog = match state.slots.remove(&interface) {
                Some(Slot::Pending { backlog }) => backlog,
                _ => VecDeque::new(),
            };

            let core = EndpointCore::new(interface, runner, self.clone());
            // The peer already closed and forgot it: the backlog tears the
            // endpoint down and no slot is kept.
            if !backlog.iter().any(Message::is_interface_closed) {
                state.slots.insert(interface, Slot::Bound(core.clone()));
            }
            (core, backlog)
        };

        tracing::debug!(
            link = %self.label(),
            interface = %interface,
            executor = %core.runner().name(),
            buffered = backlog.len(),
            "associated endpoint bound"
        );
        for message in backlog {
            let target = core.clone();
            core.runner().post_task(move || target.deliver(message));
        }
        Ok(core)
    }

    /// Forget a locally closed associated endpoint and tell the peer.
    pub(crate) fn detach(&self, interface: InterfaceId) {
        {
            let mut state = self.lock();
            if state.closed {
                return;
            }
            match state.slots.get(&interface) {
                Some(Slot::Bound(_)) => {}
                _ => return,
            }
            if self.allocated_by_peer(interface) {
                state.slots.insert(interface, Slot::Retired);
            } else {
                state.slots.remove(&interface);
            }
        }
        tracing::debug!(link = %self.label(), interface = %interface, "associated endpoint detached");
        self.send_to_peer(Message::interface_closed(interface));
    }

    /// Close this side: tear down every bound endpoint and optionally make
    /// the peer side do the same on its master executor.
    pub(crate) fn shut_down(&self, notify_peer: bool) {
        let (cores, peer) = {
            let mut state = self.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            let cores: Vec<_> = std::mem::take(&mut state.slots)
                .into_values()
                .filter_map(|slot| match slot {
                    Slot::Bound(core) => Some(core),
                    Slot::Pending { .. } | Slot::Retired => None,
                })
                .collect();
            (cores, state.peer.take())
        };

        tracing::debug!(
            link = %self.label(),
            side = ?self.side,
            endpoints = cores.len(),
            "link side shutting down"
        );
        for core in cores {
            core.teardown();
        }

        if notify_peer {
            if let Some(peer) = peer {
                let runner = peer.master_runner.clone();
                runner.post_task(move || peer.shut_down(false));
            }
        }
    }
}
