//! Messages carried by a link.

use tether_core::{InterfaceId, RequestId};

/// What a [`Message`] means to the receiving endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MessageKind {
    /// One-way message; no reply expected.
    Notify,
    /// Call awaiting a reply correlated by the id.
    Request(RequestId),
    /// Reply to an earlier request.
    Response(RequestId),
    /// The sender closed its end of the interface.
    InterfaceClosed,
}

/// A unit of traffic on a link, addressed to one interface.
///
/// The payload is opaque here; it was produced by the link's codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Message {
    pub(crate) interface: InterfaceId,
    pub(crate) kind: MessageKind,
    pub(crate) payload: Vec<u8>,
}

impl Message {
    pub(crate) fn new(interface: InterfaceId, kind: MessageKind, payload: Vec<u8>) -> Self {
        Self {
            interface,
            kind,
            payload,
        }
    }

    pub(crate) fn response(interface: InterfaceId, request: RequestId, payload: Vec<u8>) -> Self {
        Self::new(interface, MessageKind::Response(request), payload)
    }

    pub(crate) fn interface_closed(interface: InterfaceId) -> Self {
        Self::new(interface, MessageKind::InterfaceClosed, Vec::new())
    }

    pub(crate) fn is_interface_closed(&self) -> bool {
        self.kind == MessageKind::InterfaceClosed
    }
}
