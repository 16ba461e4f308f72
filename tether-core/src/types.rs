//! Identifiers shared by the executor and transport layers.
//!
//! - [`InterfaceId`]: names one interface multiplexed on a link
//! - [`RequestId`]: correlates a reply with the call that produced it

use serde::{Deserialize, Serialize};

/// Identifier of one interface carried by a link.
///
/// Id `0` is always the master interface. Associated interfaces get ids
/// allocated by the side that creates them; the accepting side of a link
/// sets [`InterfaceId::PEER_NAMESPACE_BIT`] so both sides can allocate
/// without coordination.
///
/// # Examples
///
/// ```
/// use tether_core::InterfaceId;
///
/// assert!(InterfaceId::MASTER.is_master());
///
/// let id = InterfaceId::new(3);
/// assert!(!id.is_master());
/// assert_eq!(id.as_u32(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InterfaceId(u32);

impl InterfaceId {
    /// The master interface of every link.
    pub const MASTER: InterfaceId = InterfaceId(0);

    /// Bit set on ids allocated by the accepting side of a link.
    pub const PEER_NAMESPACE_BIT: u32 = 0x8000_0000;

    /// Create an id from its raw value.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw value of this id.
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Whether this is the master interface.
    pub const fn is_master(self) -> bool {
        self.0 == 0
    }

    /// Whether this id was allocated by the accepting side of a link.
    pub const fn in_peer_namespace(self) -> bool {
        self.0 & Self::PEER_NAMESPACE_BIT != 0
    }
}

impl std::fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_master() {
            write!(f, "master")
        } else {
            write!(f, "iface-{:08x}", self.0)
        }
    }
}

/// Identifier of one outstanding call on an endpoint.
///
/// Unique per endpoint, never reused while the endpoint is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(u64);

impl RequestId {
    /// Create a request id from its raw value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw value of this id.
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}
