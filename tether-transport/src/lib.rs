//! # tether-transport
//!
//! Multiplexed endpoints over in-process links.
//!
//! - **Link**: joins two master endpoints, one per side, each bound to its own
//!   executor ([`connect`], [`LinkBuilder`])
//! - **Associated endpoints**: extra interfaces sharing a side's link, created
//!   on one side and bound on the other ([`EndpointPair`], [`AssociatedRequest`])
//! - **Calls**: request/reply correlation with replies delivered on the
//!   caller's executor ([`Endpoint::call`], [`Responder`], [`ReplyReceiver`])
//! - **Connection errors**: closing either master tears down every endpoint on
//!   both sides; each endpoint reports it once on its own executor
//!
//! ## Message Path
//!
//! ```text
//!  caller executor      peer master executor      peer endpoint executor
//!  ───────────────      ────────────────────      ──────────────────────
//!  Endpoint::call ─────▶ Router::accept ─────────▶ handler(req, Responder)
//!                        (hop 1)                   (hop 2, associated only)
//!
//!  reply callback ◀───── Router::accept ◀───────── Responder::send
//!  (hop 2)               (hop 1, caller side)
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

mod config;
mod endpoint;
mod error;
mod link;
mod message;
mod pair;
mod router;
mod rpc;

pub use config::LinkConfig;
pub use endpoint::Endpoint;
pub use error::EndpointError;
pub use link::{connect, LinkBuilder};
pub use pair::{AssociatedRequest, EndpointPair};
pub use rpc::{ReplyError, ReplyReceiver, Responder};

pub use tether_core::{InterfaceId, JsonCodec, MessageCodec, RequestId, TaskRunner};
