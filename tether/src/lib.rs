//! # Tether
//!
//! Thread-affine executors and multiplexed endpoints.
//!
//! Every endpoint is bound to one executor, and everything addressed to it
//! (requests, replies, its connection-error notification) runs there. Links
//! join two master endpoints; associated endpoints share a link with their
//! master and are reached through it.
//!
//! ## Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 tether (this crate)                         │
//! │              Re-exports all functionality                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 tether-transport                            │
//! │  • Links, master and associated endpoints                   │
//! │  • Two-hop forwarding through the master executor           │
//! │  • Calls, responders, connection-error propagation          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   tether-core                               │
//! │  Executor + TaskRunner, InterfaceId/RequestId, codecs       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::{Arc, Mutex};
//!
//! use tether::{connect, Executor, ReplyError, Responder};
//!
//! let client_executor = Executor::builder().name("client").build();
//! let server_executor = Executor::builder().name("server").build();
//! let (client, server) = connect(client_executor.runner(), server_executor.runner());
//!
//! server.set_handler(|value: i32, responder: Responder<i32>| responder.send(value));
//!
//! let reply = Arc::new(Mutex::new(None));
//! let slot = reply.clone();
//! client
//!     .call(&1024, move |r: Result<i32, ReplyError>| {
//!         *slot.lock().unwrap() = Some(r);
//!     })
//!     .unwrap();
//!
//! server_executor.run_until_idle();
//! client_executor.run_until_idle();
//! assert_eq!(reply.lock().unwrap().take(), Some(Ok(1024)));
//! ```
//!
//! ## Which Crate to Use
//!
//! | Use case | Crate |
//! |----------|-------|
//! | Full library (recommended) | `tether` |
//! | Executors and ids only | `tether-core` |
//! | Endpoints on top of your own executors | `tether-transport` |

#![deny(missing_docs)]

pub use tether_core::*;
pub use tether_transport::*;
