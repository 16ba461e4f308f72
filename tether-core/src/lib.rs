//! # tether-core
//!
//! Core building blocks for the tether workspace:
//!
//! - **Executor**: a FIFO task queue bound to the thread that created it, with
//!   a blocking run loop, single-task stepping and quit signalling
//! - **TaskRunner**: a cloneable, thread-safe capability for posting onto one
//!   executor
//! - **Identifiers**: [`InterfaceId`] and [`RequestId`] used by the transport
//!   layer to address interfaces and correlate replies
//! - **Codec trait**: pluggable payload serialization ([`JsonCodec`] by default)
//!
//! ## Threading Model
//!
//! ```text
//!   any thread                         owner thread
//!  ┌──────────────┐   post_task()    ┌──────────────────────┐
//!  │  TaskRunner  │ ───────────────▶ │ Executor             │
//!  │  (Clone+Send)│                  │  VecDeque<Task>      │
//!  └──────────────┘                  │  run / run_one_task  │
//!                                    └──────────────────────┘
//! ```
//!
//! The [`Executor`] itself is `!Send`: only the creating thread can drive it.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

mod codec;
mod error;
mod executor;
mod types;

pub use codec::{CodecError, JsonCodec, MessageCodec};
pub use error::ExecutorError;
pub use executor::{Executor, ExecutorBuilder, Task, TaskRunner};
pub use types::{InterfaceId, RequestId};
