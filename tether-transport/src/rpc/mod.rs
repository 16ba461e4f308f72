//! Request/reply correlation on top of endpoints.
//!
//! - **PendingCalls**: request id → continuation table owned by each endpoint
//! - **Responder**: handler-side reply handle, answers `BrokenPromise` when dropped
//! - **ReplyReceiver**: caller-side handle usable from other threads or async code
//! - **ReplyError**: errors delivered in place of a reply value

mod correlation;
mod reply_error;
mod reply_receiver;
mod responder;

pub(crate) use correlation::{Continuation, PendingCalls};
pub(crate) use reply_error::decode_reply;
pub use reply_error::ReplyError;
pub use reply_receiver::ReplyReceiver;
pub use responder::Responder;
