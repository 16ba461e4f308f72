//! Error types for executor operations.

use std::time::Duration;

/// Errors reported by [`TaskRunner`](crate::TaskRunner) operations.
///
/// Both variants describe caller bugs rather than runtime conditions; they are
/// returned instead of aborting so the caller decides how loudly to fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutorError {
    /// Delayed scheduling is not implemented by this executor.
    #[error("delayed tasks are not supported (requested delay {delay:?})")]
    DelayedTaskUnsupported {
        /// The delay that was requested.
        delay: Duration,
    },

    /// An owner-only operation was invoked from a foreign thread.
    #[error("executor '{executor}' can only be driven from its owning thread")]
    WrongThread {
        /// Name of the executor.
        executor: String,
    },
}
