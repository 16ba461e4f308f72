//! Posting handle for an executor.

use std::sync::Arc;
use std::time::Duration;

use super::Shared;
use crate::error::ExecutorError;

/// Cloneable capability to post work onto one [`Executor`](super::Executor).
///
/// A `TaskRunner` does not keep the executor running: once the owning
/// `Executor` is dropped, posted tasks are discarded.
#[derive(Clone)]
pub struct TaskRunner {
    shared: Arc<Shared>,
}

impl TaskRunner {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Name of the target executor.
    pub fn name(&self) -> &str {
        self.shared.name()
    }

    /// Append a task to the executor's queue. Never blocks.
    pub fn post_task<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.push(Box::new(task));
    }

    /// Delayed scheduling is not supported; always returns an error.
    ///
    /// The task is dropped without running.
    pub fn post_delayed_task<F>(&self, task: F, delay: Duration) -> Result<(), ExecutorError>
    where
        F: FnOnce() + Send + 'static,
    {
        drop(task);
        tracing::error!(executor = %self.shared.name(), ?delay, "delayed task rejected");
        Err(ExecutorError::DelayedTaskUnsupported { delay })
    }

    /// Whether the calling thread is the executor's owner.
    pub fn runs_tasks_on_current_thread(&self) -> bool {
        self.shared.is_owner_thread()
    }

    /// Ask the executor's `run()` loop to return after the current task.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::WrongThread`] when called from a thread other
    /// than the executor's owner.
    pub fn quit(&self) -> Result<(), ExecutorError> {
        if !self.shared.is_owner_thread() {
            return Err(ExecutorError::WrongThread {
                executor: self.shared.name().to_string(),
            });
        }
        self.shared.set_quit();
        Ok(())
    }

    /// Whether both runners post onto the same executor.
    pub fn same_executor(&self, other: &TaskRunner) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Whether the owning executor has been dropped.
    pub fn is_shut_down(&self) -> bool {
        self.shared.is_shut_down()
    }
}

impl std::fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRunner")
            .field("executor", &self.shared.name())
            .finish()
    }
}
