//! Thread-affine FIFO executor.
//!
//! An [`Executor`] is created on, and can only be driven by, its owning
//! thread. Any thread may post work through a [`TaskRunner`]. Tasks run in
//! strict FIFO order with the queue lock released, so a running task may post
//! more tasks onto the same executor or ask it to quit.
//!
//! ```text
//!  post_task ──▶ Mutex<QueueState> ──notify──▶ Condvar
//!                     │
//!                     ▼ (owner thread)
//!       run():          pop → unlock → task() → relock → quit? → …
//!       run_one_task(): wait → pop → unlock → task() → return
//! ```

mod builder;
mod runner;

pub use builder::ExecutorBuilder;
pub use runner::TaskRunner;

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

/// A unit of work posted onto an executor.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// State shared between an [`Executor`] and its [`TaskRunner`]s.
pub(crate) struct Shared {
    /// Name used in logs.
    name: String,

    /// Thread that created the executor.
    owner: ThreadId,

    /// Queue and flags, guarded together.
    queue: Mutex<QueueState>,

    /// Signalled whenever a task is pushed.
    task_ready: Condvar,
}

struct QueueState {
    tasks: VecDeque<Task>,

    /// Set by `quit()`, cleared when `run()` starts.
    quit: bool,

    /// Set once the owning `Executor` is dropped; later posts are discarded.
    shut_down: bool,

    executed: u64,
}

impl Shared {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            owner: thread::current().id(),
            queue: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                quit: false,
                shut_down: false,
                executed: 0,
            }),
            task_ready: Condvar::new(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    // Tasks never run while the lock is held, so a poisoned mutex only means
    // another thread panicked while pushing; the queue itself is intact.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a task. Returns `false` if the executor is gone.
    pub(crate) fn push(&self, task: Task) -> bool {
        let rejected = {
            let mut state = self.lock();
            if state.shut_down {
                Some(task)
            } else {
                state.tasks.push_back(task);
                None
            }
        };

        match rejected {
            Some(task) => {
                tracing::trace!(executor = %self.name, "executor shut down, discarding task");
                drop(task);
                false
            }
            None => {
                self.task_ready.notify_one();
                true
            }
        }
    }

    pub(crate) fn set_quit(&self) {
        self.lock().quit = true;
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        self.lock().shut_down
    }

    /// Block until a task is available and pop it.
    fn wait_for_task(&self) -> Task {
        let state = self.lock();
        let mut state = self
            .task_ready
            .wait_while(state, |s| s.tasks.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        match state.tasks.pop_front() {
            Some(task) => task,
            // wait_while only returns with a non-empty queue
            None => unreachable!("woke with an empty queue"),
        }
    }

    fn try_pop(&self) -> Option<Task> {
        self.lock().tasks.pop_front()
    }

    /// Record a finished task; returns whether quit was requested.
    fn finish_task(&self) -> bool {
        let mut state = self.lock();
        state.executed += 1;
        state.quit
    }
}

/// A FIFO task queue driven by the thread that created it.
///
/// The executor is `!Send`: the thread that creates it is the
/// only one that may call [`run`](Self::run), [`run_one_task`](Self::run_one_task)
/// or [`run_until_idle`](Self::run_until_idle). Other threads post work
/// through a [`TaskRunner`] obtained from [`runner`](Self::runner).
///
/// Panics raised by a task are not caught and unwind through the run loop.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use tether_core::Executor;
///
/// let executor = Executor::new();
/// let runner = executor.runner();
/// let counter = Arc::new(AtomicUsize::new(0));
///
/// let c = counter.clone();
/// let r = runner.clone();
/// runner.post_task(move || {
///     c.fetch_add(1, Ordering::SeqCst);
///     r.quit().expect("posted from the owner thread");
/// });
///
/// executor.run();
/// assert_eq!(counter.load(Ordering::SeqCst), 1);
/// ```
pub struct Executor {
    shared: Arc<Shared>,

    /// Pins the executor to its creating thread.
    _not_send: PhantomData<*const ()>,
}

impl Executor {
    /// Create an executor owned by the current thread with default settings.
    pub fn new() -> Self {
        ExecutorBuilder::new().build()
    }

    /// Start configuring a new executor.
    pub fn builder() -> ExecutorBuilder {
        ExecutorBuilder::new()
    }

    pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            _not_send: PhantomData,
        }
    }

    /// Name of this executor, as used in logs.
    pub fn name(&self) -> &str {
        self.shared.name()
    }

    /// A posting handle for this executor.
    pub fn runner(&self) -> TaskRunner {
        TaskRunner::new(self.shared.clone())
    }

    /// Post a task from the owning thread.
    pub fn post_task<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.push(Box::new(task));
    }

    /// Run tasks until [`quit`](Self::quit) is called from one of them.
    ///
    /// Blocks on the queue when it is empty. Quit is checked after every task,
    /// so the task that requests it finishes and no later task starts. Any
    /// quit requested before this call is discarded.
    pub fn run(&self) {
        let span = tracing::debug_span!("executor_run", executor = %self.shared.name());
        let _enter = span.enter();

        self.shared.lock().quit = false;
        loop {
            let task = self.shared.wait_for_task();
            task();
            if self.shared.finish_task() {
                tracing::trace!("quit observed");
                return;
            }
        }
    }

    /// Wait until a task is available, run exactly that one, and return.
    pub fn run_one_task(&self) {
        let task = self.shared.wait_for_task();
        tracing::trace!(executor = %self.shared.name(), "running one task");
        task();
        self.shared.finish_task();
    }

    /// Run queued tasks until the queue is empty, without blocking.
    ///
    /// Tasks posted by the tasks being run are run as well. Returns the
    /// number of tasks executed.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.shared.try_pop() {
            task();
            self.shared.finish_task();
            ran += 1;
        }
        tracing::trace!(executor = %self.shared.name(), ran, "executor idle");
        ran
    }

    /// Ask a surrounding [`run`](Self::run) to return after the current task.
    pub fn quit(&self) {
        self.shared.set_quit();
    }

    /// Number of tasks waiting in the queue.
    pub fn pending_tasks(&self) -> usize {
        self.shared.lock().tasks.len()
    }

    /// Total number of tasks this executor has run.
    pub fn executed_tasks(&self) -> u64 {
        self.shared.lock().executed
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("name", &self.shared.name())
            .field("pending_tasks", &self.pending_tasks())
            .finish()
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        let abandoned = {
            let mut state = self.shared.lock();
            state.shut_down = true;
            std::mem::take(&mut state.tasks)
        };
        if !abandoned.is_empty() {
            tracing::debug!(
                executor = %self.shared.name(),
                count = abandoned.len(),
                "executor dropped with queued tasks"
            );
        }
        // Dropping tasks may drop endpoints that post back here; the lock
        // must already be released.
        drop(abandoned);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn test_run_is_fifo() {
        let executor = Executor::new();
        let runner = executor.runner();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let order = order.clone();
            runner.post_task(move || order.lock().expect("order lock").push(i));
        }
        let r = runner.clone();
        runner.post_task(move || r.quit().expect("owner thread"));

        executor.run();
        assert_eq!(*order.lock().expect("order lock"), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_run_one_task_runs_exactly_one() {
        let executor = Executor::new();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let c = counter.clone();
            executor.post_task(move || {
                c.fetch_add(1, Ordering::SeqCst);
            });
        }

        executor.run_one_task();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(executor.pending_tasks(), 2);
        assert_eq!(executor.executed_tasks(), 1);
    }

    #[test]
    fn test_quit_stops_after_current_task() {
        let executor = Executor::new();
        let runner = executor.runner();
        let second_ran = Arc::new(AtomicBool::new(false));

        let r = runner.clone();
        runner.post_task(move || r.quit().expect("owner thread"));
        let flag = second_ran.clone();
        runner.post_task(move || flag.store(true, Ordering::SeqCst));

        executor.run();
        assert!(!second_ran.load(Ordering::SeqCst));
        assert_eq!(executor.pending_tasks(), 1);
    }

    #[test]
    fn test_quit_before_run_is_discarded() {
        let executor = Executor::new();
        let runner = executor.runner();
        executor.quit();

        let ran = Arc::new(AtomicUsize::new(0));
        let c = ran.clone();
        runner.post_task(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let c = ran.clone();
        let r = runner.clone();
        runner.post_task(move || {
            c.fetch_add(1, Ordering::SeqCst);
            r.quit().expect("owner thread");
        });

        executor.run();
        assert_eq!(ran.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_task_can_repost_onto_same_executor() {
        let executor = Executor::new();
        let runner = executor.runner();
        let hops = Arc::new(AtomicUsize::new(0));

        let r = runner.clone();
        let h = hops.clone();
        runner.post_task(move || {
            h.fetch_add(1, Ordering::SeqCst);
            let r2 = r.clone();
            let h2 = h.clone();
            r.post_task(move || {
                h2.fetch_add(1, Ordering::SeqCst);
                r2.quit().expect("owner thread");
            });
        });

        executor.run();
        assert_eq!(hops.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_run_until_idle_drains_nested_posts() {
        let executor = Executor::new();
        let runner = executor.runner();
        let count = Arc::new(AtomicUsize::new(0));

        let r = runner.clone();
        let c = count.clone();
        runner.post_task(move || {
            c.fetch_add(1, Ordering::SeqCst);
            let c2 = c.clone();
            r.post_task(move || {
                c2.fetch_add(1, Ordering::SeqCst);
            });
        });

        assert_eq!(executor.run_until_idle(), 2);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(executor.run_until_idle(), 0);
    }

    #[test]
    fn test_post_after_drop_is_discarded() {
        let executor = Executor::new();
        let runner = executor.runner();
        drop(executor);

        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        runner.post_task(move || flag.store(true, Ordering::SeqCst));

        assert!(runner.is_shut_down());
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_drop_releases_queued_tasks() {
        let executor = Executor::new();
        let token = Arc::new(());
        let held = token.clone();
        executor.post_task(move || drop(held));
        assert_eq!(Arc::strong_count(&token), 2);

        drop(executor);
        assert_eq!(Arc::strong_count(&token), 1);
    }
}
