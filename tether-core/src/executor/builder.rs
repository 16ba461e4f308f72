//! Executor configuration.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{Executor, Shared};

/// Builder for [`Executor`] with fluent API.
///
/// # Example
///
/// ```rust
/// use tether_core::Executor;
///
/// let executor = Executor::builder().name("binding").build();
/// assert_eq!(executor.name(), "binding");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExecutorBuilder {
    /// Name used in log fields. Generated when unset.
    name: Option<String>,
}

impl ExecutorBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name reported in logs and errors.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Build the executor. The calling thread becomes its owner.
    pub fn build(self) -> Executor {
        let name = self.name.unwrap_or_else(next_anonymous_name);
        tracing::debug!(executor = %name, "executor created");
        Executor::from_shared(Arc::new(Shared::new(name)))
    }
}

fn next_anonymous_name() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    format!("executor-{}", COUNTER.fetch_add(1, Ordering::Relaxed))
}
