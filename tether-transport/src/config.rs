//! Configuration for links.

/// Configuration shared by both sides of a link.
#[derive(Clone, Debug)]
pub struct LinkConfig {
    /// Label reported in log fields for everything on this link.
    pub label: String,

    /// Maximum number of live associated endpoints on each side.
    pub max_associated_endpoints: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            label: "link".to_string(),
            max_associated_endpoints: 1024,
        }
    }
}

impl LinkConfig {
    /// Create a configuration with the given label and default limits.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Set the per-side associated endpoint limit.
    pub fn with_max_associated_endpoints(mut self, max: usize) -> Self {
        self.max_associated_endpoints = max;
        self
    }
}
