//! Creating links.
//!
//! A link joins two master endpoints, each bound to its own executor. Traffic
//! crossing it is always queued on the receiving side's master executor first.

use tether_core::{JsonCodec, MessageCodec, TaskRunner};

use crate::config::LinkConfig;
use crate::endpoint::Endpoint;
use crate::router::Router;

/// Connect two executors with a default JSON link.
///
/// Returns `(initiator, acceptor)` master endpoints bound to `a` and `b`.
pub fn connect(a: TaskRunner, b: TaskRunner) -> (Endpoint, Endpoint) {
    LinkBuilder::new().connect(a, b)
}

/// Builder for links with custom configuration or codec.
///
/// # Example
///
/// ```rust,ignore
/// let (client, server) = LinkBuilder::new()
///     .label("connection")
///     .config(LinkConfig::default().with_max_associated_endpoints(8))
///     .connect(client_runner, server_runner);
/// ```
#[derive(Debug, Clone)]
pub struct LinkBuilder<C: MessageCodec = JsonCodec> {
    config: LinkConfig,
    codec: C,
}

impl Default for LinkBuilder<JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkBuilder<JsonCodec> {
    /// Builder with default configuration and the JSON codec.
    pub fn new() -> Self {
        Self {
            config: LinkConfig::default(),
            codec: JsonCodec,
        }
    }
}

impl<C: MessageCodec> LinkBuilder<C> {
    /// Replace the whole configuration.
    pub fn config(mut self, config: LinkConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the label used in log fields.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.config.label = label.into();
        self
    }

    /// Use a different payload codec.
    pub fn codec<C2: MessageCodec>(self, codec: C2) -> LinkBuilder<C2> {
        LinkBuilder {
            config: self.config,
            codec,
        }
    }

    /// Create the link.
    ///
    /// Returns `(initiator, acceptor)` master endpoints bound to
    /// `initiator` and `acceptor`.
    pub fn connect(self, initiator: TaskRunner, acceptor: TaskRunner) -> (Endpoint<C>, Endpoint<C>) {
        let (a, b) = Router::link(self.config, self.codec, initiator, acceptor);
        (Endpoint::from_core(a), Endpoint::from_core(b))
    }
}
