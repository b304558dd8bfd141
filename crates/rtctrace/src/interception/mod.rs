//! Interception layer
//!
//! [`Instrumentation::setup`] resolves the peer connection capability in a
//! [`CapabilityRegistry`] and rebinds it to a [`TracedFactory`]. Every
//! connection created through the registry afterwards is a
//! [`TracedPeerConnection`]: it carries a fresh [`ConnectionId`], has passive
//! listeners attached, runs a stats reporter, and emits a trace event around
//! each negotiation call.
//!
//! ```text
//! application ──► TracedFactory::create ──► inner factory
//!                        │
//!                        ▼
//!                 TracedPeerConnection ──► inner connection
//!                        │
//!                        ▼
//!                  TraceEmitter ──► EventSink
//! ```

mod connection;
mod convention;
mod factory;
mod listeners;
mod sender;

pub use connection::TracedPeerConnection;
pub use convention::with_continuations;
pub use factory::TracedFactory;
pub use sender::TracedSender;

use crate::capability::CapabilityRegistry;
use crate::collab::RemoteTrackSink;
use crate::config::{TraceConfig, DEFAULT_CAPABILITY_CANDIDATES};
use crate::peer::{PeerConnection, PeerConnectionFactory, RtcConfiguration};
use crate::trace::{ConnectionId, TraceEmitter};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Options for [`Instrumentation::setup`]
#[derive(Clone)]
pub struct InterceptOptions {
    /// Bindings probed for the capability, first match wins
    pub candidates: Vec<String>,
    /// Stats polling interval per connection
    pub stats_interval: Duration,
    /// Receives incoming remote tracks
    pub track_sink: Option<Arc<dyn RemoteTrackSink>>,
}

impl Default for InterceptOptions {
    fn default() -> Self {
        Self {
            candidates: DEFAULT_CAPABILITY_CANDIDATES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            stats_interval: Duration::from_millis(1000),
            track_sink: None,
        }
    }
}

impl InterceptOptions {
    pub fn from_config(config: &TraceConfig) -> Self {
        Self {
            candidates: config.capability_candidates.clone(),
            stats_interval: config.stats_interval(),
            track_sink: None,
        }
    }

    pub fn with_track_sink(mut self, sink: Arc<dyn RemoteTrackSink>) -> Self {
        self.track_sink = Some(sink);
        self
    }

    pub fn with_stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }
}

/// Installed instrumentation of one capability registry
pub struct Instrumentation {
    binding: String,
    factory: Arc<dyn PeerConnectionFactory>,
}

impl Instrumentation {
    /// Wrap the capability bound in `registry`
    ///
    /// Safe to call more than once: when the resolved factory is already
    /// traced it is reused as is, and `emitter` / `options` of the later call
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CapabilityAbsent`] when no candidate is bound;
    /// the registry is not modified in that case.
    pub fn setup(
        registry: &CapabilityRegistry,
        emitter: TraceEmitter,
        options: InterceptOptions,
    ) -> Result<Self> {
        let InterceptOptions {
            candidates,
            stats_interval,
            track_sink,
        } = options;

        let resolved = registry.instrument(&candidates, move |inner| {
            Arc::new(TracedFactory::new(inner, emitter, stats_interval, track_sink))
        })?;

        info!(
            binding = %resolved.binding,
            "Peer connection tracing installed"
        );

        Ok(Self {
            binding: resolved.binding,
            factory: resolved.factory,
        })
    }

    /// Binding name the capability was found under
    pub fn binding(&self) -> &str {
        &self.binding
    }

    /// The traced factory now bound in the registry
    pub fn factory(&self) -> Arc<dyn PeerConnectionFactory> {
        Arc::clone(&self.factory)
    }

    /// Create a traced connection
    pub async fn create(&self, config: RtcConfiguration) -> Result<Arc<dyn PeerConnection>> {
        self.factory.create(config).await
    }
}

/// Identifier of a traced connection, `None` for untraced ones
pub fn connection_id(pc: &dyn PeerConnection) -> Option<ConnectionId> {
    pc.trace_id()
}
