//! Negotiation tracing for WebRTC peer connections
//!
//! This crate wraps a peer connection capability so that every negotiation
//! call, its outcome, each state notification and a periodic stats snapshot
//! become structured trace events, shipped over a WebSocket to a collector.
//!
//! # Features
//!
//! - **Capability probing**: resolves the connection constructor among
//!   several candidate bindings and fails loudly when none is present
//! - **Interception**: call and outcome events around offer/answer,
//!   description and candidate application; media and data channel calls
//! - **Passive listeners**: one event per ICE, signaling and connection state
//!   notification
//! - **Stats polling**: periodic `getStats` snapshots until the connection closes
//! - **Buffered event channel**: events produced before the socket opens are
//!   drained in order; reconnects with exponential backoff
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │  Application                                           │
//! │  ↓ CapabilityRegistry::get("RTCPeerConnection")        │
//! │  TracedFactory → TracedPeerConnection                  │
//! │  ├─ listeners (onicecandidate, ontrack, ...)           │
//! │  ├─ StatsReporter (getStats every interval)            │
//! │  └─ inner PeerConnection (webrtc-rs)                   │
//! │     ↓                                                   │
//! │  TraceEmitter → EventChannel (pending queue)           │
//! │     ↓ WebSocket                                         │
//! │  rtctrace-relay → consumer                             │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use rtctrace::TraceConfig;
//!
//! let config = TraceConfig {
//!     collector_url: "ws://localhost:3000".to_string(),
//!     stats_interval_ms: 500,
//!     ..Default::default()
//! };
//!
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Async Usage
//!
//! ```no_run
//! use rtctrace::{
//!     CapabilityRegistry, EventChannel, Instrumentation, InterceptOptions, TraceConfig,
//!     TraceEmitter, WebRtcFactory,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> rtctrace::Result<()> {
//! let config = TraceConfig::default();
//! let registry = CapabilityRegistry::new();
//! registry.bind("RTCPeerConnection", Arc::new(WebRtcFactory::new()?));
//!
//! let channel = Arc::new(EventChannel::from_config(&config)?);
//! let instrumentation = Instrumentation::setup(
//!     &registry,
//!     TraceEmitter::new(channel.clone()),
//!     InterceptOptions::from_config(&config),
//! )?;
//!
//! let pc = instrumentation.create(Default::default()).await?;
//! let _offer = pc.create_offer(None).await?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

pub mod capability;
pub mod channel;
pub mod collab;
pub mod config;
pub mod error;
pub mod interception;
pub mod peer;
pub mod record;
pub mod stats;
pub mod trace;

// Re-exports for public API
pub use capability::{CapabilityRegistry, ResolvedCapability};
pub use channel::{ChannelState, EventChannel, ReconnectionPolicy};
pub use collab::{MediaSource, RemoteTrackSink};
pub use config::{TraceConfig, DEFAULT_CAPABILITY_CANDIDATES};
pub use error::{Error, Result};
pub use interception::{
    connection_id, with_continuations, Instrumentation, InterceptOptions, TracedFactory,
    TracedPeerConnection, TracedSender,
};
pub use peer::webrtc_rs::{LocalTrack, WebRtcFactory};
pub use peer::{PeerConnection, PeerConnectionFactory};
pub use record::PeerConnectionRecord;
pub use stats::StatsReporter;
pub use trace::{ConnectionId, EventSink, MemorySink, TraceEmitter, TraceEvent};

/// Get the version of this crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
    }
}
