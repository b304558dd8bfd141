//! Configuration types for connection tracing

use crate::channel::ReconnectionPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default bound on a single event channel socket write
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 5000;

/// Bindings probed for a peer connection capability, in order
pub const DEFAULT_CAPABILITY_CANDIDATES: [&str; 3] = [
    "RTCPeerConnection",
    "webkitRTCPeerConnection",
    "mozRTCPeerConnection",
];

/// Main configuration for the tracing pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Collector endpoint the event channel connects to (ws:// or wss://)
    pub collector_url: String,

    /// Stats polling interval in milliseconds (default: 1000ms)
    pub stats_interval_ms: u64,

    /// Capability bindings probed at setup, first match wins
    pub capability_candidates: Vec<String>,

    /// Event channel reconnection policy
    pub reconnect: ReconnectionPolicy,

    /// Bound on each event channel socket write, and on the whole flush
    /// performed by `close()` (default: 5000ms)
    pub write_timeout_ms: u64,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            collector_url: "ws://localhost:3000".to_string(),
            stats_interval_ms: 1000,
            capability_candidates: DEFAULT_CAPABILITY_CANDIDATES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            reconnect: ReconnectionPolicy::default(),
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
        }
    }
}

impl TraceConfig {
    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `collector_url` is not a WebSocket URL
    /// - `stats_interval_ms` is zero
    /// - `capability_candidates` is empty
    /// - `write_timeout_ms` is zero
    pub fn validate(&self) -> crate::Result<()> {
        use crate::Error;

        if !self.collector_url.starts_with("ws://") && !self.collector_url.starts_with("wss://") {
            return Err(Error::InvalidConfig(format!(
                "collector_url must start with ws:// or wss://, got {}",
                self.collector_url
            )));
        }

        if self.stats_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "stats_interval_ms must be greater than zero".to_string(),
            ));
        }

        if self.capability_candidates.is_empty() {
            return Err(Error::InvalidConfig(
                "At least one capability candidate is required".to_string(),
            ));
        }

        if self.write_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "write_timeout_ms must be greater than zero".to_string(),
            ));
        }

        self.reconnect.validate()
    }

    /// Stats polling interval as a Duration
    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms)
    }

    /// Event channel write timeout as a Duration
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}
