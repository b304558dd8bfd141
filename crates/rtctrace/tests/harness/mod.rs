//! Tracing Integration Test Harness
//!
//! Provides infrastructure for integration testing of the tracer with:
//! - A scripted in-memory peer connection capability
//! - An embedded WebSocket collector on a random port
//!
//! Basic usage pattern:
//!
//! 1. Bind a `MockFactory` in a `CapabilityRegistry`
//! 2. Install `Instrumentation` with a `MemorySink` or an `EventChannel`
//!    pointed at a `TestCollector`
//! 3. Drive the traced connection and inspect the recorded events

#![allow(dead_code)]

pub mod mock_peer;
pub mod test_collector;

pub use mock_peer::{MockFactory, MockPeerConnection, MockScript, MockSender, MockTrack};
pub use test_collector::TestCollector;

/// Result type for test harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Error type for test harness operations
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("Collector error: {0}")]
    CollectorError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Initialize test logging (call once per test)
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info,rtctrace=debug,webrtc=warn")
        .with_test_writer()
        .try_init();
}
