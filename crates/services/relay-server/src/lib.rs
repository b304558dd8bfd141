//! rtctrace relay
//!
//! A WebSocket fan-in point between traced applications and one consumer.
//!
//! Every connection is a producer by default. A connection that sends the
//! control message (`"consumer"` unless configured otherwise) becomes the
//! single consumer; a later control message from another connection replaces
//! it. Producer messages that arrive with no consumer registered are buffered
//! and flushed, in arrival order, ahead of the next producer message once a
//! consumer exists.
//!
//! ```no_run
//! use rtctrace_relay::{RelayConfig, RelayServer};
//!
//! # async fn example() -> rtctrace_relay::Result<()> {
//! let server = RelayServer::bind(RelayConfig::default()).await?;
//! let handle = server.start();
//! println!("relay at {}", handle.url());
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod handler;
pub mod server;
pub mod state;

pub use config::{RelayConfig, DEFAULT_CONTROL_MESSAGE};
pub use error::{Error, Result};
pub use server::{RelayHandle, RelayServer};
pub use state::{ConnId, Disposition, RelayState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version
pub fn version() -> &'static str {
    VERSION
}
