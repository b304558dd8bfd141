//! Event channel to the trace collector
//!
//! - [`EventChannel`] - WebSocket connection with a pending-event queue
//! - [`ReconnectionPolicy`] - Backoff used after the socket drops

mod event_channel;
mod reconnect;

pub use event_channel::{ChannelState, EventChannel};
pub use reconnect::ReconnectionPolicy;
