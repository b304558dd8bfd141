//! Collaborators outside the tracing pipeline
//!
//! Media acquisition and rendering belong to the application. The tracer
//! only needs a place to hand incoming tracks to, and the demo needs a
//! source of local tracks.

use crate::peer::{MediaStream, TrackHandle};
use crate::Result;
use async_trait::async_trait;

/// Receives remote tracks surfaced by the `track` notification
pub trait RemoteTrackSink: Send + Sync {
    /// Called once per incoming track, after it has been traced
    fn attach(&self, track: TrackHandle, stream_ids: &[String]);
}

/// Supplies local media to attach to a connection
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Acquire the local tracks, grouped into one stream
    async fn local_stream(&self) -> Result<MediaStream>;
}
