//! Traced RTP sender

use crate::peer::{RtpSender, TrackHandle, TrackInfo};
use crate::trace::{ConnectionId, TraceEmitter};
use crate::Result;
use async_trait::async_trait;
use serde_json::json;
use std::any::Any;
use std::sync::Arc;

/// Sender wrapper emitting `replaceTrack` with the prior and new track
pub struct TracedSender {
    inner: Arc<dyn RtpSender>,
    id: ConnectionId,
    emitter: TraceEmitter,
}

impl TracedSender {
    pub(crate) fn new(inner: Arc<dyn RtpSender>, id: ConnectionId, emitter: TraceEmitter) -> Self {
        Self { inner, id, emitter }
    }

    /// The sender issued by the capability
    pub fn inner(&self) -> &Arc<dyn RtpSender> {
        &self.inner
    }
}

#[async_trait]
impl RtpSender for TracedSender {
    async fn track(&self) -> Option<TrackHandle> {
        self.inner.track().await
    }

    async fn replace_track(&self, track: Option<TrackHandle>) -> Result<()> {
        let old_track = self
            .inner
            .track()
            .await
            .map(|t| TrackInfo::of(t.as_ref()));
        let new_track = track.as_ref().map(|t| TrackInfo::of(t.as_ref()));

        self.emitter.emit(
            "replaceTrack",
            &self.id,
            &json!({ "oldTrack": old_track, "newTrack": new_track }),
        );
        self.inner.replace_track(track).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
