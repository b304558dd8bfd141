//! Traced connection constructor

use super::connection::TracedPeerConnection;
use super::listeners;
use crate::collab::RemoteTrackSink;
use crate::peer::{Method, PeerConnection, PeerConnectionFactory, RtcConfiguration};
use crate::stats::StatsReporter;
use crate::trace::{ConnectionId, TraceEmitter};
use crate::Result;
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Factory wrapper producing [`TracedPeerConnection`]s
pub struct TracedFactory {
    inner: Arc<dyn PeerConnectionFactory>,
    emitter: TraceEmitter,
    stats_interval: Duration,
    track_sink: Option<Arc<dyn RemoteTrackSink>>,
}

impl TracedFactory {
    pub fn new(
        inner: Arc<dyn PeerConnectionFactory>,
        emitter: TraceEmitter,
        stats_interval: Duration,
        track_sink: Option<Arc<dyn RemoteTrackSink>>,
    ) -> Self {
        Self {
            inner,
            emitter,
            stats_interval,
            track_sink,
        }
    }

    /// The factory being traced
    pub fn inner(&self) -> &Arc<dyn PeerConnectionFactory> {
        &self.inner
    }
}

#[async_trait]
impl PeerConnectionFactory for TracedFactory {
    #[instrument(skip(self, config))]
    async fn create(&self, config: RtcConfiguration) -> Result<Arc<dyn PeerConnection>> {
        // Construction errors reach the caller untraced
        let inner = self.inner.create(config).await?;
        let id = ConnectionId::generate();

        listeners::attach(
            inner.as_ref(),
            id.clone(),
            self.emitter.clone(),
            self.track_sink.clone(),
        );

        let stats = if inner.supports(Method::GetStats) {
            Some(StatsReporter::spawn(
                Arc::downgrade(&inner),
                id.clone(),
                self.emitter.clone(),
                self.stats_interval,
            ))
        } else {
            None
        };

        debug!(id = %id, "Traced peer connection created");
        Ok(Arc::new(TracedPeerConnection::new(
            inner,
            id,
            self.emitter.clone(),
            stats,
        )))
    }

    fn is_instrumented(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
