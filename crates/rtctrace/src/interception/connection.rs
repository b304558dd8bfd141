//! Traced peer connection

use super::sender::TracedSender;
use crate::peer::{
    AnswerOptions, DataChannelHandle, DataChannelInit, EventListener, IceCandidate, MediaStream,
    Method, OfferOptions, PeerConnection, PeerConnectionState, RtpSender, SessionDescription,
    StatsReport, TrackHandle, TrackInfo, TrackOrKind, TransceiverInit,
};
use crate::stats::StatsReporter;
use crate::trace::{to_trace_value, ConnectionId, TraceEmitter};
use crate::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::any::Any;
use std::future::Future;
use std::sync::Arc;

/// A peer connection whose calls are traced
///
/// Every operation delegates to the wrapped connection and returns exactly
/// what it returned. Operations the wrapped connection does not support are
/// passed through without emitting anything. [`PeerConnection::as_any`]
/// exposes the wrapped backend, so type checks written against the backend
/// keep working after instrumentation.
pub struct TracedPeerConnection {
    inner: Arc<dyn PeerConnection>,
    id: ConnectionId,
    emitter: TraceEmitter,
    stats: Option<StatsReporter>,
}

impl TracedPeerConnection {
    pub(crate) fn new(
        inner: Arc<dyn PeerConnection>,
        id: ConnectionId,
        emitter: TraceEmitter,
        stats: Option<StatsReporter>,
    ) -> Self {
        Self {
            inner,
            id,
            emitter,
            stats,
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// The connection being traced
    pub fn inner(&self) -> &Arc<dyn PeerConnection> {
        &self.inner
    }

    fn traced(&self, method: Method) -> bool {
        self.inner.supports(method)
    }

    /// Emit the call event, run `call`, then emit its outcome
    async fn around<T, F>(&self, method: Method, args: Value, call: F) -> Result<T>
    where
        T: Serialize,
        F: Future<Output = Result<T>>,
    {
        let name = method.name();
        self.emitter.emit(name, &self.id, &args);

        let result = call.await;
        match &result {
            Ok(value) => {
                self.emitter
                    .emit(&format!("{}OnSuccess", name), &self.id, value);
            }
            Err(e) => {
                self.emitter
                    .emit(&format!("{}OnFailure", name), &self.id, &e.to_string());
            }
        }
        result
    }

    /// Emit the call event, then run `call`
    async fn call_only<T, F>(&self, method: Method, args: Value, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.emitter.emit(method.name(), &self.id, &args);
        call.await
    }

    fn wrap_sender(&self, sender: Arc<dyn RtpSender>) -> Arc<dyn RtpSender> {
        Arc::new(TracedSender::new(sender, self.id.clone(), self.emitter.clone()))
    }
}

impl Drop for TracedPeerConnection {
    fn drop(&mut self) {
        if let Some(stats) = self.stats.take() {
            stats.abort();
        }
    }
}

fn options_value<T: Serialize>(method: Method, options: &Option<T>) -> Value {
    match options {
        Some(options) => to_trace_value(method.name(), options),
        None => Value::Null,
    }
}

fn track_or_kind_value(track_or_kind: &TrackOrKind) -> Value {
    match track_or_kind {
        TrackOrKind::Track(track) => json!(TrackInfo::of(track.as_ref())),
        TrackOrKind::Kind(kind) => json!(kind),
    }
}

#[async_trait]
impl PeerConnection for TracedPeerConnection {
    fn supports(&self, method: Method) -> bool {
        self.inner.supports(method)
    }

    async fn create_offer(&self, options: Option<OfferOptions>) -> Result<SessionDescription> {
        if !self.traced(Method::CreateOffer) {
            return self.inner.create_offer(options).await;
        }
        let args = options_value(Method::CreateOffer, &options);
        self.around(Method::CreateOffer, args, self.inner.create_offer(options))
            .await
    }

    async fn create_answer(&self, options: Option<AnswerOptions>) -> Result<SessionDescription> {
        if !self.traced(Method::CreateAnswer) {
            return self.inner.create_answer(options).await;
        }
        let args = options_value(Method::CreateAnswer, &options);
        self.around(Method::CreateAnswer, args, self.inner.create_answer(options))
            .await
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        if !self.traced(Method::SetLocalDescription) {
            return self.inner.set_local_description(description).await;
        }
        let args = to_trace_value(Method::SetLocalDescription.name(), &description);
        self.around(
            Method::SetLocalDescription,
            args,
            self.inner.set_local_description(description),
        )
        .await
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        if !self.traced(Method::SetRemoteDescription) {
            return self.inner.set_remote_description(description).await;
        }
        let args = to_trace_value(Method::SetRemoteDescription.name(), &description);
        self.around(
            Method::SetRemoteDescription,
            args,
            self.inner.set_remote_description(description),
        )
        .await
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        if !self.traced(Method::AddIceCandidate) {
            return self.inner.add_ice_candidate(candidate).await;
        }
        let args = to_trace_value(Method::AddIceCandidate.name(), &candidate);
        self.around(
            Method::AddIceCandidate,
            args,
            self.inner.add_ice_candidate(candidate),
        )
        .await
    }

    async fn add_stream(&self, stream: &MediaStream) -> Result<()> {
        if !self.traced(Method::AddStream) {
            return self.inner.add_stream(stream).await;
        }
        let args = json!(stream.info());
        self.call_only(Method::AddStream, args, self.inner.add_stream(stream))
            .await
    }

    async fn remove_stream(&self, stream: &MediaStream) -> Result<()> {
        if !self.traced(Method::RemoveStream) {
            return self.inner.remove_stream(stream).await;
        }
        let args = json!(stream.info());
        self.call_only(Method::RemoveStream, args, self.inner.remove_stream(stream))
            .await
    }

    async fn add_track(
        &self,
        track: TrackHandle,
        streams: &[MediaStream],
    ) -> Result<Arc<dyn RtpSender>> {
        if !self.traced(Method::AddTrack) {
            return self.inner.add_track(track, streams).await;
        }
        let args = json!({
            "track": TrackInfo::of(track.as_ref()),
            "streams": streams.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
        });
        let sender = self
            .call_only(Method::AddTrack, args, self.inner.add_track(track, streams))
            .await?;
        Ok(self.wrap_sender(sender))
    }

    async fn remove_track(&self, sender: &Arc<dyn RtpSender>) -> Result<()> {
        // Hand the capability the sender it issued
        let inner_sender = match sender.as_any().downcast_ref::<TracedSender>() {
            Some(traced) => Arc::clone(traced.inner()),
            None => Arc::clone(sender),
        };

        if !self.traced(Method::RemoveTrack) {
            return self.inner.remove_track(&inner_sender).await;
        }

        let track = inner_sender
            .track()
            .await
            .map(|track| TrackInfo::of(track.as_ref()));
        let args = json!({ "track": track });
        self.call_only(
            Method::RemoveTrack,
            args,
            self.inner.remove_track(&inner_sender),
        )
        .await
    }

    async fn add_transceiver(
        &self,
        track_or_kind: TrackOrKind,
        init: Option<TransceiverInit>,
    ) -> Result<Arc<dyn RtpSender>> {
        if !self.traced(Method::AddTransceiver) {
            return self.inner.add_transceiver(track_or_kind, init).await;
        }
        let args = json!({
            "trackOrKind": track_or_kind_value(&track_or_kind),
            "init": options_value(Method::AddTransceiver, &init),
        });
        let sender = self
            .call_only(
                Method::AddTransceiver,
                args,
                self.inner.add_transceiver(track_or_kind, init),
            )
            .await?;
        Ok(self.wrap_sender(sender))
    }

    async fn create_data_channel(
        &self,
        label: &str,
        init: Option<DataChannelInit>,
    ) -> Result<DataChannelHandle> {
        if !self.traced(Method::CreateDataChannel) {
            return self.inner.create_data_channel(label, init).await;
        }
        let args = json!({
            "label": label,
            "init": options_value(Method::CreateDataChannel, &init),
        });
        self.call_only(
            Method::CreateDataChannel,
            args,
            self.inner.create_data_channel(label, init),
        )
        .await
    }

    async fn close(&self) -> Result<()> {
        if !self.traced(Method::Close) {
            return self.inner.close().await;
        }
        self.emitter.emit_empty(Method::Close.name(), &self.id);
        self.inner.close().await
    }

    async fn get_stats(&self) -> Result<StatsReport> {
        self.inner.get_stats().await
    }

    fn connection_state(&self) -> PeerConnectionState {
        self.inner.connection_state()
    }

    fn add_event_listener(&self, listener: EventListener) {
        self.inner.add_event_listener(listener);
    }

    fn trace_id(&self) -> Option<ConnectionId> {
        Some(self.id.clone())
    }

    // Downcasts reach the backend type, as on an untraced connection
    fn as_any(&self) -> &dyn Any {
        self.inner.as_any()
    }
}
