//! Scripted peer connection capability
//!
//! Every call is recorded together with the number of trace events the
//! observer sink held at the moment the call reached the capability, so tests
//! can check that call events were emitted before delegation.

use async_trait::async_trait;
use parking_lot::Mutex;
use rtctrace::peer::{
    AnswerOptions, ConnectionEvent, DataChannel, DataChannelHandle, DataChannelInit,
    EventListener, IceCandidate, MediaStream, MediaTrack, Method, OfferOptions, PeerConnection,
    PeerConnectionFactory, PeerConnectionState, RtcConfiguration, RtpSender, SessionDescription,
    StatsReport, TrackHandle, TrackKind, TrackOrKind, TransceiverInit,
};
use rtctrace::{Error, MemorySink, Result};
use serde_json::json;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Behaviour shared by every connection a [`MockFactory`] creates
#[derive(Clone, Default)]
pub struct MockScript {
    /// Methods reported as missing through `supports`
    pub unsupported: HashSet<Method>,
    /// Methods that fail with the given message
    pub failures: HashMap<Method, String>,
    /// Sink whose length is sampled on every call
    pub observer: Option<Arc<MemorySink>>,
}

impl MockScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unsupported(mut self, method: Method) -> Self {
        self.unsupported.insert(method);
        self
    }

    pub fn failing(mut self, method: Method, message: &str) -> Self {
        self.failures.insert(method, message.to_string());
        self
    }

    pub fn observed_by(mut self, sink: Arc<MemorySink>) -> Self {
        self.observer = Some(sink);
        self
    }
}

/// Test media track
pub struct MockTrack {
    id: String,
    kind: TrackKind,
}

impl MockTrack {
    pub fn audio(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            kind: TrackKind::Audio,
        })
    }

    pub fn video(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            kind: TrackKind::Video,
        })
    }
}

impl MediaTrack for MockTrack {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn label(&self) -> String {
        format!("mock {}", self.kind)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Sender issued by [`MockPeerConnection`]
pub struct MockSender {
    track: Mutex<Option<TrackHandle>>,
}

impl MockSender {
    fn new(track: Option<TrackHandle>) -> Self {
        Self {
            track: Mutex::new(track),
        }
    }
}

#[async_trait]
impl RtpSender for MockSender {
    async fn track(&self) -> Option<TrackHandle> {
        self.track.lock().clone()
    }

    async fn replace_track(&self, track: Option<TrackHandle>) -> Result<()> {
        *self.track.lock() = track;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct MockDataChannel {
    label: String,
    id: u16,
}

#[async_trait]
impl DataChannel for MockDataChannel {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn id(&self) -> Option<u16> {
        Some(self.id)
    }

    async fn send_text(&self, _text: &str) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// In-memory peer connection driven entirely by the test
pub struct MockPeerConnection {
    script: MockScript,
    state: Mutex<PeerConnectionState>,
    listeners: Mutex<Vec<EventListener>>,
    calls: Mutex<Vec<(Method, usize)>>,
    removed: Mutex<Vec<Arc<dyn RtpSender>>>,
    stats_polls: AtomicU64,
}

impl MockPeerConnection {
    pub fn new(script: MockScript) -> Self {
        Self {
            script,
            state: Mutex::new(PeerConnectionState::New),
            listeners: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
            stats_polls: AtomicU64::new(0),
        }
    }

    /// Raise a notification to every registered listener
    pub fn fire(&self, event: ConnectionEvent) {
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener(&event);
        }
    }

    pub fn set_state(&self, state: PeerConnectionState) {
        *self.state.lock() = state;
    }

    /// Calls received, with the observer's event count at call time
    pub fn calls(&self) -> Vec<(Method, usize)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, method: Method) -> usize {
        self.calls.lock().iter().filter(|(m, _)| *m == method).count()
    }

    /// Senders handed to `remove_track`
    pub fn removed_senders(&self) -> Vec<Arc<dyn RtpSender>> {
        self.removed.lock().clone()
    }

    pub fn stats_polls(&self) -> u64 {
        self.stats_polls.load(Ordering::SeqCst)
    }

    fn record(&self, method: Method) -> Result<()> {
        let seen = self.script.observer.as_ref().map_or(0, |sink| sink.len());
        self.calls.lock().push((method, seen));
        match self.script.failures.get(&method) {
            Some(message) => Err(Error::SdpError(message.clone())),
            None => Ok(()),
        }
    }

    fn description(&self, offer: bool) -> SessionDescription {
        let sdp = format!(
            "v=0\r\no=- {} 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n",
            self.calls.lock().len()
        );
        if offer {
            SessionDescription::offer(sdp)
        } else {
            SessionDescription::answer(sdp)
        }
    }
}

#[async_trait]
impl PeerConnection for MockPeerConnection {
    fn supports(&self, method: Method) -> bool {
        !self.script.unsupported.contains(&method)
    }

    async fn create_offer(&self, _options: Option<OfferOptions>) -> Result<SessionDescription> {
        self.record(Method::CreateOffer)?;
        // Yield so both call conventions really suspend
        tokio::task::yield_now().await;
        Ok(self.description(true))
    }

    async fn create_answer(&self, _options: Option<AnswerOptions>) -> Result<SessionDescription> {
        self.record(Method::CreateAnswer)?;
        tokio::task::yield_now().await;
        Ok(self.description(false))
    }

    async fn set_local_description(&self, _description: SessionDescription) -> Result<()> {
        self.record(Method::SetLocalDescription)
    }

    async fn set_remote_description(&self, _description: SessionDescription) -> Result<()> {
        self.record(Method::SetRemoteDescription)
    }

    async fn add_ice_candidate(&self, _candidate: IceCandidate) -> Result<()> {
        self.record(Method::AddIceCandidate)
    }

    async fn add_stream(&self, _stream: &MediaStream) -> Result<()> {
        self.record(Method::AddStream)
    }

    async fn remove_stream(&self, _stream: &MediaStream) -> Result<()> {
        self.record(Method::RemoveStream)
    }

    async fn add_track(
        &self,
        track: TrackHandle,
        _streams: &[MediaStream],
    ) -> Result<Arc<dyn RtpSender>> {
        self.record(Method::AddTrack)?;
        Ok(Arc::new(MockSender::new(Some(track))))
    }

    async fn remove_track(&self, sender: &Arc<dyn RtpSender>) -> Result<()> {
        self.record(Method::RemoveTrack)?;
        if sender.as_any().downcast_ref::<MockSender>().is_none() {
            return Err(Error::MediaTrackError("foreign sender".to_string()));
        }
        self.removed.lock().push(Arc::clone(sender));
        Ok(())
    }

    async fn add_transceiver(
        &self,
        track_or_kind: TrackOrKind,
        _init: Option<TransceiverInit>,
    ) -> Result<Arc<dyn RtpSender>> {
        self.record(Method::AddTransceiver)?;
        let track = match track_or_kind {
            TrackOrKind::Track(track) => Some(track),
            TrackOrKind::Kind(_) => None,
        };
        Ok(Arc::new(MockSender::new(track)))
    }

    async fn create_data_channel(
        &self,
        label: &str,
        _init: Option<DataChannelInit>,
    ) -> Result<DataChannelHandle> {
        self.record(Method::CreateDataChannel)?;
        Ok(Arc::new(MockDataChannel {
            label: label.to_string(),
            id: 1,
        }))
    }

    async fn close(&self) -> Result<()> {
        self.record(Method::Close)?;
        self.set_state(PeerConnectionState::Closed);
        Ok(())
    }

    async fn get_stats(&self) -> Result<StatsReport> {
        let polls = self.stats_polls.fetch_add(1, Ordering::SeqCst) + 1;
        let mut report = StatsReport::new();
        report.insert(
            "RTCTransport_0".to_string(),
            json!({"id": "RTCTransport_0", "type": "transport", "bytesSent": polls * 100}),
        );
        Ok(report)
    }

    fn connection_state(&self) -> PeerConnectionState {
        *self.state.lock()
    }

    fn add_event_listener(&self, listener: EventListener) {
        self.listeners.lock().push(listener);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Factory producing [`MockPeerConnection`]s
pub struct MockFactory {
    script: MockScript,
    created: Mutex<Vec<Arc<MockPeerConnection>>>,
}

impl MockFactory {
    pub fn new(script: MockScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            created: Mutex::new(Vec::new()),
        })
    }

    /// Most recently created connection
    pub fn last(&self) -> Option<Arc<MockPeerConnection>> {
        self.created.lock().last().cloned()
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().len()
    }
}

#[async_trait]
impl PeerConnectionFactory for MockFactory {
    async fn create(&self, _config: RtcConfiguration) -> Result<Arc<dyn PeerConnection>> {
        let pc = Arc::new(MockPeerConnection::new(self.script.clone()));
        self.created.lock().push(Arc::clone(&pc));
        Ok(pc)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
