//! webrtc-rs backed peer connection capability
//!
//! webrtc-rs keeps a single handler per notification, so each connection
//! installs its handlers once at construction and fans every notification
//! out to the registered [`EventListener`]s.

use super::{
    AnswerOptions, ConnectionEvent, DataChannel, DataChannelHandle, DataChannelInit,
    EventListener, IceCandidate, IceConnectionState, IceGatheringState, MediaStream,
    MediaTrack, Method, OfferOptions, PeerConnection, PeerConnectionFactory,
    PeerConnectionState, RtcConfiguration, RtpSender, SdpType, SessionDescription,
    SignalingState, StatsReport, TrackHandle, TrackKind, TrackOrKind, TransceiverDirection,
    TransceiverInit,
};
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MediaEngine, MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::api::{APIBuilder, API};
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_gatherer_state::RTCIceGathererState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::offer_answer_options::{RTCAnswerOptions, RTCOfferOptions};
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverInit};
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

type Listeners = Arc<RwLock<Vec<EventListener>>>;

fn dispatch(listeners: &Listeners, event: ConnectionEvent) {
    // Clone out of the lock so a listener may register further listeners
    let snapshot: Vec<EventListener> = listeners.read().clone();
    for listener in snapshot {
        listener(&event);
    }
}

/// Factory creating webrtc-rs peer connections
pub struct WebRtcFactory {
    api: API,
}

impl WebRtcFactory {
    /// Build a factory with the default codecs and interceptors
    pub fn new() -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| Error::WebRtcError(format!("Failed to register codecs: {}", e)))?;

        let interceptor_registry = register_default_interceptors(Registry::new(), &mut media_engine)
            .map_err(|e| Error::WebRtcError(format!("Failed to register interceptors: {}", e)))?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(interceptor_registry)
            .build();

        Ok(Self { api })
    }
}

#[async_trait]
impl PeerConnectionFactory for WebRtcFactory {
    #[instrument(skip(self, config), fields(ice_servers = config.ice_servers.len()))]
    async fn create(&self, config: RtcConfiguration) -> Result<Arc<dyn PeerConnection>> {
        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .into_iter()
                .map(|server| RTCIceServer {
                    urls: server.urls,
                    username: server.username,
                    credential: server.credential,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(self.api.new_peer_connection(rtc_config).await.map_err(
            |e| Error::WebRtcError(format!("Failed to create peer connection: {}", e)),
        )?);

        let connection = WebRtcPeerConnection::new(peer_connection);
        info!("Created webrtc-rs peer connection");
        Ok(Arc::new(connection))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A webrtc-rs peer connection exposed through [`PeerConnection`]
pub struct WebRtcPeerConnection {
    peer_connection: Arc<RTCPeerConnection>,
    listeners: Listeners,
}

impl WebRtcPeerConnection {
    fn new(peer_connection: Arc<RTCPeerConnection>) -> Self {
        let listeners: Listeners = Arc::new(RwLock::new(Vec::new()));
        install_handlers(&peer_connection, &listeners);
        Self {
            peer_connection,
            listeners,
        }
    }

    /// The underlying webrtc-rs connection
    pub fn peer_connection(&self) -> &Arc<RTCPeerConnection> {
        &self.peer_connection
    }
}

fn install_handlers(pc: &RTCPeerConnection, listeners: &Listeners) {
    let l = Arc::clone(listeners);
    pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
        let l = Arc::clone(&l);
        Box::pin(async move {
            let candidate = candidate.as_ref().map(local_candidate);
            dispatch(&l, ConnectionEvent::IceCandidate(candidate));
        })
    }));

    let l = Arc::clone(listeners);
    pc.on_track(Box::new(
        move |track: Arc<TrackRemote>,
              _receiver: Arc<RTCRtpReceiver>,
              _transceiver: Arc<RTCRtpTransceiver>| {
            let l = Arc::clone(&l);
            Box::pin(async move {
                let streams = vec![track.stream_id()];
                let handle: TrackHandle = Arc::new(RemoteTrack { inner: track });
                dispatch(&l, ConnectionEvent::Track { track: handle, streams });
            })
        },
    ));

    let l = Arc::clone(listeners);
    pc.on_signaling_state_change(Box::new(move |state: RTCSignalingState| {
        let l = Arc::clone(&l);
        Box::pin(async move {
            if let Some(state) = signaling_state(state) {
                dispatch(&l, ConnectionEvent::SignalingStateChange(state));
            }
        })
    }));

    let l = Arc::clone(listeners);
    pc.on_ice_connection_state_change(Box::new(move |state: RTCIceConnectionState| {
        let l = Arc::clone(&l);
        Box::pin(async move {
            if let Some(state) = ice_connection_state(state) {
                dispatch(&l, ConnectionEvent::IceConnectionStateChange(state));
            }
        })
    }));

    let l = Arc::clone(listeners);
    pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
        let l = Arc::clone(&l);
        Box::pin(async move {
            if let Some(state) = connection_state(state) {
                dispatch(&l, ConnectionEvent::ConnectionStateChange(state));
            }
        })
    }));

    let l = Arc::clone(listeners);
    pc.on_ice_gathering_state_change(Box::new(move |state: RTCIceGathererState| {
        let l = Arc::clone(&l);
        Box::pin(async move {
            let state = match state {
                RTCIceGathererState::New => IceGatheringState::New,
                RTCIceGathererState::Gathering => IceGatheringState::Gathering,
                RTCIceGathererState::Complete => IceGatheringState::Complete,
                _ => return,
            };
            dispatch(&l, ConnectionEvent::IceGatheringStateChange(state));
        })
    }));

    let l = Arc::clone(listeners);
    pc.on_negotiation_needed(Box::new(move || {
        let l = Arc::clone(&l);
        Box::pin(async move {
            dispatch(&l, ConnectionEvent::NegotiationNeeded);
        })
    }));

    let l = Arc::clone(listeners);
    pc.on_data_channel(Box::new(move |channel: Arc<RTCDataChannel>| {
        let l = Arc::clone(&l);
        Box::pin(async move {
            debug!("Remote data channel opened: label={}", channel.label());
            let handle: DataChannelHandle = Arc::new(WebRtcDataChannel { inner: channel });
            dispatch(&l, ConnectionEvent::DataChannel(handle));
        })
    }));
}

#[async_trait]
impl PeerConnection for WebRtcPeerConnection {
    async fn create_offer(&self, options: Option<OfferOptions>) -> Result<SessionDescription> {
        let options = options.map(|o| RTCOfferOptions {
            ice_restart: o.ice_restart,
            voice_activity_detection: o.voice_activity_detection.unwrap_or(false),
        });
        let offer = self
            .peer_connection
            .create_offer(options)
            .await
            .map_err(|e| Error::SdpError(format!("Failed to create offer: {}", e)))?;
        from_rtc_description(offer)
    }

    async fn create_answer(&self, options: Option<AnswerOptions>) -> Result<SessionDescription> {
        let options = options.map(|o| RTCAnswerOptions {
            voice_activity_detection: o.voice_activity_detection.unwrap_or(false),
        });
        let answer = self
            .peer_connection
            .create_answer(options)
            .await
            .map_err(|e| Error::SdpError(format!("Failed to create answer: {}", e)))?;
        from_rtc_description(answer)
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_local_description(to_rtc_description(description)?)
            .await
            .map_err(|e| Error::SdpError(format!("Failed to set local description: {}", e)))
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_remote_description(to_rtc_description(description)?)
            .await
            .map_err(|e| Error::SdpError(format!("Failed to set remote description: {}", e)))
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.peer_connection
            .add_ice_candidate(candidate.into())
            .await
            .map_err(|e| Error::IceCandidateError(format!("Failed to add ICE candidate: {}", e)))
    }

    async fn add_track(
        &self,
        track: TrackHandle,
        _streams: &[MediaStream],
    ) -> Result<Arc<dyn RtpSender>> {
        // webrtc-rs carries the stream id on the track itself
        let local = local_track(&track)?;
        let sender = self
            .peer_connection
            .add_track(local)
            .await
            .map_err(|e| Error::MediaTrackError(format!("Failed to add track: {}", e)))?;
        Ok(Arc::new(WebRtcSender { inner: sender }))
    }

    async fn remove_track(&self, sender: &Arc<dyn RtpSender>) -> Result<()> {
        let sender = sender
            .as_any()
            .downcast_ref::<WebRtcSender>()
            .ok_or_else(|| {
                Error::MediaTrackError("Sender does not belong to this connection".to_string())
            })?;
        self.peer_connection
            .remove_track(&sender.inner)
            .await
            .map_err(|e| Error::MediaTrackError(format!("Failed to remove track: {}", e)))
    }

    async fn add_transceiver(
        &self,
        track_or_kind: TrackOrKind,
        init: Option<TransceiverInit>,
    ) -> Result<Arc<dyn RtpSender>> {
        let init = init.map(|init| RTCRtpTransceiverInit {
            direction: match init.direction {
                TransceiverDirection::Sendrecv => RTCRtpTransceiverDirection::Sendrecv,
                TransceiverDirection::Sendonly => RTCRtpTransceiverDirection::Sendonly,
                TransceiverDirection::Recvonly => RTCRtpTransceiverDirection::Recvonly,
                TransceiverDirection::Inactive => RTCRtpTransceiverDirection::Inactive,
            },
            send_encodings: vec![],
        });

        let transceiver = match track_or_kind {
            TrackOrKind::Track(track) => {
                self.peer_connection
                    .add_transceiver_from_track(local_track(&track)?, init)
                    .await
            }
            TrackOrKind::Kind(kind) => {
                self.peer_connection
                    .add_transceiver_from_kind(codec_type(kind), init)
                    .await
            }
        }
        .map_err(|e| Error::MediaTrackError(format!("Failed to add transceiver: {}", e)))?;

        Ok(Arc::new(WebRtcSender {
            inner: transceiver.sender().await,
        }))
    }

    async fn create_data_channel(
        &self,
        label: &str,
        init: Option<DataChannelInit>,
    ) -> Result<DataChannelHandle> {
        let init = init.map(|init| RTCDataChannelInit {
            ordered: init.ordered,
            max_retransmits: init.max_retransmits,
            protocol: init.protocol,
            ..Default::default()
        });
        let channel = self
            .peer_connection
            .create_data_channel(label, init)
            .await
            .map_err(|e| {
                Error::DataChannelError(format!("Failed to create data channel: {}", e))
            })?;
        Ok(Arc::new(WebRtcDataChannel { inner: channel }))
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection
            .close()
            .await
            .map_err(|e| Error::PeerConnectionError(format!("Failed to close: {}", e)))
    }

    async fn get_stats(&self) -> Result<StatsReport> {
        let report = self.peer_connection.get_stats().await;
        match serde_json::to_value(&report)? {
            serde_json::Value::Object(map) => Ok(map),
            other => {
                let mut map = StatsReport::new();
                map.insert("report".to_string(), other);
                Ok(map)
            }
        }
    }

    fn connection_state(&self) -> PeerConnectionState {
        connection_state(self.peer_connection.connection_state()).unwrap_or(PeerConnectionState::New)
    }

    fn add_event_listener(&self, listener: EventListener) {
        self.listeners.write().push(listener);
    }

    fn supports(&self, method: Method) -> bool {
        // No legacy stream API in webrtc-rs
        !matches!(method, Method::AddStream | Method::RemoveStream)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A local track created for, or returned by, webrtc-rs
pub struct LocalTrack {
    inner: Arc<dyn TrackLocal + Send + Sync>,
}

impl LocalTrack {
    /// An Opus audio track fed with samples by the media collaborator
    pub fn opus(id: impl Into<String>, stream_id: impl Into<String>) -> Self {
        Self::sample(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48000,
                channels: 2,
                ..Default::default()
            },
            id,
            stream_id,
        )
    }

    /// A VP8 video track fed with samples by the media collaborator
    pub fn vp8(id: impl Into<String>, stream_id: impl Into<String>) -> Self {
        Self::sample(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90000,
                ..Default::default()
            },
            id,
            stream_id,
        )
    }

    fn sample(
        codec: RTCRtpCodecCapability,
        id: impl Into<String>,
        stream_id: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(TrackLocalStaticSample::new(codec, id.into(), stream_id.into())),
        }
    }

    /// Sample writer, when this track was created by [`LocalTrack::opus`] or
    /// [`LocalTrack::vp8`]
    pub fn sample_track(&self) -> Option<&TrackLocalStaticSample> {
        self.inner.as_any().downcast_ref::<TrackLocalStaticSample>()
    }
}

impl MediaTrack for LocalTrack {
    fn id(&self) -> String {
        self.inner.id().to_string()
    }

    fn kind(&self) -> TrackKind {
        track_kind(self.inner.kind())
    }

    fn label(&self) -> String {
        self.inner.stream_id().to_string()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A track received from the remote peer
pub struct RemoteTrack {
    inner: Arc<TrackRemote>,
}

impl RemoteTrack {
    pub fn inner(&self) -> &Arc<TrackRemote> {
        &self.inner
    }
}

impl MediaTrack for RemoteTrack {
    fn id(&self) -> String {
        self.inner.id()
    }

    fn kind(&self) -> TrackKind {
        track_kind(self.inner.kind())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Sender returned by `add_track` / `add_transceiver`
pub struct WebRtcSender {
    inner: Arc<RTCRtpSender>,
}

#[async_trait]
impl RtpSender for WebRtcSender {
    async fn track(&self) -> Option<TrackHandle> {
        self.inner
            .track()
            .await
            .map(|track| Arc::new(LocalTrack { inner: track }) as TrackHandle)
    }

    async fn replace_track(&self, track: Option<TrackHandle>) -> Result<()> {
        let track = match track {
            Some(track) => Some(local_track(&track)?),
            None => None,
        };
        self.inner
            .replace_track(track)
            .await
            .map_err(|e| Error::MediaTrackError(format!("Failed to replace track: {}", e)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Data channel backed by webrtc-rs
pub struct WebRtcDataChannel {
    inner: Arc<RTCDataChannel>,
}

#[async_trait]
impl DataChannel for WebRtcDataChannel {
    fn label(&self) -> String {
        self.inner.label().to_string()
    }

    fn id(&self) -> Option<u16> {
        Some(self.inner.id())
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        self.inner
            .send_text(text.to_string())
            .await
            .map(|_| ())
            .map_err(|e| Error::DataChannelError(format!("Failed to send: {}", e)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn local_track(track: &TrackHandle) -> Result<Arc<dyn TrackLocal + Send + Sync>> {
    track
        .as_any()
        .downcast_ref::<LocalTrack>()
        .map(|local| Arc::clone(&local.inner))
        .ok_or_else(|| {
            Error::MediaTrackError(format!(
                "Track {} was not created by the webrtc-rs backend",
                track.id()
            ))
        })
}

fn track_kind(codec_type: RTPCodecType) -> TrackKind {
    match codec_type {
        RTPCodecType::Video => TrackKind::Video,
        _ => TrackKind::Audio,
    }
}

fn codec_type(kind: TrackKind) -> RTPCodecType {
    match kind {
        TrackKind::Audio => RTPCodecType::Audio,
        TrackKind::Video => RTPCodecType::Video,
    }
}

fn from_rtc_description(description: RTCSessionDescription) -> Result<SessionDescription> {
    let sdp_type = match description.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        RTCSdpType::Rollback => SdpType::Rollback,
        RTCSdpType::Unspecified => {
            return Err(Error::SdpError("Description has no type".to_string()))
        }
    };
    Ok(SessionDescription {
        sdp_type,
        sdp: description.sdp,
    })
}

fn to_rtc_description(description: SessionDescription) -> Result<RTCSessionDescription> {
    let parsed = match description.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(description.sdp),
        SdpType::Answer => RTCSessionDescription::answer(description.sdp),
        SdpType::Pranswer => RTCSessionDescription::pranswer(description.sdp),
        SdpType::Rollback => {
            let mut rollback = RTCSessionDescription::default();
            rollback.sdp_type = RTCSdpType::Rollback;
            return Ok(rollback);
        }
    };
    parsed.map_err(|e| Error::SdpError(format!("Invalid SDP: {}", e)))
}

fn signaling_state(state: RTCSignalingState) -> Option<SignalingState> {
    Some(match state {
        RTCSignalingState::Stable => SignalingState::Stable,
        RTCSignalingState::HaveLocalOffer => SignalingState::HaveLocalOffer,
        RTCSignalingState::HaveRemoteOffer => SignalingState::HaveRemoteOffer,
        RTCSignalingState::HaveLocalPranswer => SignalingState::HaveLocalPranswer,
        RTCSignalingState::HaveRemotePranswer => SignalingState::HaveRemotePranswer,
        RTCSignalingState::Closed => SignalingState::Closed,
        _ => return None,
    })
}

fn ice_connection_state(state: RTCIceConnectionState) -> Option<IceConnectionState> {
    Some(match state {
        RTCIceConnectionState::New => IceConnectionState::New,
        RTCIceConnectionState::Checking => IceConnectionState::Checking,
        RTCIceConnectionState::Connected => IceConnectionState::Connected,
        RTCIceConnectionState::Completed => IceConnectionState::Completed,
        RTCIceConnectionState::Disconnected => IceConnectionState::Disconnected,
        RTCIceConnectionState::Failed => IceConnectionState::Failed,
        RTCIceConnectionState::Closed => IceConnectionState::Closed,
        _ => return None,
    })
}

fn connection_state(state: RTCPeerConnectionState) -> Option<PeerConnectionState> {
    Some(match state {
        RTCPeerConnectionState::New => PeerConnectionState::New,
        RTCPeerConnectionState::Connecting => PeerConnectionState::Connecting,
        RTCPeerConnectionState::Connected => PeerConnectionState::Connected,
        RTCPeerConnectionState::Disconnected => PeerConnectionState::Disconnected,
        RTCPeerConnectionState::Failed => PeerConnectionState::Failed,
        RTCPeerConnectionState::Closed => PeerConnectionState::Closed,
        _ => return None,
    })
}

impl From<RTCIceCandidateInit> for IceCandidate {
    fn from(init: RTCIceCandidateInit) -> Self {
        Self {
            candidate: init.candidate,
            sdp_mid: init.sdp_mid,
            sdp_mline_index: init.sdp_mline_index,
            username_fragment: init.username_fragment,
        }
    }
}

/// Describe a gathered candidate, falling back to its display form when it
/// cannot be expressed as a candidate line
fn local_candidate(candidate: &RTCIceCandidate) -> IceCandidate {
    match candidate.to_json() {
        Ok(init) => IceCandidate::from(init),
        Err(e) => {
            warn!("Failed to serialize local ICE candidate: {}", e);
            IceCandidate {
                candidate: candidate.to_string(),
                sdp_mid: None,
                sdp_mline_index: None,
                username_fragment: None,
            }
        }
    }
}

impl From<IceCandidate> for RTCIceCandidateInit {
    fn from(candidate: IceCandidate) -> Self {
        Self {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_mline_index,
            username_fragment: candidate.username_fragment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_conversion_keeps_fields() {
        let candidate = IceCandidate {
            candidate: "candidate:1 1 udp 1 127.0.0.1 9 typ host".to_string(),
            sdp_mid: Some("0".to_string()),
            sdp_mline_index: Some(0),
            username_fragment: Some("abcd".to_string()),
        };
        let init: RTCIceCandidateInit = candidate.clone().into();
        assert_eq!(IceCandidate::from(init), candidate);
    }

    #[test]
    fn test_unserializable_candidate_still_described() {
        // Unspecified candidate type has no candidate line
        let candidate = RTCIceCandidate {
            address: "192.0.2.1".to_string(),
            port: 9,
            ..Default::default()
        };
        assert!(candidate.to_json().is_err());

        let described = local_candidate(&candidate);
        assert_eq!(described.candidate, candidate.to_string());
        assert!(described.candidate.contains("192.0.2.1"));
        assert_eq!(described.sdp_mid, None);
    }

    #[test]
    fn test_local_track_descriptor() {
        let track = LocalTrack::opus("mic", "local-stream");
        assert_eq!(track.id(), "mic");
        assert_eq!(track.kind(), TrackKind::Audio);
        assert!(track.sample_track().is_some());
        assert_eq!(LocalTrack::vp8("cam", "local-stream").kind(), TrackKind::Video);
    }

    #[tokio::test]
    async fn test_offer_lists_transceiver_media() {
        let factory = WebRtcFactory::new().unwrap();
        let pc = factory.create(RtcConfiguration::default()).await.unwrap();
        pc.add_transceiver(TrackOrKind::Kind(TrackKind::Audio), None)
            .await
            .unwrap();

        let offer = pc.create_offer(None).await.unwrap();
        assert_eq!(offer.sdp_type, SdpType::Offer);
        assert!(offer.sdp.contains("m=audio"));

        pc.close().await.unwrap();
        assert_eq!(pc.connection_state(), PeerConnectionState::Closed);
    }
}
