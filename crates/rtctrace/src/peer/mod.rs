//! Peer connection capability surface
//!
//! The traits in this module describe the native real-time connection type
//! the tracer observes. The capability is authoritative: wrappers only watch
//! calls go by, they never change what a call returns.
//!
//! - [`PeerConnectionFactory`] - the constructor, bound under a name in a
//!   [`crate::capability::CapabilityRegistry`]
//! - [`PeerConnection`] - negotiation, media and side-channel operations
//! - [`RtpSender`], [`DataChannel`], [`MediaTrack`] - handles returned by them
//! - [`webrtc_rs`] - the webrtc-rs backed implementation

mod types;
pub mod webrtc_rs;

pub use types::{
    AnswerOptions, DataChannelInit, IceCandidate, IceConnectionState, IceGatheringState,
    IceServer, MediaStream, MediaTrack, OfferOptions, PeerConnectionState, RtcConfiguration,
    SdpType, SessionDescription, SignalingState, StreamInfo, TrackHandle, TrackInfo, TrackKind,
    TrackOrKind, TransceiverDirection, TransceiverInit,
};

use crate::trace::ConnectionId;
use crate::Result;
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

/// Stats snapshot: report id → report object
pub type StatsReport = serde_json::Map<String, serde_json::Value>;

/// Operations a capability may or may not implement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    CreateOffer,
    CreateAnswer,
    SetLocalDescription,
    SetRemoteDescription,
    AddIceCandidate,
    AddStream,
    RemoveStream,
    AddTrack,
    RemoveTrack,
    AddTransceiver,
    Close,
    CreateDataChannel,
    GetStats,
}

impl Method {
    pub const ALL: [Method; 13] = [
        Method::CreateOffer,
        Method::CreateAnswer,
        Method::SetLocalDescription,
        Method::SetRemoteDescription,
        Method::AddIceCandidate,
        Method::AddStream,
        Method::RemoveStream,
        Method::AddTrack,
        Method::RemoveTrack,
        Method::AddTransceiver,
        Method::Close,
        Method::CreateDataChannel,
        Method::GetStats,
    ];

    /// Name used for trace events
    pub fn name(&self) -> &'static str {
        match self {
            Method::CreateOffer => "createOffer",
            Method::CreateAnswer => "createAnswer",
            Method::SetLocalDescription => "setLocalDescription",
            Method::SetRemoteDescription => "setRemoteDescription",
            Method::AddIceCandidate => "addIceCandidate",
            Method::AddStream => "addStream",
            Method::RemoveStream => "removeStream",
            Method::AddTrack => "addTrack",
            Method::RemoveTrack => "removeTrack",
            Method::AddTransceiver => "addTransceiver",
            Method::Close => "close",
            Method::CreateDataChannel => "createDataChannel",
            Method::GetStats => "getStats",
        }
    }
}

/// Lifecycle and state-change notifications raised by a connection
#[derive(Clone)]
pub enum ConnectionEvent {
    /// A local candidate was gathered; `None` marks the end of gathering
    IceCandidate(Option<IceCandidate>),
    AddStream(MediaStream),
    RemoveStream(MediaStream),
    Track {
        track: TrackHandle,
        streams: Vec<String>,
    },
    SignalingStateChange(SignalingState),
    IceConnectionStateChange(IceConnectionState),
    ConnectionStateChange(PeerConnectionState),
    IceGatheringStateChange(IceGatheringState),
    NegotiationNeeded,
    DataChannel(DataChannelHandle),
}

impl ConnectionEvent {
    /// Notification name
    pub fn name(&self) -> &'static str {
        match self {
            ConnectionEvent::IceCandidate(_) => "icecandidate",
            ConnectionEvent::AddStream(_) => "addstream",
            ConnectionEvent::RemoveStream(_) => "removestream",
            ConnectionEvent::Track { .. } => "track",
            ConnectionEvent::SignalingStateChange(_) => "signalingstatechange",
            ConnectionEvent::IceConnectionStateChange(_) => "iceconnectionstatechange",
            ConnectionEvent::ConnectionStateChange(_) => "connectionstatechange",
            ConnectionEvent::IceGatheringStateChange(_) => "icegatheringstatechange",
            ConnectionEvent::NegotiationNeeded => "negotiationneeded",
            ConnectionEvent::DataChannel(_) => "datachannel",
        }
    }
}

/// Listener invoked for every notification, in registration order
pub type EventListener = Arc<dyn Fn(&ConnectionEvent) + Send + Sync>;

/// Sending half of a transceiver
#[async_trait]
pub trait RtpSender: Send + Sync {
    /// Track currently being sent, if any
    async fn track(&self) -> Option<TrackHandle>;

    /// Swap the outgoing track without renegotiation
    async fn replace_track(&self, track: Option<TrackHandle>) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

/// A data channel handle
#[async_trait]
pub trait DataChannel: Send + Sync {
    fn label(&self) -> String;

    fn id(&self) -> Option<u16>;

    async fn send_text(&self, text: &str) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

pub type DataChannelHandle = Arc<dyn DataChannel>;

/// The native real-time connection object
///
/// Legacy or partial implementations report missing operations through
/// [`PeerConnection::supports`]; the default bodies of the legacy stream
/// methods return [`crate::Error::Unsupported`].
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Whether this implementation provides `method`
    fn supports(&self, method: Method) -> bool {
        !matches!(method, Method::AddStream | Method::RemoveStream)
    }

    async fn create_offer(&self, options: Option<OfferOptions>) -> Result<SessionDescription>;

    async fn create_answer(&self, options: Option<AnswerOptions>) -> Result<SessionDescription>;

    async fn set_local_description(&self, description: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn add_stream(&self, _stream: &MediaStream) -> Result<()> {
        Err(crate::Error::Unsupported(Method::AddStream.name().to_string()))
    }

    async fn remove_stream(&self, _stream: &MediaStream) -> Result<()> {
        Err(crate::Error::Unsupported(Method::RemoveStream.name().to_string()))
    }

    async fn add_track(
        &self,
        track: TrackHandle,
        streams: &[MediaStream],
    ) -> Result<Arc<dyn RtpSender>>;

    async fn remove_track(&self, sender: &Arc<dyn RtpSender>) -> Result<()>;

    async fn add_transceiver(
        &self,
        track_or_kind: TrackOrKind,
        init: Option<TransceiverInit>,
    ) -> Result<Arc<dyn RtpSender>>;

    async fn create_data_channel(
        &self,
        label: &str,
        init: Option<DataChannelInit>,
    ) -> Result<DataChannelHandle>;

    async fn close(&self) -> Result<()>;

    async fn get_stats(&self) -> Result<StatsReport>;

    fn connection_state(&self) -> PeerConnectionState;

    /// Register a listener; listeners are never replaced, only added
    fn add_event_listener(&self, listener: EventListener);

    /// Trace identifier when this connection is traced
    fn trace_id(&self) -> Option<ConnectionId> {
        None
    }

    /// The backend connection object, for downcasting to its concrete type
    fn as_any(&self) -> &dyn Any;
}

/// Constructor of peer connections
#[async_trait]
pub trait PeerConnectionFactory: Send + Sync {
    async fn create(&self, config: RtcConfiguration) -> Result<Arc<dyn PeerConnection>>;

    /// Whether connections from this factory are already traced
    fn is_instrumented(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;
}
