//! Passive listeners attached at construction
//!
//! Each notification becomes one `on<name>` event, e.g. `onicecandidate`.

use crate::collab::RemoteTrackSink;
use crate::peer::{ConnectionEvent, PeerConnection, TrackInfo};
use crate::trace::{ConnectionId, TraceEmitter};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::trace;

pub(crate) fn attach(
    pc: &dyn PeerConnection,
    id: ConnectionId,
    emitter: TraceEmitter,
    track_sink: Option<Arc<dyn RemoteTrackSink>>,
) {
    pc.add_event_listener(Arc::new(move |event: &ConnectionEvent| {
        let method = format!("on{}", event.name());
        trace!(id = %id, method = %method, "Connection notification");
        emitter.emit(&method, &id, &event_args(event));

        if let (ConnectionEvent::Track { track, streams }, Some(sink)) = (event, &track_sink) {
            sink.attach(Arc::clone(track), streams);
        }
    }));
}

fn event_args(event: &ConnectionEvent) -> Value {
    match event {
        ConnectionEvent::IceCandidate(candidate) => json!(candidate),
        ConnectionEvent::AddStream(stream) | ConnectionEvent::RemoveStream(stream) => {
            json!(stream.info())
        }
        ConnectionEvent::Track { track, streams } => json!({
            "track": TrackInfo::of(track.as_ref()),
            "streams": streams,
        }),
        ConnectionEvent::SignalingStateChange(state) => json!(state),
        ConnectionEvent::IceConnectionStateChange(state) => json!(state),
        ConnectionEvent::ConnectionStateChange(state) => json!(state),
        ConnectionEvent::IceGatheringStateChange(state) => json!(state),
        ConnectionEvent::NegotiationNeeded => Value::Null,
        ConnectionEvent::DataChannel(channel) => json!({
            "label": channel.label(),
            "id": channel.id(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::{IceCandidate, SignalingState};

    #[test]
    fn test_candidate_args_use_browser_shape() {
        let args = event_args(&ConnectionEvent::IceCandidate(Some(IceCandidate {
            candidate: "candidate:0 1 UDP 1 10.0.0.2 4000 typ host".to_string(),
            sdp_mid: Some("0".to_string()),
            sdp_mline_index: Some(0),
            username_fragment: None,
        })));
        assert_eq!(args["sdpMLineIndex"], 0);
    }

    #[test]
    fn test_end_of_candidates_is_null() {
        assert_eq!(event_args(&ConnectionEvent::IceCandidate(None)), Value::Null);
        assert_eq!(
            event_args(&ConnectionEvent::SignalingStateChange(SignalingState::Stable)),
            json!("stable")
        );
    }
}
