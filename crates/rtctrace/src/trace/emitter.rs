//! Trace emitter and event sinks

use super::event::{ConnectionId, TraceEvent};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Destination for trace events
///
/// `send` must never block and never fail towards the caller; buffering and
/// transport errors stay inside the sink.
pub trait EventSink: Send + Sync {
    /// Accept one event
    fn send(&self, event: TraceEvent);
}

/// Formats `(method, id, args)` triples into trace events
#[derive(Clone)]
pub struct TraceEmitter {
    sink: Arc<dyn EventSink>,
}

impl TraceEmitter {
    /// Create an emitter forwarding to `sink`
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Build a trace event and hand it to the sink
    pub fn emit<A>(&self, method: &str, id: &ConnectionId, args: &A)
    where
        A: Serialize + ?Sized,
    {
        let args = to_trace_value(method, args);
        self.sink.send(TraceEvent::new(method, id.clone(), args));
    }

    /// Emit an event that carries no payload
    pub fn emit_empty(&self, method: &str, id: &ConnectionId) {
        self.sink
            .send(TraceEvent::new(method, id.clone(), Value::Null));
    }
}

/// Convert `args` to JSON, degrading to a descriptive string when the value
/// cannot be represented
pub fn to_trace_value<A>(method: &str, args: &A) -> Value
where
    A: Serialize + ?Sized,
{
    match serde_json::to_value(args) {
        Ok(value) => value,
        Err(e) => {
            warn!(method, error = %e, "Trace payload not serializable, coercing to string");
            Value::String(format!("[unserializable: {}]", e))
        }
    }
}

/// In-memory sink that records every event in arrival order
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<TraceEvent>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events received so far
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().clone()
    }

    /// Events for a single connection, in arrival order
    pub fn events_for(&self, id: &ConnectionId) -> Vec<TraceEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| &e.id == id)
            .cloned()
            .collect()
    }

    /// Method names received so far, in arrival order
    pub fn methods(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.method.clone()).collect()
    }

    /// Drain all recorded events
    pub fn take(&self) -> Vec<TraceEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether no events have been recorded
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for MemorySink {
    fn send(&self, event: TraceEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_emit_forwards_formatted_event() {
        let sink = Arc::new(MemorySink::new());
        let emitter = TraceEmitter::new(sink.clone());
        let id = ConnectionId::from("pc-7");

        emitter.emit("setLocalDescription", &id, &json!({"type": "offer", "sdp": "v=0"}));
        emitter.emit_empty("onnegotiationneeded", &id);

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].method, "setLocalDescription");
        assert_eq!(events[0].args["type"], "offer");
        assert_eq!(events[1].args, Value::Null);
    }

    #[test]
    fn test_unserializable_args_are_coerced() {
        let sink = Arc::new(MemorySink::new());
        let emitter = TraceEmitter::new(sink.clone());

        // Non-string map keys have no JSON representation
        let mut weird: HashMap<(u8, u8), u8> = HashMap::new();
        weird.insert((1, 2), 3);
        emitter.emit("getStats", &ConnectionId::from("pc-1"), &weird);

        let events = sink.take();
        assert_eq!(events.len(), 1);
        let text = events[0].args.as_str().unwrap();
        assert!(text.starts_with("[unserializable:"));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_events_for_filters_by_connection() {
        let sink = MemorySink::new();
        sink.send(TraceEvent::new("close", ConnectionId::from("a"), Value::Null));
        sink.send(TraceEvent::new("close", ConnectionId::from("b"), Value::Null));
        assert_eq!(sink.events_for(&ConnectionId::from("b")).len(), 1);
        assert_eq!(sink.methods(), vec!["close", "close"]);
    }
}
