//! Trace event wire type
//!
//! One JSON object per message: `{"method": ..., "id": ..., "args": ...}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Opaque identifier correlating every trace event of one peer connection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Generate a fresh identifier (UUID v4)
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ConnectionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A structured record of one intercepted call, outcome, state notification
/// or stats poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Method or notification name, e.g. `createOffer` or `onicecandidate`
    pub method: String,
    /// Connection the event originated from
    pub id: ConnectionId,
    /// Call options, outcome value, or notification payload
    pub args: Value,
}

impl TraceEvent {
    /// Create a trace event
    pub fn new(method: impl Into<String>, id: ConnectionId, args: Value) -> Self {
        Self {
            method: method.into(),
            id,
            args,
        }
    }

    /// Serialize to a single JSON message
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a JSON message
    pub fn from_json(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        let event = TraceEvent::new(
            "createOffer",
            ConnectionId::from("pc-1"),
            json!({"iceRestart": false}),
        );
        let wire: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(
            wire,
            json!({"method": "createOffer", "id": "pc-1", "args": {"iceRestart": false}})
        );
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = ConnectionId::generate();
        let b = ConnectionId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_rejects_event_without_method() {
        assert!(TraceEvent::from_json(r#"{"id": "pc-1", "args": null}"#).is_err());
    }
}
