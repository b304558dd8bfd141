//! Per-connection record of trace events
//!
//! Stats snapshots become time series keyed `<report id>-<attribute>`; every
//! other event is appended to the update log. Storage and JSON projection
//! only, no analysis.

use crate::peer::Method;
use crate::trace::{ConnectionId, TraceEvent};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Report fields that identify a report rather than measure it
const IDENTITY_FIELDS: [&str; 3] = ["id", "type", "timestamp"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsPoint {
    pub time: DateTime<Utc>,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateEntry {
    pub time: DateTime<Utc>,
    pub method: String,
    pub args: Value,
}

/// Everything observed for one connection
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerConnectionRecord {
    id: ConnectionId,
    created: DateTime<Utc>,
    stats: BTreeMap<String, Vec<StatsPoint>>,
    update_log: Vec<UpdateEntry>,
}

impl PeerConnectionRecord {
    pub fn new(id: ConnectionId) -> Self {
        Self {
            id,
            created: Utc::now(),
            stats: BTreeMap::new(),
            update_log: Vec::new(),
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Fold an event received now
    pub fn apply(&mut self, event: &TraceEvent) {
        self.apply_at(event, Utc::now());
    }

    /// Fold an event received at `time`
    pub fn apply_at(&mut self, event: &TraceEvent, time: DateTime<Utc>) {
        if event.method != Method::GetStats.name() {
            self.update_log.push(UpdateEntry {
                time,
                method: event.method.clone(),
                args: event.args.clone(),
            });
            return;
        }

        let Value::Object(reports) = &event.args else {
            return;
        };
        for (report_id, report) in reports {
            let Value::Object(fields) = report else {
                continue;
            };
            for (attribute, value) in fields {
                if IDENTITY_FIELDS.contains(&attribute.as_str()) {
                    continue;
                }
                self.add_stats_point(report_id, attribute, time, value.clone());
            }
        }
    }

    pub fn add_stats_point(
        &mut self,
        report_id: &str,
        attribute: &str,
        time: DateTime<Utc>,
        value: Value,
    ) {
        self.stats
            .entry(format!("{}-{}", report_id, attribute))
            .or_default()
            .push(StatsPoint { time, value });
    }

    /// Points of one series, oldest first
    pub fn series(&self, key: &str) -> Option<&[StatsPoint]> {
        self.stats.get(key).map(Vec::as_slice)
    }

    pub fn series_keys(&self) -> impl Iterator<Item = &str> {
        self.stats.keys().map(String::as_str)
    }

    pub fn update_log(&self) -> &[UpdateEntry] {
        &self.update_log
    }

    pub fn to_json(&self) -> crate::Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stats_become_series() {
        let id = ConnectionId::from("pc-1");
        let mut record = PeerConnectionRecord::new(id.clone());

        for bytes in [100, 250] {
            record.apply(&TraceEvent::new(
                "getStats",
                id.clone(),
                json!({
                    "RTCTransport_0": {
                        "id": "RTCTransport_0",
                        "type": "transport",
                        "timestamp": 1.0,
                        "bytesSent": bytes,
                    }
                }),
            ));
        }

        let series = record.series("RTCTransport_0-bytesSent").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].value, json!(250));
        assert!(record.series("RTCTransport_0-type").is_none());
        assert_eq!(
            record.series_keys().collect::<Vec<_>>(),
            vec!["RTCTransport_0-bytesSent"]
        );
        assert!(record.update_log().is_empty());
    }

    #[test]
    fn test_other_events_go_to_update_log() {
        let id = ConnectionId::from("pc-2");
        let mut record = PeerConnectionRecord::new(id.clone());
        record.apply(&TraceEvent::new("createOffer", id.clone(), json!({"iceRestart": false})));
        record.apply(&TraceEvent::new("onnegotiationneeded", id, Value::Null));

        let methods: Vec<&str> = record
            .update_log()
            .iter()
            .map(|entry| entry.method.as_str())
            .collect();
        assert_eq!(methods, vec!["createOffer", "onnegotiationneeded"]);

        let projected = record.to_json().unwrap();
        assert_eq!(projected["id"], "pc-2");
        assert_eq!(projected["updateLog"][0]["args"]["iceRestart"], false);
    }
}
