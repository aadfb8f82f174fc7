use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_EVENT_TYPE: &str = "Monitoring_Event__e";

/// The message published to the broker for every inbound platform event.
///
/// `data` carries the inbound event untouched; `timestamp` is a copy of the
/// event's `event.createdDate` field, or `null` when that path is missing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub event_type: String,
    pub data: Value,
    pub timestamp: Option<Value>,
}

impl Envelope {
    pub fn from_inbound(event_type: impl Into<String>, data: Value) -> Self {
        let timestamp = data
            .get("event")
            .and_then(|event| event.get("createdDate"))
            .cloned();

        Envelope {
            event_type: event_type.into(),
            data,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracts_created_date() {
        let inbound = json!({
            "event": { "createdDate": "2024-01-01T00:00:00Z" },
            "Metric_Name__c": "cpu",
            "Metric_Value__c": 42.5
        });

        let envelope = Envelope::from_inbound(DEFAULT_EVENT_TYPE, inbound.clone());

        assert_eq!(envelope.event_type, "Monitoring_Event__e");
        assert_eq!(envelope.data, inbound);
        assert_eq!(envelope.timestamp, Some(json!("2024-01-01T00:00:00Z")));
    }

    #[test]
    fn test_missing_created_date_is_null() {
        let inbound = json!({ "Metric_Name__c": "cpu" });

        let envelope = Envelope::from_inbound(DEFAULT_EVENT_TYPE, inbound.clone());

        assert_eq!(envelope.data, inbound);
        assert_eq!(envelope.timestamp, None);
    }

    #[test]
    fn test_non_object_inbound_is_tolerated() {
        let envelope = Envelope::from_inbound(DEFAULT_EVENT_TYPE, json!([1, 2, 3]));
        assert_eq!(envelope.timestamp, None);
        assert_eq!(envelope.data, json!([1, 2, 3]));
    }

    #[test]
    fn test_wire_shape() {
        let inbound = json!({
            "event": { "createdDate": "2024-01-01T00:00:00Z" },
            "Metric_Name__c": "cpu",
            "Metric_Value__c": 42.5
        });

        let wire = serde_json::to_value(Envelope::from_inbound(DEFAULT_EVENT_TYPE, inbound.clone()))
            .unwrap();

        assert_eq!(
            wire,
            json!({
                "event_type": "Monitoring_Event__e",
                "data": inbound,
                "timestamp": "2024-01-01T00:00:00Z"
            })
        );
    }

    #[test]
    fn test_wire_shape_null_timestamp() {
        let wire =
            serde_json::to_value(Envelope::from_inbound(DEFAULT_EVENT_TYPE, json!({}))).unwrap();
        assert_eq!(wire["timestamp"], json!(null));
    }
}
