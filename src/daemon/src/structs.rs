use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use sfbridge_client::ForwarderCounters;

/// Static facts about the running bridge, fixed at startup.
pub struct BridgeInfo {
    pub channel: String,
    pub topic: String,
    pub sink: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
pub struct InfoResponse {
    pub channel: String,
    pub topic: String,
    pub sink: String,
    pub events_forwarded: u64,
    pub events_failed: u64,
    pub started_at: DateTime<Utc>,
    pub version: String,
}

impl InfoResponse {
    pub fn new(info: &BridgeInfo, counters: &ForwarderCounters) -> Self {
        Self {
            channel: info.channel.clone(),
            topic: info.topic.clone(),
            sink: info.sink.clone(),
            events_forwarded: counters.forwarded(),
            events_failed: counters.failed(),
            started_at: info.started_at,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn total_runtime(&self) -> TimeDelta {
        Utc::now() - self.started_at
    }

    pub fn formatted_runtime(&self) -> String {
        let duration = self.total_runtime();
        format!(
            "{}h {}m {}s",
            duration.num_hours(),
            duration.num_minutes() % 60,
            duration.num_seconds() % 60
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_response_reflects_counters() {
        let info = BridgeInfo {
            channel: "/event/Monitoring_Event__e".to_string(),
            topic: "salesforce_events".to_string(),
            sink: "KafkaSink".to_string(),
            started_at: Utc::now(),
        };
        let counters = ForwarderCounters::default();

        let response = InfoResponse::new(&info, &counters);

        assert_eq!(response.channel, "/event/Monitoring_Event__e");
        assert_eq!(response.topic, "salesforce_events");
        assert_eq!(response.events_forwarded, 0);
        assert_eq!(response.events_failed, 0);
    }

    #[test]
    fn test_info_response_round_trips_through_json() {
        let info = BridgeInfo {
            channel: "/event/Monitoring_Event__e".to_string(),
            topic: "salesforce_events".to_string(),
            sink: "StdoutSink".to_string(),
            started_at: Utc::now(),
        };
        let response = InfoResponse::new(&info, &ForwarderCounters::default());

        let rendered = serde_json::to_string(&response).unwrap();
        let parsed: InfoResponse = serde_json::from_str(&rendered).unwrap();

        assert_eq!(parsed.sink, "StdoutSink");
        assert_eq!(parsed.started_at, response.started_at);
    }
}
