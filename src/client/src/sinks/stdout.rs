use anyhow::{Context, Result};

use sfbridge_common::types::event::Envelope;

use crate::sinks::EventWriter;

/// Dry-run writer: prints each envelope as a JSON line instead of
/// publishing. Useful before the broker side of the stack is wired up.
pub struct StdoutSink {
    topic: String,
}

impl StdoutSink {
    pub fn new(topic: &str) -> Self {
        StdoutSink {
            topic: topic.to_string(),
        }
    }
}

impl EventWriter for StdoutSink {
    async fn write_event(&self, envelope: &Envelope) -> Result<()> {
        let line = serde_json::to_string(envelope).context("Envelope is not JSON-serializable")?;
        println!("[{}] {}", self.topic, line);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
