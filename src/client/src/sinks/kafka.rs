use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use tracing::{debug, warn};

use sfbridge_common::types::event::Envelope;

use crate::config_manager::KafkaConfig;
use crate::sinks::EventWriter;

const ENQUEUE_TIMEOUT: Duration = Duration::from_secs(5);
const RETRY_PAUSE: Duration = Duration::from_millis(250);
const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Publishes envelopes to one topic as UTF-8 JSON.
pub struct KafkaSink {
    producer: FutureProducer,
    topic: String,
    retry_attempts: u32,
}

impl KafkaSink {
    pub fn try_new(config: &KafkaConfig, retry_attempts: u32) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", config.brokers.join(","))
            .set("message.timeout.ms", config.message_timeout_ms.to_string())
            .create()
            .context("Failed to create Kafka producer")?;

        Ok(KafkaSink {
            producer,
            topic: config.topic.clone(),
            retry_attempts,
        })
    }
}

impl EventWriter for KafkaSink {
    async fn write_event(&self, envelope: &Envelope) -> Result<()> {
        let payload =
            serde_json::to_vec(envelope).context("Envelope is not JSON-serializable")?;

        let mut attempt: u32 = 0;
        loop {
            let record = FutureRecord::<(), _>::to(&self.topic).payload(&payload);

            match self.producer.send(record, ENQUEUE_TIMEOUT).await {
                Ok(_) => {
                    debug!(topic = %self.topic, "Delivered event");
                    return Ok(());
                }
                Err((err, _)) if attempt < self.retry_attempts => {
                    attempt += 1;
                    warn!(
                        topic = %self.topic,
                        error = %err,
                        attempt,
                        "Kafka delivery failed, retrying"
                    );
                    tokio::time::sleep(RETRY_PAUSE).await;
                }
                Err((err, _)) => {
                    return Err(anyhow!(
                        "Kafka delivery to {} failed after {} attempts: {err}",
                        self.topic,
                        attempt + 1
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<()> {
        self.producer
            .flush(FLUSH_TIMEOUT)
            .context("Failed to flush Kafka producer")?;
        Ok(())
    }
}
