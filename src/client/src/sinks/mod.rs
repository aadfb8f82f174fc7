mod kafka;
mod stdout;

pub use kafka::KafkaSink;
pub use stdout::StdoutSink;

use anyhow::Result;
use sfbridge_common::types::event::Envelope;

use crate::config_manager::{Config, SinkKind};

#[allow(async_fn_in_trait)]
pub trait EventWriter {
    async fn write_event(&self, envelope: &Envelope) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

pub enum SinkWriterEnum {
    Kafka(KafkaSink),
    Stdout(StdoutSink),
}

impl SinkWriterEnum {
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.sink {
            SinkKind::Kafka => Ok(SinkWriterEnum::Kafka(KafkaSink::try_new(
                &config.kafka,
                config.publish_retry_attempts,
            )?)),
            SinkKind::Stdout => Ok(SinkWriterEnum::Stdout(StdoutSink::new(&config.kafka.topic))),
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            SinkWriterEnum::Kafka(_) => "KafkaSink",
            SinkWriterEnum::Stdout(_) => "StdoutSink",
        }
    }
}

impl EventWriter for SinkWriterEnum {
    async fn write_event(&self, envelope: &Envelope) -> Result<()> {
        match self {
            SinkWriterEnum::Kafka(sink) => sink.write_event(envelope).await,
            SinkWriterEnum::Stdout(sink) => sink.write_event(envelope).await,
        }
    }

    async fn close(&self) -> Result<()> {
        match self {
            SinkWriterEnum::Kafka(sink) => sink.close().await,
            SinkWriterEnum::Stdout(sink) => sink.close().await,
        }
    }
}
