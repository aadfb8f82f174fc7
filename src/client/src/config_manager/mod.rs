mod config;

pub use config::{Config, ConfigLoader, KafkaConfig, SalesforceConfig, SinkKind};
