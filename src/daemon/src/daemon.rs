use std::net::SocketAddr;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use sfbridge_client::config_manager::Config;
use sfbridge_client::sinks::SinkWriterEnum;
use sfbridge_client::source::SalesforceSession;
use sfbridge_client::Forwarder;

use crate::server::BridgeServer;
use crate::structs::BridgeInfo;

#[tokio::main]
pub async fn run(config: Config) -> Result<()> {
    let writer = SinkWriterEnum::from_config(&config)?;

    info!("Using {}", writer.variant_name());

    let addr: SocketAddr = config.server.parse()?;

    let info = BridgeInfo {
        channel: config.salesforce.channel.clone(),
        topic: config.kafka.topic.clone(),
        sink: writer.variant_name().to_string(),
        started_at: Utc::now(),
    };

    // Both failures here are fatal before the loop ever starts: bad
    // credentials and an unreachable or rejecting streaming endpoint.
    let session = SalesforceSession::open(&config.salesforce)
        .await
        .context("Failed to open event source session")?;

    let subscription = session
        .subscribe(&config.salesforce.channel)
        .await
        .context("Failed to subscribe to event channel")?;

    info!(
        channel = %config.salesforce.channel,
        topic = %config.kafka.topic,
        "Bridge initialized"
    );

    let forwarder = Forwarder::new(config.event_type.clone(), writer);

    BridgeServer::bind(forwarder, subscription, info, addr)
        .await?
        .run()
        .await
}
