use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use sfbridge_common::types::event::Envelope;

use crate::sinks::EventWriter;
use crate::source::EventStream;

/// Forwarding totals, shared with the admin server.
#[derive(Default)]
pub struct ForwarderCounters {
    forwarded: AtomicU64,
    failed: AtomicU64,
}

impl ForwarderCounters {
    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Bridges one inbound event stream to one outbound topic, 1:1, in arrival
/// order. A single flow of control; the only suspension points are waiting
/// for the next event and the publish call.
pub struct Forwarder<W: EventWriter> {
    event_type: String,
    writer: W,
    counters: Arc<ForwarderCounters>,
}

impl<W: EventWriter> Forwarder<W> {
    pub fn new(event_type: impl Into<String>, writer: W) -> Self {
        Forwarder {
            event_type: event_type.into(),
            writer,
            counters: Arc::new(ForwarderCounters::default()),
        }
    }

    pub fn counters(&self) -> Arc<ForwarderCounters> {
        self.counters.clone()
    }

    /// Drives the forwarding loop until the subscription fails, ends, or the
    /// token is cancelled. The subscription is closed exactly once on every
    /// exit path before the outcome propagates.
    pub async fn run<S: EventStream>(
        &self,
        mut subscription: S,
        cancellation_token: CancellationToken,
    ) -> Result<()> {
        let outcome = self
            .forward_events(&mut subscription, &cancellation_token)
            .await;

        if let Err(close_err) = subscription.close().await {
            warn!(error = %close_err, "Subscription did not close cleanly");
        }

        outcome
    }

    pub async fn close(&self) -> Result<()> {
        self.writer.close().await
    }

    async fn forward_events<S: EventStream>(
        &self,
        subscription: &mut S,
        cancellation_token: &CancellationToken,
    ) -> Result<()> {
        info!("Forwarding events");

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    info!("Shutdown requested, stopping forwarder");
                    return Ok(());
                }
                received = subscription.next_event() => match received {
                    Ok(Some(event)) => self.forward_one(event).await,
                    Ok(None) => {
                        info!("Event stream ended");
                        return Ok(());
                    }
                    Err(e) => {
                        return Err(e).context("subscription lost");
                    }
                }
            }
        }
    }

    /// One pass-through. Failures here are scoped to the event: logged,
    /// counted, and the loop moves on.
    async fn forward_one(&self, event: Value) {
        let envelope = Envelope::from_inbound(&self.event_type, event);

        match self.writer.write_event(&envelope).await {
            Ok(()) => {
                self.counters.forwarded.fetch_add(1, Ordering::Relaxed);
                debug!(timestamp = ?envelope.timestamp, "Forwarded event");
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    error = ?e,
                    event = %envelope.data,
                    "Failed to forward event, continuing with next"
                );
            }
        }
    }
}
