mod session;
mod streaming;

pub use session::SalesforceSession;
pub use streaming::Subscription;

use serde_json::Value;
use thiserror::Error;

/// Errors raised by the event source.
///
/// `Auth` is fatal at startup; `Transport` is fatal to the subscription loop.
/// Everything the loop can recover from is handled per event and never
/// surfaces here.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("subscription transport lost: {0}")]
    Transport(String),

    #[error("unexpected streaming response: {0}")]
    Protocol(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// A live subscription to one event channel: single consumer, arrival order,
/// indefinite length.
#[allow(async_fn_in_trait)]
pub trait EventStream {
    /// Suspends until the next event arrives. `Ok(None)` means the stream
    /// ended without a transport failure.
    async fn next_event(&mut self) -> Result<Option<Value>, SourceError>;

    /// Releases the subscription. Runs at most once per subscription; the
    /// forwarding loop guarantees it is invoked on every exit path.
    async fn close(&mut self) -> Result<(), SourceError>;
}
