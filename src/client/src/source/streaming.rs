use std::collections::VecDeque;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::source::{EventStream, SourceError};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);
// The server holds /meta/connect open for up to 110s; leave headroom.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(120);

/// A long-polling subscription to one event channel.
///
/// Events are yielded one at a time in arrival order. The subscription is
/// closed at most once; `close` flips the guard before any network call so a
/// failing disconnect is never retried.
pub struct Subscription {
    http: Client,
    cometd_url: String,
    authorization: String,
    client_id: String,
    channel: String,
    pending: VecDeque<Value>,
    // A fatal connect outcome is held back until already-delivered events
    // have been consumed, so arrival order survives the failure.
    pending_error: Option<SourceError>,
    closed: bool,
}

impl Subscription {
    pub(crate) async fn open(
        http: Client,
        endpoint: &str,
        api_version: &str,
        session_id: &str,
        channel: &str,
    ) -> Result<Subscription, SourceError> {
        let cometd_url = format!("{}/cometd/{}", endpoint.trim_end_matches('/'), api_version);
        let authorization = format!("Bearer {session_id}");

        let mut subscription = Subscription {
            http,
            cometd_url,
            authorization,
            client_id: String::new(),
            channel: channel.to_string(),
            pending: VecDeque::new(),
            pending_error: None,
            closed: false,
        };

        subscription.handshake().await?;
        subscription.subscribe().await?;

        info!(channel = %channel, "Subscribed to event channel");

        Ok(subscription)
    }

    async fn handshake(&mut self) -> Result<(), SourceError> {
        let body = json!([{
            "channel": "/meta/handshake",
            "version": "1.0",
            "minimumVersion": "1.0",
            "supportedConnectionTypes": ["long-polling"]
        }]);

        let messages = self.post_messages(&body, HANDSHAKE_TIMEOUT).await?;
        let reply = find_meta(&messages, "/meta/handshake")
            .ok_or_else(|| SourceError::Protocol("no handshake reply".to_string()))?;

        if !is_successful(reply) {
            return Err(SourceError::Protocol(format!(
                "handshake rejected: {}",
                error_text(reply)
            )));
        }

        self.client_id = reply
            .get("clientId")
            .and_then(Value::as_str)
            .ok_or_else(|| SourceError::Protocol("handshake reply missing clientId".to_string()))?
            .to_string();

        debug!(client_id = %self.client_id, "Handshake complete");
        Ok(())
    }

    async fn subscribe(&mut self) -> Result<(), SourceError> {
        let body = json!([{
            "channel": "/meta/subscribe",
            "clientId": self.client_id,
            "subscription": self.channel
        }]);

        let messages = self.post_messages(&body, HANDSHAKE_TIMEOUT).await?;
        let reply = find_meta(&messages, "/meta/subscribe")
            .ok_or_else(|| SourceError::Protocol("no subscribe reply".to_string()))?;

        if !is_successful(reply) {
            return Err(SourceError::Protocol(format!(
                "subscribe to {} rejected: {}",
                self.channel,
                error_text(reply)
            )));
        }

        Ok(())
    }

    async fn poll_connect(&mut self) -> Result<(), SourceError> {
        let body = json!([{
            "channel": "/meta/connect",
            "clientId": self.client_id,
            "connectionType": "long-polling"
        }]);

        let messages = self.post_messages(&body, CONNECT_TIMEOUT).await?;
        drain_connect_messages(messages, &self.channel, &mut self.pending)
    }

    async fn post_messages(
        &self,
        body: &Value,
        timeout: Duration,
    ) -> Result<Vec<Value>, SourceError> {
        let response = self
            .http
            .post(&self.cometd_url)
            .header(AUTHORIZATION, &self.authorization)
            .timeout(timeout)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SourceError::Auth(format!("streaming endpoint: {status}")));
        }
        if !status.is_success() {
            return Err(SourceError::Transport(format!(
                "streaming endpoint returned {status}"
            )));
        }

        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| SourceError::Protocol(format!("malformed bayeux response: {e}")))
    }
}

impl EventStream for Subscription {
    async fn next_event(&mut self) -> Result<Option<Value>, SourceError> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            if let Some(err) = self.pending_error.take() {
                return Err(err);
            }
            if self.closed {
                return Ok(None);
            }
            if let Err(err) = self.poll_connect().await {
                self.pending_error = Some(err);
            }
        }
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let body = json!([{
            "channel": "/meta/disconnect",
            "clientId": self.client_id
        }]);

        match self.post_messages(&body, HANDSHAKE_TIMEOUT).await {
            Ok(_) => {
                info!(channel = %self.channel, "Subscription closed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Disconnect request failed");
                Err(e)
            }
        }
    }
}

/// Queues delivered events and inspects the `/meta/connect` reply. The server
/// signals an unrecoverable connection through `successful: false` plus a
/// reconnect advice other than `retry`; recovery is an operator concern, so
/// both cases surface as transport errors.
fn drain_connect_messages(
    messages: Vec<Value>,
    channel: &str,
    pending: &mut VecDeque<Value>,
) -> Result<(), SourceError> {
    let mut outcome = Ok(());

    for message in messages {
        match message.get("channel").and_then(Value::as_str) {
            Some("/meta/connect") => {
                if !is_successful(&message) {
                    let advice = message
                        .get("advice")
                        .and_then(|a| a.get("reconnect"))
                        .and_then(Value::as_str)
                        .unwrap_or("none");
                    if advice != "retry" {
                        outcome = Err(SourceError::Transport(format!(
                            "connect failed ({}), server advice: {advice}",
                            error_text(&message)
                        )));
                    }
                }
            }
            Some(ch) if ch == channel => {
                if let Some(data) = message.get("data") {
                    pending.push_back(data.clone());
                }
            }
            _ => debug!(?message, "Ignoring unrelated bayeux message"),
        }
    }

    outcome
}

fn find_meta<'a>(messages: &'a [Value], channel: &str) -> Option<&'a Value> {
    messages
        .iter()
        .find(|m| m.get("channel").and_then(Value::as_str) == Some(channel))
}

fn is_successful(message: &Value) -> bool {
    message
        .get("successful")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn error_text(message: &Value) -> String {
    message
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("no error detail")
        .to_string()
}
