use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config_manager::SalesforceConfig;
use crate::source::streaming::Subscription;
use crate::source::SourceError;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    instance_url: String,
}

/// An authenticated session against the event source.
///
/// Holds the two opaque tokens the streaming endpoint needs: the session
/// identifier (OAuth access token) and the endpoint address (instance URL).
/// Neither is interpreted beyond being passed through to the subscription.
pub struct SalesforceSession {
    http: Client,
    session_id: String,
    endpoint: String,
    api_version: String,
}

impl SalesforceSession {
    /// Opens a session with the OAuth username-password flow. Rejected
    /// credentials are fatal; callers are expected to exit.
    pub async fn open(config: &SalesforceConfig) -> Result<SalesforceSession, SourceError> {
        let http = Client::new();

        // Salesforce expects the security token appended to the password.
        let mut password = config.password.clone();
        if let Some(token) = config.security_token.as_deref() {
            password.push_str(token);
        }

        let token_url = format!(
            "{}/services/oauth2/token",
            config.login_url.trim_end_matches('/')
        );

        let params = [
            ("grant_type", "password"),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("username", config.username.as_str()),
            ("password", password.as_str()),
        ];

        debug!(url = %token_url, username = %config.username, "Requesting access token");

        let response = http.post(&token_url).form(&params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Auth(format!("{status}: {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Protocol(format!("malformed token response: {e}")))?;

        info!(instance = %token.instance_url, "Session established");

        Ok(SalesforceSession {
            http,
            session_id: token.access_token,
            endpoint: token.instance_url,
            api_version: config.api_version.clone(),
        })
    }

    /// Opens a subscription to one named event channel.
    pub async fn subscribe(&self, channel: &str) -> Result<Subscription, SourceError> {
        Subscription::open(
            self.http.clone(),
            &self.endpoint,
            &self.api_version,
            &self.session_id,
            channel,
        )
        .await
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
