use anyhow::Result;

use crate::structs::InfoResponse;

/// HTTP client for the daemon's admin endpoints, used by the CLI.
pub struct DaemonClient {
    base_uri: String,
    pub client: reqwest::Client,
}

impl DaemonClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_uri: base_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn get_url(&self, path: &str) -> String {
        format!("{}{}", self.base_uri, path)
    }

    pub async fn send_info_request(&self) -> Result<InfoResponse> {
        let data: InfoResponse = self
            .client
            .get(self.get_url("/info"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(data)
    }

    pub async fn send_terminate_request(&self) -> Result<()> {
        self.client
            .post(self.get_url("/terminate"))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
