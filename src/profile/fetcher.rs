use super::ProfileFetcher;
use crate::error::FetchError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Fetches profiles with an authenticated `GET` against a provider endpoint
#[derive(Debug, Clone)]
pub struct HttpProfileFetcher {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpProfileFetcher {
    /// Create a fetcher for the given endpoint
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid URL or the HTTP client cannot be built
    pub fn new(endpoint: &str, timeout: Duration) -> anyhow::Result<Self> {
        let endpoint = url::Url::parse(endpoint)?.to_string();
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ProfileFetcher for HttpProfileFetcher {
    async fn fetch_profile(&self, access_token: &str) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| FetchError::UpstreamUnavailable(format!("Profile request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::UpstreamUnavailable(format!(
                "Profile request failed with status: {status}"
            )));
        }

        let body = response.text().await.map_err(|e| {
            FetchError::UpstreamUnavailable(format!("Failed to read profile response: {e}"))
        })?;

        log::debug!("Received {} byte profile response", body.len());

        serde_json::from_str(&body)
            .map_err(|e| FetchError::InvalidProfile(format!("Profile is not valid JSON: {e}")))
    }
}
