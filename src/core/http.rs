//! Thin HTTP transport shared by all operations.
//!
//! Retry lives in [`crate::core::retry`], which wraps whole logical
//! operations; this layer only sends one request and classifies the outcome.

use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use super::error::LlmError;

/// Configuration for the underlying HTTP client.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            user_agent: None,
        }
    }
}

#[derive(Debug)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Build a client with the given configuration.
    pub fn new(config: HttpConfig) -> Result<Self, LlmError> {
        let default_ua = format!("flatchat/{}", env!("CARGO_PKG_VERSION"));
        let ua = config.user_agent.as_deref().unwrap_or(&default_ua);

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(ua)
            .build()
            .map_err(|e| {
                LlmError::Configuration(format!("Failed to build reqwest client: {e}"))
            })?;

        Ok(Self { client })
    }

    /// Wrap a pre-built reqwest client. The caller owns its configuration,
    /// including any default headers.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// POST a JSON body and parse the JSON response.
    #[tracing::instrument(
        name = "http_post_json",
        skip(self, headers, body),
        fields(url = %url),
        err
    )]
    pub async fn post_json<Req, Res>(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &Req,
    ) -> Result<Res, LlmError>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let response = self.send(url, headers, body).await?;
        let status = response.status();
        debug!(status = %status, "HTTP request successful");

        let response_text = response.text().await.map_err(|e| LlmError::Parse {
            message: "Failed to read response body".to_string(),
            source: Box::new(e),
        })?;

        serde_json::from_str(&response_text).map_err(|e| LlmError::Parse {
            message: "Failed to parse API response".to_string(),
            source: Box::new(e),
        })
    }

    /// POST a JSON body and hand back the raw response for incremental
    /// consumption (SSE streaming). The status is checked before returning.
    #[tracing::instrument(
        name = "http_post_stream",
        skip(self, headers, body),
        fields(url = %url),
        err
    )]
    pub async fn post_stream<Req>(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &Req,
    ) -> Result<reqwest::Response, LlmError>
    where
        Req: Serialize,
    {
        self.send(url, headers, body).await
    }

    async fn send<Req: Serialize>(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &Req,
    ) -> Result<reqwest::Response, LlmError> {
        let mut request = self.client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|e| LlmError::Network {
            message: format!("Request to {url} failed"),
            source: Box::new(e),
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::Api {
                message: format!("API returned error status {status}: {error_text}"),
                status_code: Some(status.as_u16()),
            });
        }

        Ok(response)
    }
}
