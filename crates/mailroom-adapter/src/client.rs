//! Extraction service client.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use mailroom_core::defaults::{EXTRACT_PATH, HEALTH_PATH};
use mailroom_core::{Error, ExtractRequest, ExtractResponse, ExtractionService, Result};

use crate::config::AdapterConfig;

/// HTTP client for the batch extraction endpoint.
pub struct AdapterClient {
    client: Client,
    config: AdapterConfig,
}

impl AdapterClient {
    pub fn new(config: AdapterConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Adapter(format!("Failed to create HTTP client: {e}")))?;

        info!(
            subsystem = "adapter",
            base_url = %config.base_url,
            timeout_secs = config.timeout.as_secs(),
            "Initializing extraction service client"
        );
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(AdapterConfig::from_env())
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }
}

#[async_trait]
impl ExtractionService for AdapterClient {
    #[instrument(skip(self, request), fields(total_emails = request.total_emails))]
    async fn extract(&self, request: &ExtractRequest) -> Result<ExtractResponse> {
        let url = self.url(EXTRACT_PATH);
        let start = Instant::now();
        debug!(subsystem = "adapter", url = %url, "Submitting batch");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Request(format!(
                        "extraction request timed out after {}s",
                        self.config.timeout.as_secs()
                    ))
                } else {
                    Error::Request(format!("extraction request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                subsystem = "adapter",
                http_status = status.as_u16(),
                "Extraction service returned an error status"
            );
            return Err(Error::Adapter(format!("HTTP {status}: {body}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Request(format!("failed to read response body: {e}")))?;
        let parsed: ExtractResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Adapter(format!("unparseable response body: {e}")))?;

        info!(
            subsystem = "adapter",
            status = %parsed.status,
            result_count = parsed.results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Extraction service responded"
        );
        Ok(parsed)
    }

    async fn health_check(&self) -> Result<bool> {
        match self
            .client
            .get(self.url(HEALTH_PATH))
            .timeout(self.config.health_timeout)
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}
