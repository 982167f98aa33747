//! Environment-driven configuration for the HTTP clients.

use std::env;
use std::time::Duration;

use mailroom_core::defaults;
use mailroom_core::{Error, Result};

/// Extraction service client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    /// Base URL of the service, without trailing slash.
    pub base_url: String,
    /// Timeout of a batch submission.
    pub timeout: Duration,
    /// Timeout of the health check.
    pub health_timeout: Duration,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::ADAPTER_URL.to_string(),
            timeout: Duration::from_secs(defaults::ADAPTER_TIMEOUT_SECS),
            health_timeout: Duration::from_secs(defaults::ADAPTER_HEALTH_TIMEOUT_SECS),
        }
    }
}

impl AdapterConfig {
    /// Load from `ADAPTER_SERVICE_URL` and `ADAPTER_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var("ADAPTER_SERVICE_URL") {
            if !url.trim().is_empty() {
                config = config.with_base_url(url);
            }
        }
        if let Some(secs) = parse_secs("ADAPTER_TIMEOUT_SECS") {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    /// Reject configurations the client cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "ADAPTER_SERVICE_URL must start with http:// or https://, got: {}",
                self.base_url
            )));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("adapter timeout must be positive".to_string()));
        }
        Ok(())
    }
}

/// Google Cloud Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcsConfig {
    /// JSON API base URL. Overridden in tests.
    pub api_url: String,
    pub bucket: String,
    /// OAuth2 bearer token with write access to the bucket.
    pub access_token: Option<String>,
    pub timeout: Duration,
}

impl Default for GcsConfig {
    fn default() -> Self {
        Self {
            api_url: defaults::GCS_API_URL.to_string(),
            bucket: defaults::STORAGE_BUCKET.to_string(),
            access_token: None,
            timeout: Duration::from_secs(defaults::UPLOAD_TIMEOUT_SECS),
        }
    }
}

impl GcsConfig {
    /// Load from `STORAGE_BUCKET_NAME` and `GCS_ACCESS_TOKEN`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(bucket) = env::var("STORAGE_BUCKET_NAME") {
            if !bucket.trim().is_empty() {
                config.bucket = bucket;
            }
        }
        config.access_token = env::var("GCS_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        config
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.bucket.is_empty() {
            return Err(Error::Config("STORAGE_BUCKET_NAME cannot be empty".to_string()));
        }
        if self.access_token.is_none() {
            return Err(Error::Config(
                "GCS_ACCESS_TOKEN is required for the gcs storage backend".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_secs(var: &str) -> Option<u64> {
    env::var(var)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
}
