//! Google Cloud Storage blob store using the JSON API.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use mailroom_core::{attachment_object_path, storage_uri, BlobStore, Error, Result};

use crate::config::GcsConfig;

/// Uploads attachments with the media upload endpoint:
/// `POST {api}/upload/storage/v1/b/{bucket}/o?uploadType=media&name={object}`.
pub struct GcsBlobStore {
    client: Client,
    config: GcsConfig,
}

impl GcsBlobStore {
    pub fn new(config: GcsConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Storage(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(GcsConfig::from_env())
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    fn token(&self) -> &str {
        self.config.access_token.as_deref().unwrap_or_default()
    }
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn upload(
        &self,
        data: &[u8],
        file_name: &str,
        email_id: &str,
        file_id: &str,
    ) -> Result<String> {
        let object = attachment_object_path(email_id, file_id, file_name);
        let url = format!(
            "{}/upload/storage/v1/b/{}/o",
            self.config.api_url, self.config.bucket
        );
        debug!(
            subsystem = "storage",
            component = "gcs",
            email_id,
            file_id,
            object = %object,
            size = data.len(),
            "Uploading attachment"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token())
            .query(&[("uploadType", "media"), ("name", object.as_str())])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| Error::Storage(format!("upload of {object} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Storage(format!(
                "upload of {object} returned HTTP {status}: {body}"
            )));
        }

        Ok(storage_uri(&self.config.bucket, &object))
    }

    /// Fetch the bucket metadata.
    async fn ping(&self) -> Result<()> {
        let url = format!("{}/storage/v1/b/{}", self.config.api_url, self.config.bucket);
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.token())
            .send()
            .await
            .map_err(|e| Error::Storage(format!("bucket check failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Storage(format!(
                "bucket {} is not accessible: HTTP {status}",
                self.config.bucket
            )));
        }
        Ok(())
    }
}
