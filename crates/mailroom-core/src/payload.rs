//! Wire payloads exchanged with the extraction service.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::defaults::RESPONSE_STATUS_SUCCESS;

/// Attachment reference inside a batch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub id: String,
    pub file_name: String,
    /// Must start with `gs://`.
    pub cloud_storage_url: String,
}

/// One email inside a batch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailEntry {
    pub id: String,
    pub subject: String,
    pub sender_email_id: String,
    pub body: String,
    pub has_attachments: bool,
    pub files: Vec<FileRef>,
    /// Last modification time in ISO-8601.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Batch request sent to the extraction service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractRequest {
    pub extraction_timestamp: String,
    pub total_emails: usize,
    pub emails: Vec<EmailEntry>,
}

impl ExtractRequest {
    /// Build a request stamped with the current time.
    pub fn new(emails: Vec<EmailEntry>) -> Self {
        Self {
            extraction_timestamp: Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            total_emails: emails.len(),
            emails,
        }
    }

    /// Ids of the submitted emails, in request order.
    pub fn email_ids(&self) -> Vec<String> {
        self.emails.iter().map(|e| e.id.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

/// Batch response from the extraction service.
///
/// `results` is kept as raw JSON. Every fragment is normalized and
/// validated individually before it is trusted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub results: Map<String, JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ExtractResponse {
    /// Successful response carrying the given results.
    pub fn success(results: Map<String, JsonValue>) -> Self {
        Self {
            status: RESPONSE_STATUS_SUCCESS.to_string(),
            results,
            error_message: None,
        }
    }

    /// Batch-level failure.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: crate::defaults::RESPONSE_STATUS_ERROR.to_string(),
            results: Map::new(),
            error_message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RESPONSE_STATUS_SUCCESS
    }
}
