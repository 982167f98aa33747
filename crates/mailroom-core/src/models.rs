//! Stored email records and attachments.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::defaults::{STATUS_EXTRACTED, STATUS_SCHEDULED};
use crate::error::{Error, Result};

/// Lifecycle status of an email and marker status of its attachments.
///
/// There is no failed state: an email whose extraction did not
/// complete keeps `Scheduled` and is selected again by the next cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmailStatus {
    /// Waiting for an extraction attempt.
    #[serde(rename = "Scheduled for Extraction")]
    Scheduled,
    /// Extraction result validated and persisted.
    #[serde(rename = "Extracted")]
    Extracted,
}

impl EmailStatus {
    /// The tag stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailStatus::Scheduled => STATUS_SCHEDULED,
            EmailStatus::Extracted => STATUS_EXTRACTED,
        }
    }
}

impl fmt::Display for EmailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmailStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            STATUS_SCHEDULED => Ok(EmailStatus::Scheduled),
            STATUS_EXTRACTED => Ok(EmailStatus::Extracted),
            other => Err(Error::InvalidInput(format!("unknown email status: {other}"))),
        }
    }
}

/// Local content of an attachment that still has to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentSource {
    /// File on the local filesystem.
    Path(PathBuf),
    /// Raw bytes kept alongside the record.
    Inline(Vec<u8>),
}

/// A file attached to an email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub id: String,
    pub file_name: Option<String>,
    /// `gs://` location, set before submission or after upload.
    pub location: Option<String>,
    /// Content to upload before the attachment can be referenced.
    pub source: Option<AttachmentSource>,
    pub extraction_status: Option<String>,
}

impl Attachment {
    /// Create an attachment that already lives in blob storage.
    pub fn stored(
        id: impl Into<String>,
        file_name: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            file_name: Some(file_name.into()),
            location: Some(location.into()),
            source: None,
            extraction_status: None,
        }
    }

    /// Create an attachment whose bytes still have to be uploaded.
    pub fn pending_upload(
        id: impl Into<String>,
        file_name: impl Into<String>,
        source: AttachmentSource,
    ) -> Self {
        Self {
            id: id.into(),
            file_name: Some(file_name.into()),
            location: None,
            source: Some(source),
            extraction_status: None,
        }
    }

    /// Name used for uploads and in the batch payload.
    pub fn display_name(&self) -> String {
        match self.file_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("attachment_{}", self.id),
        }
    }
}

/// An email as stored in the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRecord {
    pub id: String,
    pub subject: String,
    pub sender_email_id: Option<String>,
    /// Legacy sender column written by older ingesters.
    pub from_address: Option<String>,
    pub body: String,
    pub status: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub files: Vec<Attachment>,
}

impl EmailRecord {
    /// Create a scheduled email with no attachments.
    pub fn new(id: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            sender_email_id: None,
            from_address: None,
            body: body.into(),
            status: STATUS_SCHEDULED.to_string(),
            updated_at: None,
            files: Vec::new(),
        }
    }

    /// Set the sender address.
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender_email_id = Some(sender.into());
        self
    }

    /// Add an attachment.
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.files.push(attachment);
        self
    }

    /// Sender address, falling back to the legacy `from` column.
    pub fn sender(&self) -> &str {
        self.sender_email_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.from_address.as_deref())
            .unwrap_or("")
    }
}
