//! Collaborator interfaces used by the batch engine.
//!
//! Concrete implementations live in `mailroom-db` (Postgres, filesystem) and
//! `mailroom-adapter` (HTTP). Tests substitute in-memory versions.

use async_trait::async_trait;

use crate::error::Result;
use crate::extraction::{CalendarEvent, EmailExtraction};
use crate::models::{Attachment, EmailRecord, EmailStatus};
use crate::payload::{ExtractRequest, ExtractResponse};

// =============================================================================
// RECORD STORE
// =============================================================================

/// Persistent storage for emails, their attachments and extraction output.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Emails in the given status, oldest first, with attachments loaded.
    async fn list_pending(&self, status: EmailStatus, limit: i64) -> Result<Vec<EmailRecord>>;

    /// Attachments of one email.
    async fn list_attachments(&self, email_id: &str) -> Result<Vec<Attachment>>;

    /// Move an email to `status`.
    async fn commit_status(&self, email_id: &str, status: EmailStatus) -> Result<()>;

    /// Store the extraction result of an email. Repeated calls for the same
    /// email replace the previous result.
    async fn persist_result(&self, email_id: &str, result: &EmailExtraction) -> Result<()>;

    /// Store calendar events atomically. Returns the number written.
    async fn persist_side_effects(&self, events: &[CalendarEvent]) -> Result<usize>;

    /// Set the extraction marker of one attachment.
    async fn update_attachment_marker(
        &self,
        email_id: &str,
        file_id: &str,
        status: EmailStatus,
    ) -> Result<()>;

    /// Record where an attachment was uploaded.
    async fn set_attachment_location(
        &self,
        email_id: &str,
        file_id: &str,
        location: &str,
    ) -> Result<()>;

    /// Verify the store is reachable.
    async fn ping(&self) -> Result<()>;
}

// =============================================================================
// BLOB STORE
// =============================================================================

/// Object storage for attachment contents.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload attachment bytes and return their `gs://` location.
    async fn upload(
        &self,
        data: &[u8],
        file_name: &str,
        email_id: &str,
        file_id: &str,
    ) -> Result<String>;

    /// Verify the store is reachable and writable.
    async fn ping(&self) -> Result<()>;
}

// =============================================================================
// EXTRACTION SERVICE
// =============================================================================

/// Remote service that turns a batch of emails into extraction results.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    /// Submit one batch. `Err` means the whole batch failed in transit.
    async fn extract(&self, request: &ExtractRequest) -> Result<ExtractResponse>;

    /// Check if the service is available and responding.
    async fn health_check(&self) -> Result<bool>;
}
