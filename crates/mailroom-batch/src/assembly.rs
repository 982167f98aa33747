//! Builds the batch request from pending emails.

use std::sync::Arc;

use tracing::{debug, info, warn};

use mailroom_core::schema::validate_email_entry;
use mailroom_core::{
    Attachment, AttachmentSource, BlobStore, EmailEntry, EmailRecord, ExtractRequest, FileRef,
    RecordStore, Result,
};

/// An email left out of the batch because its entry was invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub id: String,
    pub violations: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AssembledBatch {
    pub request: ExtractRequest,
    /// Emails that stay pending without being submitted.
    pub skipped: Vec<SkippedRecord>,
    /// Attachments uploaded during assembly.
    pub uploaded: usize,
    /// Uploads that failed.
    pub upload_failures: usize,
}

/// Uploads local attachment content and turns records into request entries.
pub struct BatchAssembler {
    store: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
}

impl BatchAssembler {
    pub fn new(store: Arc<dyn RecordStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    pub async fn assemble(&self, records: &[EmailRecord]) -> AssembledBatch {
        let mut entries = Vec::with_capacity(records.len());
        let mut skipped = Vec::new();
        let mut uploaded = 0;
        let mut upload_failures = 0;

        for record in records {
            let mut files = Vec::with_capacity(record.files.len());
            for attachment in &record.files {
                let (file, outcome) = self.resolve_attachment(record, attachment).await;
                match outcome {
                    Some(true) => uploaded += 1,
                    Some(false) => upload_failures += 1,
                    None => {}
                }
                files.push(file);
            }

            let entry = EmailEntry {
                id: record.id.clone(),
                subject: record.subject.clone(),
                sender_email_id: record.sender().to_string(),
                body: record.body.clone(),
                has_attachments: !files.is_empty(),
                files,
                updated_at: record.updated_at.map(|t| t.to_rfc3339()),
            };

            let violations = match serde_json::to_value(&entry) {
                Ok(value) => validate_email_entry(&value),
                Err(e) => vec![e.to_string()],
            };
            if violations.is_empty() {
                entries.push(entry);
            } else {
                warn!(
                    subsystem = "batch",
                    component = "assembly",
                    email_id = %record.id,
                    violations = %violations.join("; "),
                    "Email left out of the batch"
                );
                skipped.push(SkippedRecord {
                    id: record.id.clone(),
                    violations,
                });
            }
        }

        let request = ExtractRequest::new(entries);
        info!(
            subsystem = "batch",
            component = "assembly",
            total_emails = request.total_emails,
            skipped = skipped.len(),
            uploaded,
            upload_failures,
            "Assembled batch"
        );
        AssembledBatch {
            request,
            skipped,
            uploaded,
            upload_failures,
        }
    }

    /// Reference for one attachment, uploading local content first.
    /// The second value is `Some(success)` when an upload was attempted.
    async fn resolve_attachment(
        &self,
        record: &EmailRecord,
        attachment: &Attachment,
    ) -> (FileRef, Option<bool>) {
        let file_name = attachment.display_name();
        let mut location = attachment.location.clone();
        let mut outcome = None;

        if let Some(source) = &attachment.source {
            match self.upload(record, attachment, source, &file_name).await {
                Ok(uri) => {
                    if let Err(e) = self
                        .store
                        .set_attachment_location(&record.id, &attachment.id, &uri)
                        .await
                    {
                        warn!(
                            component = "assembly",
                            email_id = %record.id,
                            file_id = %attachment.id,
                            error = %e,
                            "Failed to record attachment location"
                        );
                    }
                    location = Some(uri);
                    outcome = Some(true);
                }
                Err(e) => {
                    warn!(
                        component = "assembly",
                        email_id = %record.id,
                        file_id = %attachment.id,
                        error = %e,
                        fallback = location.as_deref().unwrap_or("none"),
                        "Attachment upload failed"
                    );
                    outcome = Some(false);
                }
            }
        }

        let file = FileRef {
            id: attachment.id.clone(),
            file_name,
            cloud_storage_url: location.unwrap_or_default(),
        };
        (file, outcome)
    }

    async fn upload(
        &self,
        record: &EmailRecord,
        attachment: &Attachment,
        source: &AttachmentSource,
        file_name: &str,
    ) -> Result<String> {
        let data = match source {
            AttachmentSource::Inline(bytes) => bytes.clone(),
            AttachmentSource::Path(path) => tokio::fs::read(path).await?,
        };
        debug!(
            component = "assembly",
            email_id = %record.id,
            file_id = %attachment.id,
            size = data.len(),
            "Uploading attachment"
        );
        self.blobs
            .upload(&data, file_name, &record.id, &attachment.id)
            .await
    }
}
