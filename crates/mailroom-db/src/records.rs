//! PostgreSQL implementation of the record store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use mailroom_core::{
    logging as log_fields, value_text, Attachment, AttachmentSource, CalendarEvent,
    EmailExtraction, EmailRecord, EmailStatus, Error, RecordStore, Result,
};

const ATTACHMENT_COLUMNS: &str =
    "email_id, id, file_name, cloud_storage_url, local_path, content, extraction_status";

/// PostgreSQL implementation of RecordStore.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: Pool<Postgres>,
}

impl PgRecordStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Attachments of several emails in one query, grouped by email id.
    async fn attachments_for(
        &self,
        email_ids: &[String],
    ) -> Result<HashMap<String, Vec<Attachment>>> {
        if email_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM email_files
             WHERE email_id = ANY($1)
             ORDER BY email_id, created_at, id"
        ))
        .bind(email_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut grouped: HashMap<String, Vec<Attachment>> = HashMap::new();
        for row in &rows {
            let email_id: String = row.get("email_id");
            grouped
                .entry(email_id)
                .or_default()
                .push(attachment_from_row(row));
        }
        Ok(grouped)
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn list_pending(&self, status: EmailStatus, limit: i64) -> Result<Vec<EmailRecord>> {
        let rows = sqlx::query(
            "SELECT id, subject, sender_email_id, from_address, body, status, updated_at
             FROM emails
             WHERE status = $1
             ORDER BY created_at, id
             LIMIT $2",
        )
        .bind(status.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut records: Vec<EmailRecord> = rows.iter().map(email_from_row).collect();
        let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        let mut attachments = self.attachments_for(&ids).await?;
        for record in &mut records {
            record.files = attachments.remove(&record.id).unwrap_or_default();
        }

        debug!(
            { log_fields::SUBSYSTEM } = "db",
            { log_fields::COMPONENT } = "records",
            { log_fields::OPERATION } = "list_pending",
            status = %status,
            { log_fields::RESULT_COUNT } = records.len(),
            "Loaded pending emails"
        );
        Ok(records)
    }

    async fn list_attachments(&self, email_id: &str) -> Result<Vec<Attachment>> {
        let rows = sqlx::query(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM email_files
             WHERE email_id = $1
             ORDER BY created_at, id"
        ))
        .bind(email_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(attachment_from_row).collect())
    }

    async fn commit_status(&self, email_id: &str, status: EmailStatus) -> Result<()> {
        let result = sqlx::query("UPDATE emails SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(email_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Email {email_id} not found")));
        }
        Ok(())
    }

    async fn persist_result(&self, email_id: &str, result: &EmailExtraction) -> Result<()> {
        let action_items = serde_json::to_value(&result.action_items)?;
        let files: Option<JsonValue> = match &result.files {
            Some(files) => Some(serde_json::to_value(files)?),
            None => None,
        };
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO extraction_results
                 (email_id, summary, action_items, urgency, files, extracted_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6)
             ON CONFLICT (email_id) DO UPDATE
             SET summary = EXCLUDED.summary,
                 action_items = EXCLUDED.action_items,
                 urgency = EXCLUDED.urgency,
                 files = EXCLUDED.files,
                 extracted_at = EXCLUDED.extracted_at",
        )
        .bind(email_id)
        .bind(result.summary_text())
        .bind(&action_items)
        .bind(result.urgency.as_str())
        .bind(&files)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }

    async fn persist_side_effects(&self, events: &[CalendarEvent]) -> Result<usize> {
        if events.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        for event in events {
            sqlx::query(
                "INSERT INTO calendar_events
                     (id, event_date, event_time, action, source_mail_id, source_file_id,
                      execution_details, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(Uuid::now_v7())
            .bind(value_text(&event.date))
            .bind(value_text(&event.time))
            .bind(value_text(&event.action))
            .bind(value_text(&event.source_mail_id))
            .bind(event.source_file_id.as_ref().map(value_text))
            .bind(&event.execution_details)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(events.len())
    }

    async fn update_attachment_marker(
        &self,
        email_id: &str,
        file_id: &str,
        status: EmailStatus,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE email_files SET extraction_status = $1, updated_at = $2
             WHERE email_id = $3 AND id = $4",
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(email_id)
        .bind(file_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "Attachment {file_id} of email {email_id} not found"
            )));
        }
        Ok(())
    }

    async fn set_attachment_location(
        &self,
        email_id: &str,
        file_id: &str,
        location: &str,
    ) -> Result<()> {
        // Local content is dropped once it lives in blob storage, so the next
        // cycle does not upload it again.
        let result = sqlx::query(
            "UPDATE email_files
             SET cloud_storage_url = $1, local_path = NULL, content = NULL, updated_at = $2
             WHERE email_id = $3 AND id = $4",
        )
        .bind(location)
        .bind(Utc::now())
        .bind(email_id)
        .bind(file_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "Attachment {file_id} of email {email_id} not found"
            )));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}

fn email_from_row(row: &PgRow) -> EmailRecord {
    EmailRecord {
        id: row.get("id"),
        subject: row.get("subject"),
        sender_email_id: row.get("sender_email_id"),
        from_address: row.get("from_address"),
        body: row.get("body"),
        status: row.get("status"),
        updated_at: row.get("updated_at"),
        files: Vec::new(),
    }
}

fn attachment_from_row(row: &PgRow) -> Attachment {
    let local_path: Option<String> = row.get("local_path");
    let content: Option<Vec<u8>> = row.get("content");
    let source = match (content, local_path) {
        (Some(bytes), _) => Some(AttachmentSource::Inline(bytes)),
        (None, Some(path)) if !path.is_empty() => Some(AttachmentSource::Path(path.into())),
        _ => None,
    };

    Attachment {
        id: row.get("id"),
        file_name: row.get("file_name"),
        location: row.get("cloud_storage_url"),
        source,
        extraction_status: row.get("extraction_status"),
    }
}
