//! In-memory collaborators for batch cycle tests.
//!
//! Each fake records the calls it receives and can be told to fail specific
//! operations so tests can assert on exactly which writes happened.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use mailroom_core::{
    Attachment, BlobStore, CalendarEvent, EmailExtraction, EmailRecord, EmailStatus, Error,
    ExtractRequest, ExtractResponse, ExtractionService, RecordStore, Result,
};

// =============================================================================
// RECORD STORE
// =============================================================================

#[derive(Default)]
struct StoreState {
    emails: BTreeMap<String, EmailRecord>,
    results: BTreeMap<String, EmailExtraction>,
    events: Vec<CalendarEvent>,
    markers: BTreeMap<(String, String), EmailStatus>,
    locations: BTreeMap<(String, String), String>,
    persist_calls: usize,
    side_effect_calls: usize,
    commit_calls: usize,
    marker_calls: usize,
}

/// Record store backed by maps, with per-operation failure injection.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    fail_persist: Mutex<HashSet<String>>,
    fail_commit: Mutex<HashSet<String>>,
    fail_markers: Mutex<bool>,
    fail_side_effects: Mutex<bool>,
    fail_ping: Mutex<bool>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_emails(emails: Vec<EmailRecord>) -> Arc<Self> {
        let store = Self::default();
        {
            let mut state = store.state.lock().unwrap();
            for email in emails {
                state.emails.insert(email.id.clone(), email);
            }
        }
        Arc::new(store)
    }

    pub fn insert(&self, email: EmailRecord) {
        self.state
            .lock()
            .unwrap()
            .emails
            .insert(email.id.clone(), email);
    }

    pub fn fail_persist_for(&self, email_id: &str) {
        self.fail_persist
            .lock()
            .unwrap()
            .insert(email_id.to_string());
    }

    pub fn clear_persist_failures(&self) {
        self.fail_persist.lock().unwrap().clear();
    }

    pub fn fail_commit_for(&self, email_id: &str) {
        self.fail_commit.lock().unwrap().insert(email_id.to_string());
    }

    pub fn fail_markers(&self) {
        *self.fail_markers.lock().unwrap() = true;
    }

    pub fn fail_side_effects(&self) {
        *self.fail_side_effects.lock().unwrap() = true;
    }

    pub fn fail_ping(&self) {
        *self.fail_ping.lock().unwrap() = true;
    }

    pub fn status_of(&self, email_id: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .emails
            .get(email_id)
            .map(|e| e.status.clone())
    }

    pub fn result_of(&self, email_id: &str) -> Option<EmailExtraction> {
        self.state.lock().unwrap().results.get(email_id).cloned()
    }

    pub fn result_count(&self) -> usize {
        self.state.lock().unwrap().results.len()
    }

    pub fn events(&self) -> Vec<CalendarEvent> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn marker_of(&self, email_id: &str, file_id: &str) -> Option<EmailStatus> {
        self.state
            .lock()
            .unwrap()
            .markers
            .get(&(email_id.to_string(), file_id.to_string()))
            .copied()
    }

    pub fn location_of(&self, email_id: &str, file_id: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .locations
            .get(&(email_id.to_string(), file_id.to_string()))
            .cloned()
    }

    pub fn persist_calls(&self) -> usize {
        self.state.lock().unwrap().persist_calls
    }

    pub fn side_effect_calls(&self) -> usize {
        self.state.lock().unwrap().side_effect_calls
    }

    pub fn commit_calls(&self) -> usize {
        self.state.lock().unwrap().commit_calls
    }

    pub fn marker_calls(&self) -> usize {
        self.state.lock().unwrap().marker_calls
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn list_pending(&self, status: EmailStatus, limit: i64) -> Result<Vec<EmailRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .emails
            .values()
            .filter(|e| e.status == status.as_str())
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn list_attachments(&self, email_id: &str) -> Result<Vec<Attachment>> {
        let state = self.state.lock().unwrap();
        state
            .emails
            .get(email_id)
            .map(|e| e.files.clone())
            .ok_or_else(|| Error::NotFound(email_id.to_string()))
    }

    async fn commit_status(&self, email_id: &str, status: EmailStatus) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.commit_calls += 1;
        if self.fail_commit.lock().unwrap().contains(email_id) {
            return Err(Error::Internal("commit refused".to_string()));
        }
        let email = state
            .emails
            .get_mut(email_id)
            .ok_or_else(|| Error::NotFound(email_id.to_string()))?;
        email.status = status.as_str().to_string();
        Ok(())
    }

    async fn persist_result(&self, email_id: &str, result: &EmailExtraction) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.persist_calls += 1;
        if self.fail_persist.lock().unwrap().contains(email_id) {
            return Err(Error::Internal("write refused".to_string()));
        }
        state.results.insert(email_id.to_string(), result.clone());
        Ok(())
    }

    async fn persist_side_effects(&self, events: &[CalendarEvent]) -> Result<usize> {
        let mut state = self.state.lock().unwrap();
        state.side_effect_calls += 1;
        if *self.fail_side_effects.lock().unwrap() {
            return Err(Error::Internal("calendar table locked".to_string()));
        }
        state.events.extend(events.iter().cloned());
        Ok(events.len())
    }

    async fn update_attachment_marker(
        &self,
        email_id: &str,
        file_id: &str,
        status: EmailStatus,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.marker_calls += 1;
        if *self.fail_markers.lock().unwrap() {
            return Err(Error::NotFound(format!("{email_id}/{file_id}")));
        }
        state
            .markers
            .insert((email_id.to_string(), file_id.to_string()), status);
        Ok(())
    }

    async fn set_attachment_location(
        &self,
        email_id: &str,
        file_id: &str,
        location: &str,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.locations.insert(
            (email_id.to_string(), file_id.to_string()),
            location.to_string(),
        );
        if let Some(file) = state
            .emails
            .get_mut(email_id)
            .and_then(|e| e.files.iter_mut().find(|f| f.id == file_id))
        {
            file.location = Some(location.to_string());
            file.source = None;
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        if *self.fail_ping.lock().unwrap() {
            return Err(Error::Internal("connection refused".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// BLOB STORE
// =============================================================================

/// Blob store that keeps uploads in memory.
#[derive(Default)]
pub struct FakeBlobStore {
    uploads: Mutex<Vec<(String, String, Vec<u8>)>>,
    fail: Mutex<bool>,
}

impl FakeBlobStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let store = Self::default();
        *store.fail.lock().unwrap() = true;
        Arc::new(store)
    }

    /// `(email_id, file_id, bytes)` for every upload, in order.
    pub fn uploads(&self) -> Vec<(String, String, Vec<u8>)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn upload(
        &self,
        data: &[u8],
        file_name: &str,
        email_id: &str,
        file_id: &str,
    ) -> Result<String> {
        if *self.fail.lock().unwrap() {
            return Err(Error::Storage("bucket unavailable".to_string()));
        }
        self.uploads.lock().unwrap().push((
            email_id.to_string(),
            file_id.to_string(),
            data.to_vec(),
        ));
        Ok(mailroom_core::storage_uri(
            "test_bucket",
            &mailroom_core::attachment_object_path(email_id, file_id, file_name),
        ))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// EXTRACTION SERVICE
// =============================================================================

enum Reply {
    Response(ExtractResponse),
    Error(String),
}

/// Extraction service returning a canned reply.
pub struct FakeService {
    reply: Mutex<Reply>,
    delay: Option<Duration>,
    healthy: bool,
    requests: Mutex<Vec<ExtractRequest>>,
}

impl FakeService {
    pub fn responding(response: ExtractResponse) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(Reply::Response(response)),
            delay: None,
            healthy: true,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Reply with the JSON body a real service would send.
    pub fn responding_json(body: JsonValue) -> Arc<Self> {
        Self::responding(serde_json::from_value(body).unwrap())
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(Reply::Error(message.to_string())),
            delay: None,
            healthy: true,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn slow(response: ExtractResponse, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(Reply::Response(response)),
            delay: Some(delay),
            healthy: true,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn unhealthy(response: ExtractResponse) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(Reply::Response(response)),
            delay: None,
            healthy: false,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn set_response(&self, response: ExtractResponse) {
        *self.reply.lock().unwrap() = Reply::Response(response);
    }

    pub fn requests(&self) -> Vec<ExtractRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExtractionService for FakeService {
    async fn extract(&self, request: &ExtractRequest) -> Result<ExtractResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &*self.reply.lock().unwrap() {
            Reply::Response(response) => Ok(response.clone()),
            Reply::Error(message) => Err(Error::Request(message.clone())),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.healthy)
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

/// A scheduled email with a sender and no attachments.
pub fn email(id: &str) -> EmailRecord {
    EmailRecord::new(id, format!("Subject {id}"), format!("Body of {id}"))
        .with_sender("sender@acme.example")
}

/// A minimal valid email result.
pub fn valid_result(summary: &str) -> JsonValue {
    serde_json::json!({
        "Summary": summary,
        "ActionItems": ["Reply"],
        "Urgency": "Medium",
        "files": {}
    })
}

/// A valid file result.
pub fn valid_file() -> JsonValue {
    serde_json::json!({
        "Type": "Invoice",
        "sender": "ACME GmbH",
        "received_date": "2025-01-15",
        "Summary": "Consulting invoice",
        "Details": "Total 1,200.00 EUR",
        "tags": ["Invoice"],
        "Urgency": "High"
    })
}

/// A valid calendar event for `email_id`.
pub fn valid_event(email_id: &str, action: &str) -> JsonValue {
    serde_json::json!({
        "date": "2025-01-30",
        "time": "09:00",
        "action": action,
        "source_mail_id": email_id,
        "source_file_id": null
    })
}

/// A success response with the given `results` object.
pub fn success(results: JsonValue) -> ExtractResponse {
    serde_json::from_value(serde_json::json!({
        "status": "success",
        "results": results
    }))
    .unwrap()
}
