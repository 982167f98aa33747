//! Reconciliation events and the observers that receive them.
//!
//! The engine, the status resolver and the side-effect collector report
//! every decision through a [`ReconcileObserver`] handed to them at
//! construction. Production uses [`TracingObserver`]; tests use
//! [`RecordingObserver`] to assert on decisions without parsing logs.

use std::sync::Mutex;

use tracing::{debug, error, info, warn};

use mailroom_core::logging as log_fields;

/// A decision taken while reconciling one batch.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileEvent {
    /// The service failed the whole batch.
    BatchRejected {
        status: String,
        message: Option<String>,
        submitted: usize,
    },
    /// A fragment's envelope was resolved.
    ShapeResolved {
        email_id: String,
        strategy: Option<&'static str>,
    },
    /// A result failed validation.
    RecordRejected {
        email_id: String,
        violations: Vec<String>,
    },
    /// A valid result could not be stored.
    RecordPersistFailed { email_id: String, error: String },
    /// A result was validated and stored.
    RecordReconciled { email_id: String, file_count: usize },
    /// An attachment marker could not be written. The email still counts
    /// as reconciled.
    MarkerUpdateFailed {
        email_id: String,
        file_id: String,
        error: String,
    },
    /// A submitted email has no entry in `results`.
    MissingResult { email_id: String },
    /// `results` holds an entry for an email that was not submitted.
    UnexpectedResult { email_id: String },
    /// A calendar event failed validation.
    EventRejected {
        index: usize,
        violations: Vec<String>,
    },
    /// The calendar entry is not a list.
    SideEffectsMalformed { found: &'static str },
    SideEffectsPersisted { count: usize },
    SideEffectsFailed { count: usize, error: String },
    StatusCommitted { email_id: String },
    StatusCommitFailed { email_id: String, error: String },
    /// An email keeps its pending status for the next cycle.
    LeftForRetry { email_id: String },
}

/// Receives reconciliation events. Implementations must not block.
pub trait ReconcileObserver: Send + Sync {
    fn observe(&self, event: &ReconcileEvent);
}

/// Discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ReconcileObserver for NullObserver {
    fn observe(&self, _event: &ReconcileEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ReconcileEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events seen so far.
    pub fn events(&self) -> Vec<ReconcileEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of recorded events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&ReconcileEvent) -> bool) -> usize {
        self.events().iter().filter(|e| predicate(e)).count()
    }
}

impl ReconcileObserver for RecordingObserver {
    fn observe(&self, event: &ReconcileEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

/// Writes events as structured `tracing` records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ReconcileObserver for TracingObserver {
    fn observe(&self, event: &ReconcileEvent) {
        match event {
            ReconcileEvent::BatchRejected {
                status,
                message,
                submitted,
            } => error!(
                { log_fields::SUBSYSTEM } = "batch",
                { log_fields::COMPONENT } = "reconcile",
                status = %status,
                { log_fields::ERROR_MSG } = message.as_deref().unwrap_or("none"),
                { log_fields::FAILED } = submitted,
                "Extraction service rejected the batch"
            ),
            ReconcileEvent::ShapeResolved { email_id, strategy } => debug!(
                { log_fields::COMPONENT } = "normalizer",
                { log_fields::EMAIL_ID } = %email_id,
                { log_fields::STRATEGY } = strategy.unwrap_or("unrecognized"),
                "Resolved result envelope"
            ),
            ReconcileEvent::RecordRejected {
                email_id,
                violations,
            } => warn!(
                { log_fields::COMPONENT } = "reconcile",
                { log_fields::EMAIL_ID } = %email_id,
                violations = %violations.join("; "),
                "Result failed validation, email left for retry"
            ),
            ReconcileEvent::RecordPersistFailed { email_id, error } => warn!(
                { log_fields::COMPONENT } = "reconcile",
                { log_fields::EMAIL_ID } = %email_id,
                { log_fields::ERROR_MSG } = %error,
                "Failed to store result, email left for retry"
            ),
            ReconcileEvent::RecordReconciled {
                email_id,
                file_count,
            } => info!(
                { log_fields::COMPONENT } = "reconcile",
                { log_fields::EMAIL_ID } = %email_id,
                { log_fields::RESULT_COUNT } = file_count,
                "Stored extraction result"
            ),
            ReconcileEvent::MarkerUpdateFailed {
                email_id,
                file_id,
                error,
            } => warn!(
                { log_fields::COMPONENT } = "reconcile",
                { log_fields::EMAIL_ID } = %email_id,
                { log_fields::FILE_ID } = %file_id,
                { log_fields::ERROR_MSG } = %error,
                "Failed to mark attachment as extracted"
            ),
            ReconcileEvent::MissingResult { email_id } => warn!(
                { log_fields::COMPONENT } = "reconcile",
                { log_fields::EMAIL_ID } = %email_id,
                "No result returned for submitted email"
            ),
            ReconcileEvent::UnexpectedResult { email_id } => warn!(
                { log_fields::COMPONENT } = "reconcile",
                { log_fields::EMAIL_ID } = %email_id,
                "Ignoring result for an email that was not submitted"
            ),
            ReconcileEvent::EventRejected { index, violations } => warn!(
                { log_fields::COMPONENT } = "side_effects",
                index,
                violations = %violations.join("; "),
                "Discarding invalid calendar event"
            ),
            ReconcileEvent::SideEffectsMalformed { found } => warn!(
                { log_fields::COMPONENT } = "side_effects",
                found,
                "Calendar events are not a list"
            ),
            ReconcileEvent::SideEffectsPersisted { count } => info!(
                { log_fields::COMPONENT } = "side_effects",
                { log_fields::RESULT_COUNT } = count,
                "Stored calendar events"
            ),
            ReconcileEvent::SideEffectsFailed { count, error } => warn!(
                { log_fields::COMPONENT } = "side_effects",
                { log_fields::RESULT_COUNT } = count,
                { log_fields::ERROR_MSG } = %error,
                "Failed to store calendar events"
            ),
            ReconcileEvent::StatusCommitted { email_id } => debug!(
                { log_fields::COMPONENT } = "status",
                { log_fields::EMAIL_ID } = %email_id,
                "Committed Extracted status"
            ),
            ReconcileEvent::StatusCommitFailed { email_id, error } => warn!(
                { log_fields::COMPONENT } = "status",
                { log_fields::EMAIL_ID } = %email_id,
                { log_fields::ERROR_MSG } = %error,
                "Failed to commit status, email left for retry"
            ),
            ReconcileEvent::LeftForRetry { email_id } => info!(
                { log_fields::COMPONENT } = "status",
                { log_fields::EMAIL_ID } = %email_id,
                "Email stays scheduled for the next cycle"
            ),
        }
    }
}
