//! Turns one service response into per-email outcomes.
//!
//! Each submitted email is reconciled on its own: normalize the fragment,
//! validate it, store it, then mark its attachments. Any failure puts the
//! email into the failed set without touching the others. Calendar events
//! are handled concurrently by the [`SideEffectCollector`] and reported on
//! a separate channel.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use mailroom_core::defaults::{BATCH_MAX_CONCURRENT, CALENDAR_RESULTS_KEY};
use mailroom_core::schema::validate_email_result;
use mailroom_core::{EmailExtraction, EmailStatus, ExtractResponse, RecordStore};

use crate::normalizer::Normalizer;
use crate::observer::{ReconcileEvent, ReconcileObserver};
use crate::side_effects::{SideEffectCollector, SideEffectOutcome};

/// Why an email did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The response had no entry for the email.
    NoResult,
    /// The result failed validation.
    Invalid(Vec<String>),
    /// The result was valid but could not be stored.
    Persist(String),
    /// The service failed the whole batch.
    BatchRejected(String),
    /// The batch never got a response.
    Transport(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NoResult => f.write_str("no result returned"),
            FailureReason::Invalid(violations) => {
                write!(f, "invalid result: {}", violations.join("; "))
            }
            FailureReason::Persist(e) => write!(f, "persist failed: {e}"),
            FailureReason::BatchRejected(e) => write!(f, "batch rejected: {e}"),
            FailureReason::Transport(e) => write!(f, "submission failed: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRecord {
    pub id: String,
    pub reason: FailureReason,
}

/// Primary outcome of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// True when at least one email succeeded.
    pub any_succeeded: bool,
    /// Emails whose result was validated and stored, in submission order.
    pub succeeded: Vec<String>,
    pub failed: Vec<FailedRecord>,
    /// Result keys that did not match a submitted email.
    pub ignored: Vec<String>,
}

impl ReconcileOutcome {
    /// Every submitted email failed for the same reason.
    pub fn all_failed(submitted: &[String], reason: FailureReason) -> Self {
        Self {
            any_succeeded: false,
            succeeded: Vec::new(),
            failed: submitted
                .iter()
                .map(|id| FailedRecord {
                    id: id.clone(),
                    reason: reason.clone(),
                })
                .collect(),
            ignored: Vec::new(),
        }
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.id.as_str()).collect()
    }
}

/// Both result channels of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub primary: ReconcileOutcome,
    pub side_effects: SideEffectOutcome,
}

enum RecordResult {
    Succeeded(String),
    Failed(FailedRecord),
}

/// Reconciles service responses against the record store.
pub struct ReconciliationEngine {
    store: Arc<dyn RecordStore>,
    observer: Arc<dyn ReconcileObserver>,
    normalizer: Normalizer,
    side_effects: SideEffectCollector,
    max_concurrent: usize,
}

impl ReconciliationEngine {
    pub fn new(store: Arc<dyn RecordStore>, observer: Arc<dyn ReconcileObserver>) -> Self {
        Self {
            side_effects: SideEffectCollector::new(store.clone(), observer.clone()),
            store,
            observer,
            normalizer: Normalizer::standard(),
            max_concurrent: BATCH_MAX_CONCURRENT,
        }
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Maximum emails reconciled at the same time. At least 1.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    /// Reconcile `response` for the emails in `submitted`.
    ///
    /// A rejected batch fails every submitted email and makes no store
    /// calls. Otherwise each email is reconciled independently and the
    /// calendar events are stored concurrently.
    pub async fn reconcile(
        &self,
        response: &ExtractResponse,
        submitted: &[String],
    ) -> Reconciliation {
        if !response.is_success() {
            let message = response
                .error_message
                .clone()
                .unwrap_or_else(|| format!("status {:?}", response.status));
            self.observer.observe(&ReconcileEvent::BatchRejected {
                status: response.status.clone(),
                message: response.error_message.clone(),
                submitted: submitted.len(),
            });
            return Reconciliation {
                primary: ReconcileOutcome::all_failed(
                    submitted,
                    FailureReason::BatchRejected(message),
                ),
                side_effects: SideEffectOutcome::default(),
            };
        }

        let mut seen = HashSet::with_capacity(submitted.len());
        let mut missing = Vec::new();
        let mut work = Vec::with_capacity(submitted.len());
        for id in submitted {
            if !seen.insert(id.as_str()) {
                continue;
            }
            match response.results.get(id) {
                Some(fragment) => work.push((id.as_str(), fragment)),
                None => {
                    self.observer.observe(&ReconcileEvent::MissingResult {
                        email_id: id.clone(),
                    });
                    missing.push(FailedRecord {
                        id: id.clone(),
                        reason: FailureReason::NoResult,
                    });
                }
            }
        }

        let ignored: Vec<String> = response
            .results
            .keys()
            .filter(|key| key.as_str() != CALENDAR_RESULTS_KEY && !seen.contains(key.as_str()))
            .cloned()
            .collect();
        for key in &ignored {
            self.observer.observe(&ReconcileEvent::UnexpectedResult {
                email_id: key.clone(),
            });
        }

        let records = stream::iter(work)
            .map(|(id, fragment)| self.reconcile_record(id, fragment))
            .buffered(self.max_concurrent)
            .collect::<Vec<_>>();
        let events = self
            .side_effects
            .collect(response.results.get(CALENDAR_RESULTS_KEY));
        let (records, side_effects) = futures::join!(records, events);

        let mut primary = ReconcileOutcome {
            ignored,
            ..ReconcileOutcome::default()
        };
        for record in records {
            match record {
                RecordResult::Succeeded(id) => primary.succeeded.push(id),
                RecordResult::Failed(failed) => primary.failed.push(failed),
            }
        }
        primary.failed.extend(missing);
        primary.any_succeeded = !primary.succeeded.is_empty();

        Reconciliation {
            primary,
            side_effects,
        }
    }

    async fn reconcile_record(&self, email_id: &str, fragment: &JsonValue) -> RecordResult {
        let normalized = self.normalizer.normalize(fragment);
        self.observer.observe(&ReconcileEvent::ShapeResolved {
            email_id: email_id.to_string(),
            strategy: normalized.resolution.strategy(),
        });

        let mut violations = validate_email_result(normalized.payload);
        let result = if violations.is_empty() {
            match EmailExtraction::deserialize(normalized.payload) {
                Ok(result) => Some(result),
                Err(e) => {
                    violations.push(e.to_string());
                    None
                }
            }
        } else {
            None
        };
        let Some(result) = result else {
            self.observer.observe(&ReconcileEvent::RecordRejected {
                email_id: email_id.to_string(),
                violations: violations.clone(),
            });
            return RecordResult::Failed(FailedRecord {
                id: email_id.to_string(),
                reason: FailureReason::Invalid(violations),
            });
        };

        if let Err(e) = self.store.persist_result(email_id, &result).await {
            let error = e.to_string();
            self.observer.observe(&ReconcileEvent::RecordPersistFailed {
                email_id: email_id.to_string(),
                error: error.clone(),
            });
            return RecordResult::Failed(FailedRecord {
                id: email_id.to_string(),
                reason: FailureReason::Persist(error),
            });
        }

        let file_ids = result.file_ids();
        for file_id in &file_ids {
            if let Err(e) = self
                .store
                .update_attachment_marker(email_id, file_id, EmailStatus::Extracted)
                .await
            {
                self.observer.observe(&ReconcileEvent::MarkerUpdateFailed {
                    email_id: email_id.to_string(),
                    file_id: file_id.to_string(),
                    error: e.to_string(),
                });
            }
        }

        self.observer.observe(&ReconcileEvent::RecordReconciled {
            email_id: email_id.to_string(),
            file_count: file_ids.len(),
        });
        RecordResult::Succeeded(email_id.to_string())
    }
}
