//! Validation and storage of the calendar events of a batch.
//!
//! Events are best-effort: invalid ones are dropped individually and a
//! failed write is reported, but neither affects which emails succeed.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value as JsonValue;

use mailroom_core::schema::{is_blank, type_name, validate_calendar_event};
use mailroom_core::{CalendarEvent, RecordStore};

use crate::observer::{ReconcileEvent, ReconcileObserver};

/// An event that was discarded, with the reasons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEvent {
    /// Position in the incoming list.
    pub index: usize,
    pub violations: Vec<String>,
}

/// What happened to the calendar events of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SideEffectOutcome {
    /// Number of entries in the incoming list.
    pub received: usize,
    pub rejected: Vec<RejectedEvent>,
    /// Number of events written.
    pub persisted: usize,
    /// Set when the valid events could not be written.
    pub persist_error: Option<String>,
    /// Set when the calendar entry was present but not a list.
    pub malformed: Option<String>,
}

impl SideEffectOutcome {
    /// True when nothing went wrong. An empty batch is clean.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.persist_error.is_none() && self.malformed.is_none()
    }
}

/// Validates calendar events and stores the valid ones in one write.
pub struct SideEffectCollector {
    store: Arc<dyn RecordStore>,
    observer: Arc<dyn ReconcileObserver>,
}

impl SideEffectCollector {
    pub fn new(store: Arc<dyn RecordStore>, observer: Arc<dyn ReconcileObserver>) -> Self {
        Self { store, observer }
    }

    /// Process the raw calendar entry of a response, if any.
    pub async fn collect(&self, raw: Option<&JsonValue>) -> SideEffectOutcome {
        let mut outcome = SideEffectOutcome::default();

        let items = match raw {
            None => return outcome,
            Some(JsonValue::Array(items)) => items,
            Some(other) if is_blank(other) => return outcome,
            Some(other) => {
                let found = type_name(other);
                self.observer
                    .observe(&ReconcileEvent::SideEffectsMalformed { found });
                outcome.malformed = Some(format!("expected a list of events, found {found}"));
                return outcome;
            }
        };
        outcome.received = items.len();

        let mut valid = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let mut violations = validate_calendar_event(item);
            if violations.is_empty() {
                match CalendarEvent::deserialize(item) {
                    Ok(event) => {
                        valid.push(event);
                        continue;
                    }
                    Err(e) => violations.push(e.to_string()),
                }
            }
            self.observer.observe(&ReconcileEvent::EventRejected {
                index,
                violations: violations.clone(),
            });
            outcome.rejected.push(RejectedEvent { index, violations });
        }

        if valid.is_empty() {
            return outcome;
        }

        match self.store.persist_side_effects(&valid).await {
            Ok(count) => {
                outcome.persisted = count;
                self.observer
                    .observe(&ReconcileEvent::SideEffectsPersisted { count });
            }
            Err(e) => {
                let error = e.to_string();
                self.observer.observe(&ReconcileEvent::SideEffectsFailed {
                    count: valid.len(),
                    error: error.clone(),
                });
                outcome.persist_error = Some(error);
            }
        }
        outcome
    }
}
