//! Commits the `Extracted` status for reconciled emails.
//!
//! Failed emails get no write at all: keeping `Scheduled for Extraction`
//! is what makes the next cycle pick them up again.

use std::sync::Arc;

use mailroom_core::{EmailStatus, RecordStore};

use crate::observer::{ReconcileEvent, ReconcileObserver};
use crate::reconcile::ReconcileOutcome;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusOutcome {
    /// Emails moved to `Extracted`.
    pub committed: Vec<String>,
    /// Reconciled emails whose status write failed, with the error.
    pub commit_failures: Vec<(String, String)>,
    /// Every email still scheduled after this cycle.
    pub left_pending: Vec<String>,
}

pub struct StatusResolver {
    store: Arc<dyn RecordStore>,
    observer: Arc<dyn ReconcileObserver>,
}

impl StatusResolver {
    pub fn new(store: Arc<dyn RecordStore>, observer: Arc<dyn ReconcileObserver>) -> Self {
        Self { store, observer }
    }

    pub async fn resolve(&self, outcome: &ReconcileOutcome) -> StatusOutcome {
        let mut status = StatusOutcome::default();

        for email_id in &outcome.succeeded {
            match self
                .store
                .commit_status(email_id, EmailStatus::Extracted)
                .await
            {
                Ok(()) => {
                    self.observer.observe(&ReconcileEvent::StatusCommitted {
                        email_id: email_id.clone(),
                    });
                    status.committed.push(email_id.clone());
                }
                Err(e) => {
                    let error = e.to_string();
                    self.observer.observe(&ReconcileEvent::StatusCommitFailed {
                        email_id: email_id.clone(),
                        error: error.clone(),
                    });
                    status.commit_failures.push((email_id.clone(), error));
                    status.left_pending.push(email_id.clone());
                }
            }
        }

        for failed in &outcome.failed {
            self.observer.observe(&ReconcileEvent::LeftForRetry {
                email_id: failed.id.clone(),
            });
            status.left_pending.push(failed.id.clone());
        }
        status
    }
}
