//! One extraction cycle: self-test, select, assemble, submit, reconcile,
//! resolve.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, instrument, warn};

use mailroom_core::defaults::{
    ADAPTER_TIMEOUT_SECS, BATCH_MAX_CONCURRENT, MAX_BATCH_SIZE,
};
use mailroom_core::{BlobStore, EmailStatus, Error, ExtractionService, RecordStore, Result};

use crate::assembly::{BatchAssembler, SkippedRecord};
use crate::normalizer::Normalizer;
use crate::observer::{ReconcileObserver, TracingObserver};
use crate::reconcile::{FailureReason, ReconcileOutcome, Reconciliation, ReconciliationEngine};
use crate::side_effects::SideEffectOutcome;
use crate::status::{StatusOutcome, StatusResolver};

/// Extra time granted over the HTTP client's own timeout before the cycle
/// gives up on a submission.
const SUBMIT_GRACE: Duration = Duration::from_secs(5);

/// Configuration for a batch cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Maximum emails selected per cycle.
    pub max_batch_size: i64,
    /// Maximum emails reconciled concurrently.
    pub max_concurrent: usize,
    /// Upper bound on one submission, including connection setup.
    pub submit_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: MAX_BATCH_SIZE,
            max_concurrent: BATCH_MAX_CONCURRENT,
            submit_timeout: Duration::from_secs(ADAPTER_TIMEOUT_SECS) + SUBMIT_GRACE,
        }
    }
}

impl BatchConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `MAX_BATCH_SIZE` | `50` | Emails selected per cycle |
    /// | `BATCH_MAX_CONCURRENT` | `4` | Emails reconciled concurrently |
    /// | `ADAPTER_TIMEOUT_SECS` | `300` | Submission bound (plus a short grace) |
    pub fn from_env() -> Self {
        let max_batch_size = std::env::var("MAX_BATCH_SIZE")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(MAX_BATCH_SIZE);

        let max_concurrent = std::env::var("BATCH_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(BATCH_MAX_CONCURRENT)
            .max(1);

        let timeout_secs = std::env::var("ADAPTER_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(ADAPTER_TIMEOUT_SECS);

        Self {
            max_batch_size,
            max_concurrent,
            submit_timeout: Duration::from_secs(timeout_secs) + SUBMIT_GRACE,
        }
    }

    pub fn with_max_batch_size(mut self, n: i64) -> Self {
        self.max_batch_size = n;
        self
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = timeout;
        self
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing was pending.
    Idle,
    /// Emails were pending but none produced a valid request entry.
    NothingSubmitted,
    /// A batch was submitted and reconciled. A transport failure shows up
    /// here as every submitted email failing.
    Completed {
        reconciliation: Reconciliation,
        status: StatusOutcome,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Emails selected from the store.
    pub pending: usize,
    /// Emails included in the request.
    pub submitted: usize,
    pub skipped: Vec<SkippedRecord>,
    pub outcome: CycleOutcome,
    pub duration: Duration,
}

impl CycleReport {
    /// True when the cycle made forward progress or had nothing to do.
    pub fn is_success(&self) -> bool {
        match &self.outcome {
            CycleOutcome::Idle => true,
            CycleOutcome::NothingSubmitted => false,
            CycleOutcome::Completed { reconciliation, .. } => {
                reconciliation.primary.any_succeeded
            }
        }
    }

    pub fn primary(&self) -> Option<&ReconcileOutcome> {
        match &self.outcome {
            CycleOutcome::Completed { reconciliation, .. } => Some(&reconciliation.primary),
            _ => None,
        }
    }

    pub fn side_effects(&self) -> Option<&SideEffectOutcome> {
        match &self.outcome {
            CycleOutcome::Completed { reconciliation, .. } => Some(&reconciliation.side_effects),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<&StatusOutcome> {
        match &self.outcome {
            CycleOutcome::Completed { status, .. } => Some(status),
            _ => None,
        }
    }

    pub fn succeeded_count(&self) -> usize {
        self.primary().map_or(0, |p| p.succeeded.len())
    }

    pub fn failed_count(&self) -> usize {
        self.primary().map_or(0, |p| p.failed.len())
    }
}

/// Runs extraction cycles against the configured collaborators.
pub struct BatchProcessor {
    store: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    service: Arc<dyn ExtractionService>,
    config: BatchConfig,
    assembler: BatchAssembler,
    engine: ReconciliationEngine,
    resolver: StatusResolver,
}

impl BatchProcessor {
    pub fn builder(
        store: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        service: Arc<dyn ExtractionService>,
    ) -> BatchProcessorBuilder {
        BatchProcessorBuilder::new(store, blobs, service)
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Check that the record store and the blob store are reachable.
    ///
    /// The extraction service is checked too, but an unhealthy service only
    /// produces a warning: the submission itself decides the cycle.
    pub async fn self_test(&self) -> Result<()> {
        self.store
            .ping()
            .await
            .map_err(|e| Error::Internal(format!("record store unreachable: {e}")))?;
        self.blobs
            .ping()
            .await
            .map_err(|e| Error::Internal(format!("blob store unreachable: {e}")))?;

        match self.service.health_check().await {
            Ok(true) => {}
            Ok(false) | Err(_) => warn!(
                subsystem = "batch",
                "Extraction service health check failed, continuing"
            ),
        }
        Ok(())
    }

    /// Run exactly one cycle.
    ///
    /// Returns `Err` only when the self-test or the pending selection
    /// fails. Every other failure is reported in the [`CycleReport`].
    #[instrument(skip(self), fields(max_batch_size = self.config.max_batch_size))]
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let start = Instant::now();
        self.self_test().await?;

        let pending = self
            .store
            .list_pending(EmailStatus::Scheduled, self.config.max_batch_size)
            .await?;
        if pending.is_empty() {
            info!(subsystem = "batch", "No emails scheduled for extraction");
            return Ok(CycleReport {
                pending: 0,
                submitted: 0,
                skipped: Vec::new(),
                outcome: CycleOutcome::Idle,
                duration: start.elapsed(),
            });
        }

        let assembled = self.assembler.assemble(&pending).await;
        if assembled.request.is_empty() {
            error!(
                subsystem = "batch",
                pending = pending.len(),
                skipped = assembled.skipped.len(),
                "No valid email entries to submit"
            );
            return Ok(CycleReport {
                pending: pending.len(),
                submitted: 0,
                skipped: assembled.skipped,
                outcome: CycleOutcome::NothingSubmitted,
                duration: start.elapsed(),
            });
        }

        let submitted = assembled.request.email_ids();
        let reconciliation = match self.submit(&assembled.request).await {
            Ok(response) => self.engine.reconcile(&response, &submitted).await,
            Err(e) => {
                error!(
                    subsystem = "batch",
                    error = %e,
                    submitted = submitted.len(),
                    "Batch submission failed, nothing changed"
                );
                Reconciliation {
                    primary: ReconcileOutcome::all_failed(
                        &submitted,
                        FailureReason::Transport(e.to_string()),
                    ),
                    side_effects: SideEffectOutcome::default(),
                }
            }
        };
        let status = self.resolver.resolve(&reconciliation.primary).await;

        let report = CycleReport {
            pending: pending.len(),
            submitted: submitted.len(),
            skipped: assembled.skipped,
            outcome: CycleOutcome::Completed {
                reconciliation,
                status,
            },
            duration: start.elapsed(),
        };
        info!(
            subsystem = "batch",
            pending = report.pending,
            submitted = report.submitted,
            succeeded = report.succeeded_count(),
            failed = report.failed_count(),
            duration_ms = report.duration.as_millis() as u64,
            "Cycle complete"
        );
        Ok(report)
    }

    async fn submit(
        &self,
        request: &mailroom_core::ExtractRequest,
    ) -> Result<mailroom_core::ExtractResponse> {
        match tokio::time::timeout(self.config.submit_timeout, self.service.extract(request)).await
        {
            Ok(result) => result,
            Err(_) => Err(Error::Request(format!(
                "submission exceeded {}s",
                self.config.submit_timeout.as_secs()
            ))),
        }
    }
}

/// Builder for [`BatchProcessor`].
pub struct BatchProcessorBuilder {
    store: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    service: Arc<dyn ExtractionService>,
    config: BatchConfig,
    observer: Arc<dyn ReconcileObserver>,
    normalizer: Normalizer,
}

impl BatchProcessorBuilder {
    pub fn new(
        store: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        service: Arc<dyn ExtractionService>,
    ) -> Self {
        Self {
            store,
            blobs,
            service,
            config: BatchConfig::default(),
            observer: Arc::new(TracingObserver),
            normalizer: Normalizer::standard(),
        }
    }

    pub fn with_config(mut self, config: BatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ReconcileObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn build(self) -> BatchProcessor {
        let engine = ReconciliationEngine::new(self.store.clone(), self.observer.clone())
            .with_normalizer(self.normalizer)
            .with_max_concurrent(self.config.max_concurrent);
        BatchProcessor {
            assembler: BatchAssembler::new(self.store.clone(), self.blobs.clone()),
            resolver: StatusResolver::new(self.store.clone(), self.observer),
            engine,
            store: self.store,
            blobs: self.blobs,
            service: self.service,
            config: self.config,
        }
    }
}
