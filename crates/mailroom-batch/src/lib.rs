//! # mailroom-batch
//!
//! One extraction cycle, end to end:
//!
//! 1. [`BatchAssembler`] uploads pending attachments and builds the request
//! 2. the [`ExtractionService`](mailroom_core::ExtractionService) is called once
//! 3. [`ReconciliationEngine`] normalizes, validates and persists each result
//!    while [`SideEffectCollector`] stores the calendar events
//! 4. [`StatusResolver`] commits `Extracted` for the records that made it
//!
//! Records that fail anywhere keep their status and are picked up again by
//! the next cycle. [`BatchProcessor`] wires the steps together.

pub mod assembly;
pub mod normalizer;
pub mod observer;
pub mod processor;
pub mod reconcile;
pub mod side_effects;
pub mod status;

pub use assembly::{AssembledBatch, BatchAssembler, SkippedRecord};
pub use normalizer::{Matcher, Normalized, Normalizer, Resolution, Strategy};
pub use observer::{
    NullObserver, ReconcileEvent, ReconcileObserver, RecordingObserver, TracingObserver,
};
pub use processor::{
    BatchConfig, BatchProcessor, BatchProcessorBuilder, CycleOutcome, CycleReport,
};
pub use reconcile::{
    FailedRecord, FailureReason, ReconcileOutcome, Reconciliation, ReconciliationEngine,
};
pub use side_effects::{RejectedEvent, SideEffectCollector, SideEffectOutcome};
pub use status::{StatusOutcome, StatusResolver};
