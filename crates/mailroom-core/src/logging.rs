//! Structured logging field name constants for mailroom.
//!
//! All crates use these names for structured `tracing` fields so log
//! aggregation can query by the same keys across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Cycle-level failure, requires operator attention |
//! | WARN  | Record rejected or cosmetic write failed, retried next cycle |
//! | INFO  | Cycle lifecycle, per-record completions, summaries |
//! | DEBUG | Decision points (shape resolution, config choices) |
//! | TRACE | Per-item iteration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "batch", "db", "adapter", "storage", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "reconcile", "normalizer", "side_effects", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Email record identifier.
pub const EMAIL_ID: &str = "email_id";

/// Attachment identifier within an email.
pub const FILE_ID: &str = "file_id";

/// Name of the normalizer strategy that matched a fragment.
pub const STRATEGY: &str = "strategy";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of items returned or processed.
pub const RESULT_COUNT: &str = "result_count";

/// Number of records that succeeded in a cycle.
pub const SUCCEEDED: &str = "succeeded";

/// Number of records left for retry in a cycle.
pub const FAILED: &str = "failed";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
