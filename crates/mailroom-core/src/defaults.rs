//! Centralized default constants for mailroom.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own literals.

// =============================================================================
// LIFECYCLE STATUS
// =============================================================================

/// Status tag of emails waiting for (another) extraction attempt.
pub const STATUS_SCHEDULED: &str = "Scheduled for Extraction";

/// Status tag of emails (and attachments) whose extraction was persisted.
pub const STATUS_EXTRACTED: &str = "Extracted";

// =============================================================================
// EXTRACTION SERVICE
// =============================================================================

/// Default extraction service base URL.
pub const ADAPTER_URL: &str = "http://127.0.0.1:8080";

/// Path of the batch extraction endpoint.
pub const EXTRACT_PATH: &str = "/extract";

/// Path of the health endpoint.
pub const HEALTH_PATH: &str = "/health";

/// Timeout for the batch extraction call in seconds. Large batches with
/// attachments routinely take minutes.
pub const ADAPTER_TIMEOUT_SECS: u64 = 300;

/// Timeout for the health check in seconds.
pub const ADAPTER_HEALTH_TIMEOUT_SECS: u64 = 5;

/// Batch-level status value meaning the service produced results.
pub const RESPONSE_STATUS_SUCCESS: &str = "success";

/// Batch-level status value meaning the service failed the whole batch.
pub const RESPONSE_STATUS_ERROR: &str = "error";

/// Reserved key in `results` carrying the calendar events of the batch.
pub const CALENDAR_RESULTS_KEY: &str = "calendar_add_details";

// =============================================================================
// BLOB STORAGE
// =============================================================================

/// URI scheme prefix every attachment location must use.
pub const STORAGE_URI_SCHEME: &str = "gs://";

/// Default bucket for uploaded attachments.
pub const STORAGE_BUCKET: &str = "mailroom_incoming_emails";

/// Default base directory of the filesystem blob store.
pub const STORAGE_PATH: &str = "./data/blobs";

/// Object prefix under which attachments are uploaded.
pub const ATTACHMENT_PREFIX: &str = "attachments";

/// Google Cloud Storage JSON API base URL.
pub const GCS_API_URL: &str = "https://storage.googleapis.com";

/// Timeout for a single attachment upload in seconds.
pub const UPLOAD_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// BATCH PROCESSING
// =============================================================================

/// Maximum emails selected per cycle.
pub const MAX_BATCH_SIZE: i64 = 50;

/// Maximum records reconciled concurrently within one cycle.
pub const BATCH_MAX_CONCURRENT: usize = 4;

// =============================================================================
// DATABASE
// =============================================================================

/// Default database URL.
pub const DATABASE_URL: &str = "postgres://localhost/mailroom";
