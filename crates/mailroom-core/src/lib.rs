//! # mailroom-core
//!
//! Core types, traits, and abstractions for the mailroom extraction pipeline.
//!
//! This crate provides the foundational data structures shared by the other
//! mailroom crates:
//! - Stored email records and their attachments
//! - The wire contract of the extraction service (request and response)
//! - Typed extraction results and calendar events
//! - Schema validation returning human-readable violation lists
//! - Collaborator traits for the record store, blob store and extraction service

pub mod defaults;
pub mod error;
pub mod extraction;
pub mod logging;
pub mod models;
pub mod payload;
pub mod samples;
pub mod schema;
pub mod storage;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use extraction::{
    value_text, CalendarEvent, EmailExtraction, FileExtraction, PaymentDetails, PaymentStatus,
    Urgency,
};
pub use models::{Attachment, AttachmentSource, EmailRecord, EmailStatus};
pub use payload::{EmailEntry, ExtractRequest, ExtractResponse, FileRef};
pub use schema::Shape;
pub use storage::{attachment_object_path, sanitize_filename, sanitize_path_segment, storage_uri};
pub use traits::{BlobStore, ExtractionService, RecordStore};
