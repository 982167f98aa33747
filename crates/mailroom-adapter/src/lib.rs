//! # mailroom-adapter
//!
//! HTTP collaborators of the batch engine:
//! - [`AdapterClient`] submits batches to the extraction service
//! - [`GcsBlobStore`] uploads attachments to Google Cloud Storage

pub mod client;
pub mod config;
pub mod gcs;

pub use client::AdapterClient;
pub use config::{AdapterConfig, GcsConfig};
pub use gcs::GcsBlobStore;
