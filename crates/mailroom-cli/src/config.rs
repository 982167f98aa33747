//! Process-level configuration read from the environment.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use mailroom_core::defaults;
use mailroom_core::{Error, Result};

/// Where attachment bytes are uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    Filesystem,
    Gcs,
}

impl FromStr for StorageBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "filesystem" | "fs" | "local" => Ok(StorageBackend::Filesystem),
            "gcs" => Ok(StorageBackend::Gcs),
            other => Err(Error::Config(format!("unknown storage backend: {other}"))),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Filesystem => f.write_str("filesystem"),
            StorageBackend::Gcs => f.write_str("gcs"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub storage_backend: StorageBackend,
    /// Root directory of the filesystem blob store.
    pub storage_path: PathBuf,
    pub bucket: String,
    pub run_migrations: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: defaults::DATABASE_URL.to_string(),
            storage_backend: StorageBackend::default(),
            storage_path: PathBuf::from(defaults::STORAGE_PATH),
            bucket: defaults::STORAGE_BUCKET.to_string(),
            run_migrations: false,
        }
    }
}

impl AppConfig {
    /// Load from `DATABASE_URL`, `STORAGE_BACKEND`, `STORAGE_PATH`,
    /// `STORAGE_BUCKET_NAME` and `RUN_MIGRATIONS`.
    ///
    /// Fails only on an unknown storage backend.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(backend) = non_empty("STORAGE_BACKEND") {
            config.storage_backend = backend.parse()?;
        }
        if let Some(path) = non_empty("STORAGE_PATH") {
            config.storage_path = PathBuf::from(path);
        }
        if let Some(bucket) = non_empty("STORAGE_BUCKET_NAME") {
            config.bucket = bucket;
        }
        config.run_migrations = non_empty("RUN_MIGRATIONS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        Ok(config)
    }
}
