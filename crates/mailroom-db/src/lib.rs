//! # mailroom-db
//!
//! PostgreSQL persistence for mailroom.
//!
//! This crate provides:
//! - Connection pool management
//! - [`PgRecordStore`], the record store over `emails`, `email_files`,
//!   `extraction_results` and `calendar_events`
//! - [`FilesystemBlobStore`], a local blob store using the bucket layout
//!
//! ## Example
//!
//! ```rust,ignore
//! use mailroom_db::{Database, EmailStatus, RecordStore};
//!
//! let db = Database::connect("postgres://localhost/mailroom").await?;
//! db.migrate().await?;
//! let pending = db.records.list_pending(EmailStatus::Scheduled, 50).await?;
//! ```

pub mod blob_storage;
pub mod pool;
pub mod records;

// Re-export core types
pub use mailroom_core::*;

pub use blob_storage::FilesystemBlobStore;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use records::PgRecordStore;

/// Connection pool plus the record store built on it.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Record store for emails, attachments and extraction output.
    pub records: PgRecordStore,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            records: PgRecordStore::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
