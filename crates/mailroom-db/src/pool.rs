//! Database connection pool management.

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use mailroom_core::{logging as log_fields, Error, Result};

/// Default maximum number of connections in the pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default connection timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default idle timeout in seconds.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

/// Pool configuration options.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Minimum number of connections to maintain.
    pub min_connections: u32,
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Idle connection timeout duration.
    pub idle_timeout: Duration,
    /// Maximum connection lifetime.
    pub max_lifetime: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: 1,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            max_lifetime: Some(Duration::from_secs(1800)),
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read pool settings from the environment.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `DB_MAX_CONNECTIONS` | `10` |
    /// | `DB_MIN_CONNECTIONS` | `1` |
    /// | `DB_CONNECT_TIMEOUT_SECS` | `30` |
    /// | `DB_IDLE_TIMEOUT_SECS` | `600` |
    /// | `DB_MAX_LIFETIME_SECS` | `1800`, `0` disables the limit |
    ///
    /// Unparseable values keep the default. The minimum is capped at the maximum.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        let mut config = Self::default();

        if let Some(n) = number("DB_MAX_CONNECTIONS").filter(|n| *n > 0) {
            config = config.max_connections(u32::try_from(n).unwrap_or(u32::MAX));
        }
        if let Some(n) = number("DB_MIN_CONNECTIONS") {
            config = config.min_connections(u32::try_from(n).unwrap_or(u32::MAX));
        }
        if let Some(secs) = number("DB_CONNECT_TIMEOUT_SECS").filter(|s| *s > 0) {
            config = config.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = number("DB_IDLE_TIMEOUT_SECS").filter(|s| *s > 0) {
            config = config.idle_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = number("DB_MAX_LIFETIME_SECS") {
            config = config.max_lifetime((secs > 0).then(|| Duration::from_secs(secs)));
        }
        config.min_connections = config.min_connections.min(config.max_connections);
        config
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    pub fn min_connections(mut self, n: u32) -> Self {
        self.min_connections = n;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn max_lifetime(mut self, lifetime: Option<Duration>) -> Self {
        self.max_lifetime = lifetime;
        self
    }
}

/// Create a new PostgreSQL connection pool with default configuration.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    create_pool_with_config(database_url, PoolConfig::default()).await
}

/// Create a new PostgreSQL connection pool with custom configuration.
pub async fn create_pool_with_config(database_url: &str, config: PoolConfig) -> Result<PgPool> {
    let start = Instant::now();

    info!(
        { log_fields::SUBSYSTEM } = "db",
        { log_fields::COMPONENT } = "pool",
        { log_fields::OPERATION } = "create",
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        connect_timeout_secs = config.connect_timeout.as_secs(),
        "Creating database connection pool"
    );

    let mut options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout)
        .idle_timeout(config.idle_timeout);

    if let Some(max_lifetime) = config.max_lifetime {
        options = options.max_lifetime(max_lifetime);
    }

    let pool = options
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        { log_fields::SUBSYSTEM } = "db",
        { log_fields::COMPONENT } = "pool",
        { log_fields::OPERATION } = "established",
        pool_size = pool.size(),
        pool_idle = pool.num_idle(),
        { log_fields::DURATION_MS } = start.elapsed().as_millis() as u64,
        "Database connection pool established"
    );
    Ok(pool)
}
