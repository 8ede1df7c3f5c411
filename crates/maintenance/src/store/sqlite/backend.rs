//! SQLite store and its connection pool.

use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::store::SessionProvider;

use super::schema;
use super::session::SqliteSession;

/// SQLite-backed relational store.
///
/// Cloning is cheap and shares the connection pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
    config: SqliteStoreConfig,
    is_memory: bool,
}

impl Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("config", &self.config)
            .field("is_memory", &self.is_memory)
            .finish_non_exhaustive()
    }
}

/// Configuration for the SQLite store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of idle connections.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u32,

    /// Enable WAL mode (file databases only).
    #[serde(default = "default_true")]
    pub enable_wal: bool,

    /// Enable foreign key constraints.
    #[serde(default = "default_true")]
    pub enable_foreign_keys: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout_ms() -> u64 {
    30000
}

fn default_busy_timeout_ms() -> u32 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for SqliteStoreConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout_ms: default_connection_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            enable_wal: true,
            enable_foreign_keys: true,
        }
    }
}

fn connection_failed(message: String) -> BackendError {
    BackendError::ConnectionFailed {
        backend_name: "sqlite".to_string(),
        message,
    }
}

impl SqliteStore {
    /// Creates a new in-memory store.
    ///
    /// Every SQLite connection to `:memory:` is a distinct database, so the pool is
    /// pinned to a single connection that never expires. Sessions and scrolls must
    /// therefore not overlap.
    pub fn in_memory() -> Result<Self, BackendError> {
        let config = SqliteStoreConfig {
            max_connections: 1,
            min_connections: 1,
            ..SqliteStoreConfig::default()
        };
        let manager = Self::configure(SqliteConnectionManager::memory(), &config, false);

        let pool = Pool::builder()
            .max_size(1)
            .min_idle(Some(1))
            .idle_timeout(None)
            .max_lifetime(None)
            .connection_timeout(Duration::from_millis(config.connection_timeout_ms))
            .build(manager)
            .map_err(|e| connection_failed(e.to_string()))?;

        Ok(Self {
            pool,
            config,
            is_memory: true,
        })
    }

    /// Opens or creates a file-based database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BackendError> {
        Self::with_config(path, SqliteStoreConfig::default())
    }

    /// Opens a file-based database with custom configuration.
    pub fn with_config<P: AsRef<Path>>(
        path: P,
        config: SqliteStoreConfig,
    ) -> Result<Self, BackendError> {
        let manager = Self::configure(
            SqliteConnectionManager::file(path.as_ref()),
            &config,
            config.enable_wal,
        );

        let pool = Pool::builder()
            .max_size(config.max_connections)
            .min_idle(Some(config.min_connections))
            .connection_timeout(Duration::from_millis(config.connection_timeout_ms))
            .build(manager)
            .map_err(|e| connection_failed(e.to_string()))?;

        tracing::debug!(path = %path.as_ref().display(), "Opened SQLite store");

        Ok(Self {
            pool,
            config,
            is_memory: false,
        })
    }

    /// Applies per-connection pragmas to every connection the pool opens.
    fn configure(
        manager: SqliteConnectionManager,
        config: &SqliteStoreConfig,
        enable_wal: bool,
    ) -> SqliteConnectionManager {
        let busy_timeout = Duration::from_millis(config.busy_timeout_ms as u64);
        let enable_foreign_keys = config.enable_foreign_keys;

        manager.with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            if enable_foreign_keys {
                conn.pragma_update(None, "foreign_keys", true)?;
            }
            if enable_wal {
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get::<_, String>(0)
                })?;
            }
            Ok(())
        })
    }

    /// Creates the platform tables if they do not exist yet.
    pub fn init_schema(&self) -> Result<(), BackendError> {
        let conn = self.get_connection()?;
        schema::initialize_schema(&conn)
    }

    /// Gets a connection from the pool.
    ///
    /// The connection goes back to the pool when dropped.
    pub fn get_connection(
        &self,
    ) -> Result<PooledConnection<SqliteConnectionManager>, BackendError> {
        self.pool
            .get()
            .map_err(|e| connection_failed(e.to_string()))
    }

    /// Checks that a connection can be obtained and answers a trivial query.
    pub fn health_check(&self) -> Result<(), BackendError> {
        let conn = self.get_connection().map_err(|_| BackendError::Unavailable {
            backend_name: "sqlite".to_string(),
            message: "Failed to get connection".to_string(),
        })?;
        conn.query_row("SELECT 1", [], |_| Ok(()))
            .map_err(|e| BackendError::sqlite("Health check failed", e))
    }

    /// Returns whether this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        self.is_memory
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }
}

impl SessionProvider for SqliteStore {
    type Session = SqliteSession;

    fn open_session(&self) -> Result<Self::Session, BackendError> {
        SqliteSession::begin(self.get_connection()?)
    }
}
