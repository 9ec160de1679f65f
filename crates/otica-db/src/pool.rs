//! # Database Pool Management
//!
//! Opens the SQLite file that backs the document store and hands out the
//! repositories built on top of it.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DbConfig::new("otica.db")         DbConfig::in_memory()               │
//! │        │  WAL, pool of 5                  │  one connection, no file    │
//! │        └──────────────┬───────────────────┘                             │
//! │                       ▼                                                 │
//! │  Database::new(config) ─► open pool ─► apply migrations/sqlite/*.sql   │
//! │                       │                                                 │
//! │                       ├─► products()      inventory per category        │
//! │                       ├─► clients(blobs)  directory + photo uploads     │
//! │                       └─► transactions()  sales, quotes, OS documents   │
//! │                                                                         │
//! │  Every repository shares the same pool through Arc<dyn DocumentStore>. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! File databases use WAL so lookups keep answering while a finalize batch
//! commits.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::blob::BlobStore;
use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::client::ClientRepository;
use crate::repository::product::ProductRepository;
use crate::repository::transaction::TransactionRepository;
use crate::store::DocumentStore;

// =============================================================================
// Configuration
// =============================================================================

/// Where the documents live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    File(PathBuf),
    /// Private to one connection; gone when the pool closes.
    Memory,
}

/// How to open the store.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/otica/otica.db").pool_size(3);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub location: Location,
    /// Upper bound on open connections (default 5).
    pub pool_size: u32,
    /// How long a caller waits for a free connection.
    pub acquire_timeout: Duration,
    /// Idle connections are dropped after this long. `None` keeps them.
    pub idle_timeout: Option<Duration>,
    /// Apply pending migrations while opening (default on).
    pub migrate: bool,
}

impl DbConfig {
    /// A file-backed store. Missing parent directories and the file itself
    /// are created on open.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            location: Location::File(path.into()),
            pool_size: 5,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            migrate: true,
        }
    }

    /// A throwaway store for tests and demos.
    pub fn in_memory() -> Self {
        DbConfig {
            location: Location::Memory,
            // A second connection would see a different, empty database
            pool_size: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: None,
            migrate: true,
        }
    }

    pub fn pool_size(mut self, size: u32) -> Self {
        self.pool_size = size.max(1);
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Opens without touching the schema.
    pub fn skip_migrations(mut self) -> Self {
        self.migrate = false;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.location == Location::Memory
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = match &self.location {
            Location::Memory => SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?,
            Location::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
                }
                SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal)
            }
        };
        Ok(options.foreign_keys(true))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the open store. Clones share the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, brings the schema up to date.
    ///
    /// ## Errors
    /// * `ConnectionFailed` - bad path, unwritable directory, pool timeout
    /// * `MigrationFailed` - a migration script failed
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(location = ?config.location, "Opening document store");

        let connect_options = config.connect_options()?;
        debug!(pool_size = config.pool_size, "Connect options ready");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.pool_size)
            .min_connections(1)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(if config.is_in_memory() {
                None
            } else {
                Some(Duration::from_secs(30 * 60))
            })
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let db = Database { pool };
        if config.migrate {
            db.run_migrations().await?;
        }

        info!(pool_size = config.pool_size, "Document store ready");
        Ok(db)
    }

    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// This database behind the store trait, for injection into repositories.
    pub fn store(&self) -> Arc<dyn DocumentStore> {
        Arc::new(self.clone())
    }

    /// Inventory of every store and category.
    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.store())
    }

    /// Client directory. Photos go to `blobs`.
    pub fn clients(&self, blobs: Arc<dyn BlobStore>) -> ClientRepository {
        ClientRepository::new(self.store(), blobs)
    }

    /// Sales, quotes and their service orders.
    pub fn transactions(&self) -> TransactionRepository {
        TransactionRepository::new(self.store())
    }

    /// Closes every connection. Later reads and writes fail with a
    /// connection error.
    pub async fn close(&self) {
        info!("Closing document store");
        self.pool.close().await;
    }

    /// True when a trivial query goes through.
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store_answers() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.ping().await);
    }

    #[tokio::test]
    async fn test_closed_store_stops_answering() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;

        assert!(!db.ping().await);
    }

    #[tokio::test]
    async fn test_file_store_creates_missing_directories() {
        let dir = std::env::temp_dir().join(format!("otica-pool-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("otica.db");

        let db = Database::new(DbConfig::new(&path)).await.unwrap();

        assert!(db.ping().await);
        assert!(path.exists());
        db.close().await;
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/otica-test.db")
            .pool_size(0)
            .skip_migrations();

        assert_eq!(config.pool_size, 1);
        assert!(!config.migrate);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }
}
