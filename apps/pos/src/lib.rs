//! # Otica POS Library
//!
//! Application layer of the optical-store counter: state objects, one
//! command per operator action, and startup wiring.
//!
//! ## Module Organization
//! ```text
//! otica_pos/
//! ├── lib.rs          ◄─── You are here (startup & logging)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── db.rs       ◄─── Document store + blob store handles
//! │   ├── session.rs  ◄─── In-progress sale/quote
//! │   └── config.rs   ◄─── Configuration state
//! ├── commands/       ◄─── One function per operator action
//! ├── dispatch.rs     ◄─── JSON-lines front door for the commands
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## State Management
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    PosApp                                               │
//! │                                                                         │
//! │  ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────────┐   │
//! │  │    DbState       │ │   SessionState   │ │    ConfigState       │   │
//! │  │                  │ │                  │ │                      │   │
//! │  │  • SQLite pool   │ │  • Collections   │ │  • Store id          │   │
//! │  │  • Repositories  │ │  • OS forms      │ │  • Seller            │   │
//! │  │  • Blob store    │ │  • Payments      │ │  • Quote validity    │   │
//! │  └──────────────────┘ └──────────────────┘ └──────────────────────┘   │
//! │                                                                         │
//! │  Each command only requests the state it needs.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod dispatch;
pub mod error;
pub mod state;

use std::path::PathBuf;
use std::sync::Arc;

use directories::ProjectDirs;
use otica_core::TransactionKind;
use otica_db::{Database, DbConfig, FsBlobStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

use state::{ConfigState, DbState, SessionState};

/// Database file name inside the platform data directory.
pub const DATABASE_FILE_NAME: &str = "otica.db";

/// The three state objects every command draws from.
#[derive(Clone)]
pub struct PosApp {
    pub db: DbState,
    pub session: SessionState,
    pub config: ConfigState,
}

impl PosApp {
    /// Opens the stores and builds the initial state.
    ///
    /// ## Startup Sequence
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────────┐
    /// │  1. Determine Database Path ─── OTICA_DB_PATH / otica.toml / data dir   │
    /// │  2. Connect to Database ─────── SQLite WAL, run pending migrations      │
    /// │  3. Determine Blob Directory ── OTICA_BLOB_DIR / {data dir}/blobs       │
    /// │  4. Initialize State Objects ── DbState, SessionState, ConfigState      │
    /// └─────────────────────────────────────────────────────────────────────────┘
    /// ```
    pub async fn start(config: ConfigState) -> Result<Self, Box<dyn std::error::Error>> {
        let db_path = get_database_path(&config)?;
        info!(?db_path, "Database path determined");

        let db = Database::new(DbConfig::new(db_path)).await?;
        info!("Database connected and migrations applied");

        let blob_dir = get_blob_dir(&config)?;
        info!(?blob_dir, "Blob directory determined");

        Ok(PosApp::with_database(config, db, blob_dir))
    }

    /// Builds the state around an already open database.
    pub fn with_database(config: ConfigState, db: Database, blob_dir: PathBuf) -> Self {
        let blobs = Arc::new(FsBlobStore::new(blob_dir));
        let session = SessionState::new(TransactionKind::Venda, config.os_delivery_days);
        PosApp {
            db: DbState::new(db, blobs),
            session,
            config,
        }
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr; stdout carries command responses.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=otica=trace` - Show trace for otica crates only
/// - Default: INFO, DEBUG for otica crates
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,otica=debug,sqlx=warn"));

    // A second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let proj_dirs =
        ProjectDirs::from("br", "otica", "pos").ok_or("Could not determine app data directory")?;
    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)?;
    Ok(data_dir.to_path_buf())
}

/// Determines the database file path.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/br.otica.pos/otica.db`
/// - **Windows**: `%APPDATA%\otica\pos\data\otica.db`
/// - **Linux**: `~/.local/share/pos/otica.db`
///
/// `db_path` from the config (file or `OTICA_DB_PATH`) wins.
pub fn get_database_path(config: &ConfigState) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(path) = &config.db_path {
        return Ok(path.clone());
    }
    Ok(data_dir()?.join(DATABASE_FILE_NAME))
}

/// Determines the directory client photos are written to.
pub fn get_blob_dir(config: &ConfigState) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(dir) = &config.blob_dir {
        return Ok(dir.clone());
    }
    Ok(data_dir()?.join("blobs"))
}
