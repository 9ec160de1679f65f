//! # State Module
//!
//! Application state for the POS commands.
//!
//! Instead of a single `AppState` struct containing everything, each
//! concern has its own state type and every command declares exactly
//! the state it needs.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      PosApp::start()                            │   │
//! │  │  ConfigState::load() ─► Database::new() ─► FsBlobStore::new()   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                              │                                          │
//! │          ┌──────────────────┼──────────────────┐                       │
//! │          ▼                  ▼                  ▼                        │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐              │
//! │  │   DbState    │  │ SessionState │  │   ConfigState    │              │
//! │  │              │  │              │  │                  │              │
//! │  │  Database    │  │  Arc<Mutex<  │  │  store_id        │              │
//! │  │  BlobStore   │  │  SaleSession │  │  seller_name     │              │
//! │  │              │  │  >>          │  │  search_limit    │              │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘              │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • DbState: connection pool and Arc'd blob store                       │
//! │  • SessionState: Arc<Mutex<T>>, never locked across an await           │
//! │  • ConfigState: read-only after initialization                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod session;

pub use config::{default_config_path, ConfigError, ConfigState, CONFIG_FILE_NAME};
pub use db::DbState;
pub use session::SessionState;
