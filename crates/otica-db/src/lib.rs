//! # otica-db: Document and Blob Stores for Otica POS
//!
//! This crate is the persistence side of the sale/quote workflow: a keyed
//! JSON document store on SQLite, a filesystem blob store for client photos,
//! and typed repositories on top of them.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Otica POS Data Flow                              │
//! │                                                                         │
//! │  Command (finalize_transaction)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     otica-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │              │  │   │
//! │  │   │ DocumentStore │◄───│ ClientRepo    │    │ 001_docs.sql │  │   │
//! │  │   │  (store.rs)   │    │ TransactionRepo│   │              │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │                               │   │
//! │  │                        ┌───────▼───────┐                       │   │
//! │  │                        │   BlobStore   │ (client photos)       │   │
//! │  │                        └───────────────┘                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database + blob directory                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`store`] - `DocumentStore` trait and its SQLite implementation
//! - [`blob`] - `BlobStore` trait and the filesystem implementation
//! - [`paths`] - Store-scoped collection paths
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Inventory, client and transaction repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use otica_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/otica.db")).await?;
//! let matches = db.products().search("loja-01", &[], "aviador", 10).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod blob;
pub mod error;
pub mod migrations;
pub mod paths;
pub mod pool;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use blob::{BlobStore, FsBlobStore};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, Location};
pub use store::{DocumentStore, StoredDocument, WriteOp};

// Repository re-exports for convenience
pub use repository::{ClientPhoto, ClientRepository, ProductRepository, TransactionRepository};
