//! # Database State
//!
//! Wraps the document store and the blob store for use in commands.
//!
//! ## Thread Safety
//! The `Database` struct from `otica-db` contains a `SqlitePool` which
//! is inherently thread-safe, and the blob store is shared behind an `Arc`.
//! Commands can read concurrently without explicit locking.
//!
//! ## Usage in Commands
//! ```rust,ignore
//! pub async fn search_products(db: &DbState, config: &ConfigState, query: String)
//!     -> ProductSearchResponse
//! {
//!     let matches = db.products().search(&config.store_id, &[], &query, 10).await;
//!     ...
//! }
//! ```

use std::sync::Arc;

use otica_db::{
    BlobStore, ClientRepository, Database, ProductRepository, TransactionRepository,
};

/// Store handles injected into every command that touches persistence.
#[derive(Clone)]
pub struct DbState {
    db: Database,
    blobs: Arc<dyn BlobStore>,
}

impl DbState {
    /// Creates a new DbState from an open database and a blob store.
    pub fn new(db: Database, blobs: Arc<dyn BlobStore>) -> Self {
        DbState { db, blobs }
    }

    /// Returns a reference to the inner Database.
    pub fn inner(&self) -> &Database {
        &self.db
    }

    pub fn products(&self) -> ProductRepository {
        self.db.products()
    }

    pub fn clients(&self) -> ClientRepository {
        self.db.clients(Arc::clone(&self.blobs))
    }

    pub fn transactions(&self) -> TransactionRepository {
        self.db.transactions()
    }
}
