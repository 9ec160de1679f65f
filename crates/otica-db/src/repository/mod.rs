//! # Repository Module
//!
//! Typed access to the document store for Otica POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories over the Document Store                 │
//! │                                                                         │
//! │  Command                                                               │
//! │       │                                                                 │
//! │       │  db.products().search("loja-01", &Category::ALL, "ray", 10)    │
//! │       ▼                                                                 │
//! │  ProductRepository / ClientRepository / TransactionRepository          │
//! │       │                                                                 │
//! │       │  typed record ⇄ sanitized JSON document                        │
//! │       ▼                                                                 │
//! │  Arc<dyn DocumentStore>  (SQLite `Database`, or any other store)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Inventory reads and catalog search
//! - [`ClientRepository`] - Client directory, registration, photos
//! - [`TransactionRepository`] - Sales, quotes and service orders

pub mod client;
pub mod product;
pub mod transaction;

pub use client::{ClientPhoto, ClientRepository};
pub use product::ProductRepository;
pub use transaction::TransactionRepository;

use otica_core::document::{to_document, Document};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{DbError, DbResult};
use crate::store::StoredDocument;

/// Decodes a stored document into `T`, filling `id` from the key when absent.
pub(crate) fn decode<T: DeserializeOwned>(collection: &str, doc: StoredDocument) -> DbResult<T> {
    let StoredDocument { id, mut data } = doc;
    if data.get("id").map_or(true, Value::is_null) {
        data.insert("id".to_string(), Value::String(id));
    }
    serde_json::from_value(Value::Object(data)).map_err(|e| DbError::invalid_document(collection, e))
}

/// Encodes a typed record into a sanitized document.
pub(crate) fn encode<T: Serialize + DeserializeOwned>(collection: &str, record: &T) -> DbResult<Document> {
    to_document(record).map_err(|e| DbError::invalid_document(collection, e))
}
