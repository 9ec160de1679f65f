//! # Transaction Repository
//!
//! Sales, quotes and service orders of one store.
//!
//! ## Finalize Commit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  FinalizedTransaction                                                   │
//! │    ├── service_orders[0] ─► Create lojas/{loja}/servicos/{id_os}        │
//! │    ├── service_orders[n] ─► Create lojas/{loja}/servicos/{id_os}        │
//! │    └── record            ─► Create lojas/{loja}/vendas/{id}             │
//! │                                  or lojas/{loja}/orcamentos/{id}        │
//! │                                                                         │
//! │  One batch, one SQLite transaction: a failed record write leaves no    │
//! │  service orders behind.                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use otica_core::checkout::{FinalizedTransaction, ServiceOrderDocument, TransactionRecord};
use otica_core::TransactionKind;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::DbResult;
use crate::paths;
use crate::repository::{decode, encode};
use crate::store::{DocumentStore, StoredDocument, WriteOp};

/// Repository for finalized transactions and their service orders.
#[derive(Clone)]
pub struct TransactionRepository {
    store: Arc<dyn DocumentStore>,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        TransactionRepository { store }
    }

    /// Writes the service orders and the transaction record atomically.
    ///
    /// ## Returns
    /// The transaction id.
    ///
    /// ## Errors
    /// Any store error, unchanged. Nothing is written on failure.
    pub async fn commit_finalized(&self, finalized: &FinalizedTransaction) -> DbResult<String> {
        let record = &finalized.record;
        debug!(
            id = %record.id,
            kind = ?record.tipo,
            service_orders = finalized.service_orders.len(),
            "Committing finalized transaction"
        );

        let os_collection = paths::service_orders(&record.loja);
        let mut ops = Vec::with_capacity(finalized.service_orders.len() + 1);

        for os in &finalized.service_orders {
            ops.push(WriteOp::Create {
                collection: os_collection.clone(),
                id: os.id_os.clone(),
                data: encode(&os_collection, os)?,
            });
        }

        let collection = paths::transactions(&record.loja, record.tipo);
        ops.push(WriteOp::Create {
            collection: collection.clone(),
            id: record.id.clone(),
            data: encode(&collection, record)?,
        });

        self.store.commit(ops).await?;

        info!(
            id = %record.id,
            total = %record.total,
            service_orders = finalized.service_orders.len(),
            "Transaction saved"
        );
        Ok(record.id.clone())
    }

    /// Gets a sale or quote by id.
    pub async fn get(
        &self,
        store_id: &str,
        kind: TransactionKind,
        id: &str,
    ) -> DbResult<Option<TransactionRecord>> {
        let collection = paths::transactions(store_id, kind);
        match self.store.get(&collection, id).await? {
            Some(data) => decode(
                &collection,
                StoredDocument {
                    id: id.to_string(),
                    data,
                },
            )
            .map(Some),
            None => Ok(None),
        }
    }

    /// Every sale or quote of a store. Documents that no longer decode are
    /// skipped.
    pub async fn list(&self, store_id: &str, kind: TransactionKind) -> DbResult<Vec<TransactionRecord>> {
        let collection = paths::transactions(store_id, kind);
        let docs = self.store.list(&collection).await?;

        let mut records = Vec::with_capacity(docs.len());
        for doc in docs {
            let id = doc.id.clone();
            match decode(&collection, doc) {
                Ok(record) => records.push(record),
                Err(e) => warn!(collection = %collection, id = %id, error = %e, "Skipping transaction document"),
            }
        }
        Ok(records)
    }

    /// Service orders written with a sale, ordered by id.
    pub async fn service_orders_for(
        &self,
        store_id: &str,
        sale_id: &str,
    ) -> DbResult<Vec<ServiceOrderDocument>> {
        let collection = paths::service_orders(store_id);
        self.store
            .query_by_field(&collection, "id_venda", &Value::String(sale_id.to_string()))
            .await?
            .into_iter()
            .map(|doc| decode(&collection, doc))
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
