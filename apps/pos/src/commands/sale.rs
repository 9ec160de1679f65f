//! # Sale Commands
//!
//! Finalizing the session into a sale or quote, and reading saved ones.
//!
//! ## Finalize Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Finalize Transaction                                 │
//! │                                                                         │
//! │  1. Preconditions (in order, nothing written on failure)               │
//! │     ├── cart empty?            → "Cart empty"                          │
//! │     ├── no client?             → "No client selected"                  │
//! │     ├── sale: OS forms open?   → "Pending OS forms"                    │
//! │     └── sale: payments open?   → "Payment incomplete"                  │
//! │                                                                         │
//! │  2. Temporary client? register it, adopt its id                        │
//! │                                                                         │
//! │  3. Assemble record + OS documents (totals recomputed)                 │
//! │                                                                         │
//! │  4. One atomic batch:                                                  │
//! │     servicos/{OS…-1}, servicos/{OS…-2}, vendas|orcamentos/{id}         │
//! │     (failure: error shown verbatim, session kept for retry)            │
//! │                                                                         │
//! │  5. Reset session, return the transaction id                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use otica_core::checkout::{
    FinalizeContext, ServiceOrderDocument, TransactionIds, TransactionRecord,
};
use otica_core::{CheckoutError, Money, SelectedClient, TransactionKind};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::{ConfigState, DbState, SessionState};

/// What the caller needs after a successful save.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeResponse {
    pub id: String,
    pub kind: TransactionKind,
    pub total: Money,
    /// Ids of the OS documents written with the sale.
    pub service_orders: Vec<String>,
    pub client_id: String,
}

/// Saves the session as a sale or quote.
///
/// ## Returns
/// The new transaction id. The session is reset to one empty collection.
///
/// ## Errors
/// * `CHECKOUT_ERROR` - a precondition failed; nothing was written
/// * `DATABASE_ERROR` - the batch failed; no OS document or record was
///   written and the session is kept as it was
pub async fn finalize_transaction(
    db: &DbState,
    session: &SessionState,
    config: &ConfigState,
) -> Result<FinalizeResponse, ApiError> {
    debug!("finalize_transaction command");

    let snapshot = session.with_session(|s| {
        s.check_preconditions()?;
        Ok::<_, CheckoutError>(s.clone())
    })?;
    let selected = snapshot
        .client()
        .cloned()
        .ok_or(CheckoutError::NoClient)?;

    let client = if selected.is_temporary {
        let registered = db.clients().register(selected.client, None).await?;
        info!(id = %registered.id, "Temporary client registered during finalize");
        // A failed batch below must not register the same client twice on retry
        session.with_session_mut(|s| s.select_client(SelectedClient::existing(registered.clone())));
        registered
    } else {
        selected.client
    };

    let now = Utc::now();
    let ctx = FinalizeContext {
        store_id: config.store_id.clone(),
        seller: config.seller_name.clone(),
        now,
        quote_validity_days: config.quote_validity_days,
        ids: TransactionIds::generate(now),
    };
    let finalized = snapshot.assemble(&client, &ctx);

    let id = db
        .transactions()
        .commit_finalized(&finalized)
        .await
        .map_err(ApiError::write_failed)?;

    session.with_session_mut(|s| s.reset());

    info!(
        id = %id,
        kind = ?finalized.record.tipo,
        total = %finalized.record.total,
        service_orders = finalized.service_orders.len(),
        "Transaction finalized"
    );

    Ok(FinalizeResponse {
        id,
        kind: finalized.record.tipo,
        total: finalized.record.total,
        service_orders: finalized.record.ordens_servico.clone(),
        client_id: client.id,
    })
}

/// Gets a saved sale or quote.
pub async fn get_transaction(
    db: &DbState,
    config: &ConfigState,
    kind: TransactionKind,
    id: String,
) -> Result<TransactionRecord, ApiError> {
    debug!(?kind, id = %id, "get_transaction command");
    db.transactions()
        .get(&config.store_id, kind, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Transaction", &id))
}

/// Lists the store's sales or quotes.
pub async fn list_transactions(
    db: &DbState,
    config: &ConfigState,
    kind: TransactionKind,
) -> Result<Vec<TransactionRecord>, ApiError> {
    debug!(?kind, "list_transactions command");
    Ok(db.transactions().list(&config.store_id, kind).await?)
}

/// Service orders written with a sale.
pub async fn get_sale_service_orders(
    db: &DbState,
    config: &ConfigState,
    sale_id: String,
) -> Result<Vec<ServiceOrderDocument>, ApiError> {
    debug!(sale_id = %sale_id, "get_sale_service_orders command");
    Ok(db
        .transactions()
        .service_orders_for(&config.store_id, &sale_id)
        .await?)
}
