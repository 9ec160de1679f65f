//! # Cart Commands
//!
//! Collections, line items, discount and notes of the in-progress session.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Session Lifecycle                                    │
//! │                                                                         │
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│ Items in │────►│ OS forms │────►│ Finalized│       │
//! │  │ Coleção 1│     │ coleções │     │ payments │     │  record  │       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │                        │                                 │              │
//! │                   add_collection                 finalize_transaction  │
//! │                   add_to_cart                    (sale.rs)             │
//! │                   update_cart_item                                      │
//! │                   remove_from_cart                                      │
//! │                        │                                                │
//! │                        ▼                                                │
//! │                   clear_session ──────────────────► (back to empty)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use otica_core::cart::{Collection, LineItem, StockWarning};
use otica_core::session::{SaleSession, TotalsView};
use otica_core::{Category, Discount, SelectedClient, TransactionKind};
use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;
use crate::state::{ConfigState, DbState, SessionState};

/// Session snapshot returned by every cart command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub kind: TransactionKind,
    pub collections: Vec<Collection>,
    pub active_collection_id: u32,
    /// Flat view of the active collection.
    pub active_items: Vec<LineItem>,
    pub client: Option<SelectedClient>,
    pub discount: Discount,
    pub observacoes: Option<String>,
    pub totals: TotalsView,
    pub pending_service_orders: Vec<u32>,
}

impl From<&SaleSession> for CartResponse {
    fn from(session: &SaleSession) -> Self {
        let cart = session.cart();
        CartResponse {
            kind: session.kind(),
            collections: cart.collections().to_vec(),
            active_collection_id: cart.active_id(),
            active_items: cart.active_items().to_vec(),
            client: session.client().cloned(),
            discount: *session.discount(),
            observacoes: session.observacoes().map(str::to_string),
            totals: session.summary(),
            pending_service_orders: session.pending_service_orders(),
        }
    }
}

/// Result of a quantity change.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityUpdateResponse {
    pub cart: CartResponse,
    /// Set when the stock cap could not be checked.
    pub warning: Option<StockWarning>,
}

/// Gets the current session.
pub fn get_cart(session: &SessionState) -> CartResponse {
    debug!("get_cart command");
    session.with_session(|s| CartResponse::from(s))
}

/// Switches between sale and quote.
pub fn set_transaction_kind(session: &SessionState, kind: TransactionKind) -> CartResponse {
    debug!(?kind, "set_transaction_kind command");
    session.with_session_mut(|s| {
        s.set_kind(kind);
        CartResponse::from(&*s)
    })
}

/// Appends a collection and makes it active.
pub fn add_collection(session: &SessionState) -> CartResponse {
    debug!("add_collection command");
    session.with_session_mut(|s| {
        s.add_collection();
        CartResponse::from(&*s)
    })
}

/// Switches the active collection.
pub fn set_active_collection(session: &SessionState, collection_id: u32) -> Result<CartResponse, ApiError> {
    debug!(collection_id, "set_active_collection command");
    session.with_session_mut(|s| {
        s.set_active_collection(collection_id)?;
        Ok(CartResponse::from(&*s))
    })
}

/// Renames a collection.
pub fn rename_collection(
    session: &SessionState,
    collection_id: u32,
    name: String,
) -> Result<CartResponse, ApiError> {
    debug!(collection_id, "rename_collection command");
    session.with_session_mut(|s| {
        s.rename_collection(collection_id, &name)?;
        Ok(CartResponse::from(&*s))
    })
}

/// Removes a collection and its items.
///
/// The last remaining collection is never removed; the session comes back
/// unchanged.
pub fn remove_collection(session: &SessionState, collection_id: u32) -> Result<CartResponse, ApiError> {
    debug!(collection_id, "remove_collection command");
    session.with_session_mut(|s| {
        if !s.remove_collection(collection_id)? {
            debug!(collection_id, "Refused to remove the last collection");
        }
        Ok(CartResponse::from(&*s))
    })
}

/// Adds a product to a collection.
///
/// ## Behavior
/// - Same product and category already in the collection: quantity increases
/// - Otherwise: new line with the price read from inventory right now
///
/// ## Arguments
/// * `collection_id` - Target collection (default: the active one)
/// * `category` - Inventory category of the product
/// * `product_id` - Product id within that category
/// * `quantity` - Quantity to add (default: 1)
pub async fn add_to_cart(
    db: &DbState,
    session: &SessionState,
    config: &ConfigState,
    collection_id: Option<u32>,
    category: Category,
    product_id: String,
    quantity: Option<i64>,
) -> Result<CartResponse, ApiError> {
    let quantity = quantity.unwrap_or(1);
    debug!(?collection_id, %category, product_id = %product_id, quantity, "add_to_cart command");

    let product = db
        .products()
        .require(&config.store_id, category, &product_id)
        .await?;

    session.with_session_mut(|s| {
        let target = collection_id.unwrap_or_else(|| s.cart().active_id());
        s.add_item(target, &product, quantity)?;
        Ok(CartResponse::from(&*s))
    })
}

/// Sets a line's quantity.
///
/// Rejects quantities below 1 and above the last known stock. When the
/// product has no stock figure the change is applied with a warning.
pub fn update_cart_item(
    session: &SessionState,
    collection_id: u32,
    product_id: String,
    category: Category,
    quantity: i64,
) -> Result<QuantityUpdateResponse, ApiError> {
    debug!(collection_id, product_id = %product_id, %category, quantity, "update_cart_item command");
    session.with_session_mut(|s| {
        let warning = s.update_quantity(collection_id, &product_id, category, quantity)?;
        Ok(QuantityUpdateResponse {
            cart: CartResponse::from(&*s),
            warning,
        })
    })
}

/// Removes a line. Missing lines are ignored.
pub fn remove_from_cart(
    session: &SessionState,
    collection_id: u32,
    product_id: String,
    category: Category,
) -> Result<CartResponse, ApiError> {
    debug!(collection_id, product_id = %product_id, %category, "remove_from_cart command");
    session.with_session_mut(|s| {
        s.remove_item(collection_id, &product_id, category)?;
        Ok(CartResponse::from(&*s))
    })
}

/// Sets the transaction discount. An auto-mode payment follows the new total.
pub fn set_discount(session: &SessionState, discount: Discount) -> Result<CartResponse, ApiError> {
    debug!(?discount, "set_discount command");
    session.with_session_mut(|s| {
        s.set_discount(discount)?;
        Ok(CartResponse::from(&*s))
    })
}

pub fn set_observacoes(session: &SessionState, observacoes: Option<String>) -> CartResponse {
    debug!("set_observacoes command");
    session.with_session_mut(|s| {
        s.set_observacoes(observacoes);
        CartResponse::from(&*s)
    })
}

/// Discards the whole session: one empty collection, no client, no payments.
pub fn clear_session(session: &SessionState) -> CartResponse {
    debug!("clear_session command");
    session.with_session_mut(|s| {
        s.reset();
        CartResponse::from(&*s)
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use otica_core::Money;

    fn product(id: &str, category: Category, cents: i64, stock: Option<i64>) -> otica_core::Product {
        otica_core::Product {
            id: id.to_string(),
            store_id: "loja-01".to_string(),
            category,
            title: format!("Produto {id}"),
            brand: None,
            code: None,
            sku: None,
            price: Money::from_cents(cents),
            stock,
        }
    }

    fn seeded() -> SessionState {
        let state = SessionState::default();
        state.with_session_mut(|s| {
            let id = s.cart().active_id();
            s.add_item(id, &product("a1", Category::Armacoes, 50_000, Some(3)), 1).unwrap();
        });
        state
    }

    #[test]
    fn test_get_cart_reports_totals() {
        let cart = get_cart(&seeded());

        assert_eq!(cart.collections.len(), 1);
        assert_eq!(cart.active_items.len(), 1);
        assert_eq!(cart.totals.subtotal, Money::from_cents(50_000));
        assert_eq!(cart.pending_service_orders, vec![cart.active_collection_id]);
    }

    #[test]
    fn test_add_collection_switches_active_view() {
        let state = seeded();

        let cart = add_collection(&state);

        assert_eq!(cart.collections.len(), 2);
        assert!(cart.active_items.is_empty());
        assert_eq!(cart.totals.subtotal, Money::from_cents(50_000));
    }

    #[test]
    fn test_last_collection_is_kept() {
        let state = seeded();
        let only = get_cart(&state).active_collection_id;

        let cart = remove_collection(&state, only).unwrap();

        assert_eq!(cart.collections.len(), 1);
        assert_eq!(cart.active_items.len(), 1);
    }

    #[test]
    fn test_update_above_stock_is_rejected() {
        let state = seeded();
        let id = get_cart(&state).active_collection_id;

        let err = update_cart_item(&state, id, "a1".into(), Category::Armacoes, 4).unwrap_err();

        assert_eq!(err.code, crate::error::ErrorCode::CartError);
        assert_eq!(get_cart(&state).active_items[0].quantity, 1);
    }

    #[test]
    fn test_update_without_stock_figure_warns() {
        let state = SessionState::default();
        let id = state.with_session_mut(|s| {
            let id = s.cart().active_id();
            s.add_item(id, &product("l1", Category::Lentes, 20_000, None), 1).unwrap();
            id
        });

        let response = update_cart_item(&state, id, "l1".into(), Category::Lentes, 40).unwrap();

        assert!(response.warning.is_some());
        assert_eq!(response.cart.active_items[0].quantity, 40);
    }

    #[test]
    fn test_percentage_discount_updates_total() {
        let state = SessionState::default();
        state.with_session_mut(|s| {
            let id = s.cart().active_id();
            s.add_item(id, &product("s1", Category::Solares, 100_000, Some(2)), 1).unwrap();
        });

        let cart = set_discount(&state, Discount::Percentage { bps: 1000 }).unwrap();

        assert_eq!(cart.totals.discount_amount, Money::from_cents(10_000));
        assert_eq!(cart.totals.total, Money::from_cents(90_000));
    }

    #[test]
    fn test_clear_session_keeps_kind() {
        let state = seeded();
        set_transaction_kind(&state, TransactionKind::Orcamento);

        let cart = clear_session(&state);

        assert_eq!(cart.kind, TransactionKind::Orcamento);
        assert!(cart.active_items.is_empty());
        assert_eq!(cart.collections.len(), 1);
    }
}
