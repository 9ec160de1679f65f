//! # Product Commands
//!
//! Catalog lookup for the add-item picker.
//!
//! ## Search Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operator types "aviador" in the picker                                │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  search_products(query, categories)                                     │
//! │         │                                                               │
//! │         ├── store answered ─► in-stock rows                            │
//! │         │                     (or zero-stock rows + includesOutOfStock) │
//! │         │                                                               │
//! │         └── store failed ───► no rows + warning (never an error)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use otica_core::validation::validate_search_query;
use otica_core::{Category, Product};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::{ConfigState, DbState};

/// Product picker rows.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSearchResponse {
    pub products: Vec<Product>,
    /// Every row has zero stock; shown because nothing else matched.
    pub includes_out_of_stock: bool,
    /// Inline warning when the lookup itself failed.
    pub warning: Option<String>,
}

/// Searches the store's inventory.
///
/// ## Arguments
/// * `query` - Case-insensitive substring of title, code, brand or SKU
/// * `categories` - Categories to search (empty: all)
/// * `limit` - Maximum rows (default: configured search limit)
///
/// ## Returns
/// Matching products. A failed lookup is reported through `warning` with
/// no rows; the picker keeps working.
pub async fn search_products(
    db: &DbState,
    config: &ConfigState,
    query: String,
    categories: Vec<Category>,
    limit: Option<usize>,
) -> ProductSearchResponse {
    let limit = limit.unwrap_or(config.search_limit);
    debug!(query = %query, ?categories, limit, "search_products command");

    let query = match validate_search_query(&query) {
        Ok(q) => q,
        Err(e) => {
            return ProductSearchResponse {
                warning: Some(e.to_string()),
                ..Default::default()
            }
        }
    };

    match db
        .products()
        .search(&config.store_id, &categories, &query, limit)
        .await
    {
        Ok(matches) => ProductSearchResponse {
            products: matches.products,
            includes_out_of_stock: matches.includes_out_of_stock,
            warning: None,
        },
        Err(e) => {
            warn!(error = %e, "Product lookup failed");
            ProductSearchResponse {
                warning: Some(format!("Product lookup failed: {}", e)),
                ..Default::default()
            }
        }
    }
}

/// Gets a product by category and id.
pub async fn get_product(
    db: &DbState,
    config: &ConfigState,
    category: Category,
    id: String,
) -> Result<Product, ApiError> {
    debug!(%category, id = %id, "get_product command");
    Ok(db.products().require(&config.store_id, category, &id).await?)
}
