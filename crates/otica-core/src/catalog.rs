//! # Product Catalog Lookup
//!
//! Filtering applied to inventory candidates read from the store.
//!
//! ```text
//! candidates (store + categories)
//!      │
//!      ▼
//!  title / code / brand / sku contains query (case-insensitive)
//!      │
//!      ├── in stock (or untracked) ──► results
//!      │
//!      └── nothing in stock? ────────► out-of-stock matches, flagged
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::Product;

/// Filtered lookup result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMatches {
    pub products: Vec<Product>,
    /// Set when the only matches had zero stock and were shown anyway.
    pub includes_out_of_stock: bool,
}

/// Case-insensitive substring match on title, code, brand and SKU.
pub fn matches_query(product: &Product, needle_lower: &str) -> bool {
    let hit = |field: &str| field.to_lowercase().contains(needle_lower);

    hit(&product.title)
        || product.code.as_deref().is_some_and(hit)
        || product.brand.as_deref().is_some_and(hit)
        || product.sku.as_deref().is_some_and(hit)
}

/// Filters `candidates` for `query`, keeping at most `limit` rows.
///
/// An empty query matches nothing.
pub fn filter_products<I>(candidates: I, query: &str, limit: usize) -> CatalogMatches
where
    I: IntoIterator<Item = Product>,
{
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return CatalogMatches::default();
    }

    let (in_stock, out_of_stock): (Vec<Product>, Vec<Product>) = candidates
        .into_iter()
        .filter(|p| matches_query(p, &needle))
        .partition(|p| !p.is_out_of_stock());

    if in_stock.is_empty() && !out_of_stock.is_empty() {
        return CatalogMatches {
            products: out_of_stock.into_iter().take(limit).collect(),
            includes_out_of_stock: true,
        };
    }

    CatalogMatches {
        products: in_stock.into_iter().take(limit).collect(),
        includes_out_of_stock: false,
    }
}
