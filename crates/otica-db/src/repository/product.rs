//! # Product Repository
//!
//! Inventory reads for one store. Each category is its own collection:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Catalog Search                                       │
//! │                                                                         │
//! │  Operator types: "ray"                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  lojas/{loja}/estoque/armacoes ─┐                                      │
//! │  lojas/{loja}/estoque/lentes   ─┼─► filter_products(query, limit)      │
//! │  lojas/{loja}/estoque/solares  ─┘      title / code / brand / SKU      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  In-stock matches, or zero-stock matches flagged when nothing else     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use otica_core::catalog::{filter_products, CatalogMatches};
use otica_core::{Category, Product};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::paths;
use crate::repository::{decode, encode};
use crate::store::{DocumentStore, StoredDocument};

/// Repository for inventory documents.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(db.store());
/// let matches = repo.search("loja-01", &Category::ALL, "aviador", 10).await?;
/// ```
#[derive(Clone)]
pub struct ProductRepository {
    store: Arc<dyn DocumentStore>,
}

/// Inventory documents may omit the fields implied by their path.
fn decode_product(store_id: &str, category: Category, doc: StoredDocument) -> DbResult<Product> {
    let collection = paths::inventory(store_id, category);
    let mut doc = doc;
    doc.data
        .entry("loja")
        .or_insert_with(|| Value::String(store_id.to_string()));
    doc.data
        .entry("categoria")
        .or_insert_with(|| Value::String(category.as_str().to_string()));
    decode(&collection, doc)
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        ProductRepository { store }
    }

    /// Lists one category of a store's inventory.
    ///
    /// Documents that no longer decode as a product are skipped with a warning
    /// so one bad record does not hide the rest of the catalog.
    pub async fn list_category(&self, store_id: &str, category: Category) -> DbResult<Vec<Product>> {
        let collection = paths::inventory(store_id, category);
        let docs = self.store.list(&collection).await?;

        let mut products = Vec::with_capacity(docs.len());
        for doc in docs {
            let id = doc.id.clone();
            match decode_product(store_id, category, doc) {
                Ok(product) => products.push(product),
                Err(e) => warn!(collection = %collection, id = %id, error = %e, "Skipping inventory document"),
            }
        }
        Ok(products)
    }

    /// Gets a product by id.
    pub async fn get(
        &self,
        store_id: &str,
        category: Category,
        id: &str,
    ) -> DbResult<Option<Product>> {
        let collection = paths::inventory(store_id, category);
        match self.store.get(&collection, id).await? {
            Some(data) => {
                let doc = StoredDocument {
                    id: id.to_string(),
                    data,
                };
                decode_product(store_id, category, doc).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Gets a product by id, failing when it doesn't exist.
    pub async fn require(&self, store_id: &str, category: Category, id: &str) -> DbResult<Product> {
        self.get(store_id, category, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Searches the given categories of a store's inventory.
    ///
    /// ## Arguments
    /// * `store_id` - Store whose inventory is searched
    /// * `categories` - Categories to include (an empty slice means all)
    /// * `query` - Case-insensitive substring of title, code, brand or SKU
    /// * `limit` - Maximum rows returned
    ///
    /// ## Returns
    /// In-stock matches; when every match is out of stock those are returned
    /// with `includes_out_of_stock` set. A read failure is an `Err`, never an
    /// empty result.
    pub async fn search(
        &self,
        store_id: &str,
        categories: &[Category],
        query: &str,
        limit: usize,
    ) -> DbResult<CatalogMatches> {
        debug!(store_id, query, limit, "Searching inventory");

        let categories: &[Category] = if categories.is_empty() {
            &Category::ALL
        } else {
            categories
        };

        let mut candidates = Vec::new();
        for &category in categories {
            candidates.extend(self.list_category(store_id, category).await?);
        }

        let matches = filter_products(candidates, query, limit);
        debug!(
            count = matches.products.len(),
            includes_out_of_stock = matches.includes_out_of_stock,
            "Inventory search complete"
        );
        Ok(matches)
    }

    /// Inserts or replaces a product in its store and category.
    pub async fn upsert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, title = %product.title, "Upserting product");

        let collection = paths::inventory(&product.store_id, product.category);
        let data = encode(&collection, product)?;
        self.store.set(&collection, &product.id, data).await
    }

    /// Counts a store's inventory across all categories.
    pub async fn count(&self, store_id: &str) -> DbResult<usize> {
        let mut total = 0;
        for category in Category::ALL {
            total += self
                .store
                .list(&paths::inventory(store_id, category))
                .await?
                .len();
        }
        Ok(total)
    }
}

/// Generates a new unique product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use otica_core::Money;
    use serde_json::json;

    fn product(id: &str, category: Category, title: &str, stock: Option<i64>) -> Product {
        Product {
            id: id.to_string(),
            store_id: "loja-01".to_string(),
            category,
            title: title.to_string(),
            brand: Some("Ray-Ban".to_string()),
            code: Some(format!("C-{id}")),
            sku: None,
            price: Money::from_cents(45_000),
            stock,
        }
    }

    async fn setup() -> (Database, ProductRepository) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        (db, repo)
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let (_db, repo) = setup().await;
        let p = product("p1", Category::Armacoes, "Aviador Classic", Some(3));

        repo.upsert(&p).await.unwrap();

        let found = repo.get("loja-01", Category::Armacoes, "p1").await.unwrap();
        assert_eq!(found, Some(p));
        assert!(repo.get("loja-01", Category::Lentes, "p1").await.unwrap().is_none());
        assert!(matches!(
            repo.require("loja-01", Category::Lentes, "p1").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_search_across_categories() {
        let (_db, repo) = setup().await;
        repo.upsert(&product("p1", Category::Armacoes, "Aviador", Some(2))).await.unwrap();
        repo.upsert(&product("p2", Category::Solares, "Wayfarer Sol", Some(1))).await.unwrap();
        repo.upsert(&product("p3", Category::Lentes, "Lente Multifocal", Some(8))).await.unwrap();

        let all = repo.search("loja-01", &[], "ray-ban", 10).await.unwrap();
        assert_eq!(all.products.len(), 3);

        let frames_only = repo
            .search("loja-01", &[Category::Armacoes], "ray-ban", 10)
            .await
            .unwrap();
        assert_eq!(frames_only.products.len(), 1);
        assert_eq!(frames_only.products[0].id, "p1");
    }

    #[tokio::test]
    async fn test_search_falls_back_to_out_of_stock() {
        let (_db, repo) = setup().await;
        repo.upsert(&product("p1", Category::Armacoes, "Aviador", Some(0))).await.unwrap();

        let matches = repo.search("loja-01", &[], "aviador", 10).await.unwrap();
        assert_eq!(matches.products.len(), 1);
        assert!(matches.includes_out_of_stock);
    }

    #[tokio::test]
    async fn test_documents_without_path_fields_decode() {
        let (db, repo) = setup().await;
        let data = json!({ "titulo": "Clubmaster", "preco": 39990, "quantidade": 4 });
        db.store()
            .set(
                "lojas/loja-01/estoque/armacoes",
                "legacy-1",
                data.as_object().cloned().unwrap(),
            )
            .await
            .unwrap();

        let products = repo.list_category("loja-01", Category::Armacoes).await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, "legacy-1");
        assert_eq!(products[0].store_id, "loja-01");
        assert_eq!(products[0].category, Category::Armacoes);
        assert_eq!(products[0].brand, None);
    }

    #[tokio::test]
    async fn test_malformed_documents_are_skipped() {
        let (db, repo) = setup().await;
        repo.upsert(&product("p1", Category::Lentes, "Lente", Some(1))).await.unwrap();
        db.store()
            .set(
                "lojas/loja-01/estoque/lentes",
                "broken",
                json!({ "titulo": 42 }).as_object().cloned().unwrap(),
            )
            .await
            .unwrap();

        let products = repo.list_category("loja-01", Category::Lentes).await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(repo.count("loja-01").await.unwrap(), 2);
    }
}
