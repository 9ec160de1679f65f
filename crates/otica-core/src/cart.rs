//! # Collection Cart Manager
//!
//! An in-progress sale holds one or more named collections (sub-carts).
//! Each collection later maps to at most one service order.
//!
//! ## Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Collection Cart Operations                           │
//! │                                                                         │
//! │  Operator Action           Method                  State Change         │
//! │  ───────────────           ──────                  ────────────         │
//! │                                                                         │
//! │  "Nova coleção" ─────────► add_collection() ─────► push, make active    │
//! │                                                                         │
//! │  Click tab ──────────────► set_active(id) ───────► active = id          │
//! │                                                                         │
//! │  Close tab ──────────────► remove_collection(id) ► refused if last     │
//! │                                                                         │
//! │  Pick product ───────────► add_item() ───────────► merge or append      │
//! │                                                                         │
//! │  Change quantity ────────► update_quantity() ────► stock-capped         │
//! │                                                                         │
//! │  Click remove ───────────► remove_item() ────────► retain               │
//! │                                                                         │
//! │  The flat "current cart" is `active_items()`: a view of the active      │
//! │  collection, never a copy, so edits always land in the owner.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CartError;
use crate::money::Money;
use crate::types::{Category, Product};
use crate::MAX_ITEM_QUANTITY;

// =============================================================================
// Line Item
// =============================================================================

/// A product placed into a collection.
///
/// Identity is `(product_id, category)`. Descriptive fields and the unit
/// price are frozen at add time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: String,
    pub category: Category,
    pub store_id: String,
    pub title: String,
    pub brand: Option<String>,
    pub code: Option<String>,
    pub sku: Option<String>,

    /// Price at the moment the item was added.
    pub unit_price: Money,

    pub quantity: i64,

    /// Last stock figure seen for the product. `None` when not tracked.
    pub available_stock: Option<i64>,

    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl LineItem {
    /// Snapshots a product into a new line.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        LineItem {
            product_id: product.id.clone(),
            category: product.category,
            store_id: product.store_id.clone(),
            title: product.title.clone(),
            brand: product.brand.clone(),
            code: product.code.clone(),
            sku: product.sku.clone(),
            unit_price: product.price,
            quantity,
            available_stock: product.stock,
            added_at: Utc::now(),
        }
    }

    pub fn matches(&self, product_id: &str, category: Category) -> bool {
        self.product_id == product_id && self.category == category
    }

    /// unit price × quantity
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// Non-blocking notice returned by quantity edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StockWarning {
    /// The store does not track stock for this product; the cap was not enforced.
    StockUnknown { title: String },
}

// =============================================================================
// Collection
// =============================================================================

/// A named grouping of line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Collection {
    pub id: u32,
    pub name: String,
    /// Insertion order is display order.
    pub items: Vec<LineItem>,
}

impl Collection {
    pub fn new(id: u32) -> Self {
        Collection {
            id,
            name: format!("Coleção {}", id),
            items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_category(&self, category: Category) -> bool {
        self.items.iter().any(|i| i.category == category)
    }

    pub fn subtotal(&self) -> Money {
        self.items.iter().map(LineItem::line_total).sum()
    }

    fn find_mut(&mut self, product_id: &str, category: Category) -> Option<&mut LineItem> {
        self.items
            .iter_mut()
            .find(|i| i.matches(product_id, category))
    }
}

// =============================================================================
// Collection Cart
// =============================================================================

/// All collections of one in-progress transaction.
///
/// ## Invariants
/// - At least one collection always exists
/// - Ids are sequential from 1 and never reused within the cart
/// - `(product_id, category)` is unique within a collection
/// - Every quantity is in `1..=MAX_ITEM_QUANTITY`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionCart {
    collections: Vec<Collection>,
    active_id: u32,
    next_id: u32,
}

impl CollectionCart {
    /// Starts with one default collection, active.
    pub fn new() -> Self {
        CollectionCart {
            collections: vec![Collection::new(1)],
            active_id: 1,
            next_id: 2,
        }
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn collection(&self, id: u32) -> Option<&Collection> {
        self.collections.iter().find(|c| c.id == id)
    }

    fn collection_mut(&mut self, id: u32) -> Result<&mut Collection, CartError> {
        self.collections
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(CartError::CollectionNotFound(id))
    }

    pub fn active_id(&self) -> u32 {
        self.active_id
    }

    /// The flat "current cart" view: the active collection's items.
    pub fn active_items(&self) -> &[LineItem] {
        self.collection(self.active_id)
            .map(|c| c.items.as_slice())
            .unwrap_or(&[])
    }

    /// Appends a new collection and makes it active. Returns its id.
    pub fn add_collection(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.collections.push(Collection::new(id));
        self.active_id = id;
        id
    }

    /// Switches the active collection.
    pub fn set_active(&mut self, id: u32) -> Result<(), CartError> {
        if self.collection(id).is_none() {
            return Err(CartError::CollectionNotFound(id));
        }
        self.active_id = id;
        Ok(())
    }

    /// Removes a collection and everything in it.
    ///
    /// Returns `Ok(false)` without touching anything when `id` is the only
    /// collection left. If the active collection is removed, the first
    /// remaining one becomes active.
    pub fn remove_collection(&mut self, id: u32) -> Result<bool, CartError> {
        let index = self
            .collections
            .iter()
            .position(|c| c.id == id)
            .ok_or(CartError::CollectionNotFound(id))?;

        if self.collections.len() <= 1 {
            return Ok(false);
        }

        self.collections.remove(index);
        if self.active_id == id {
            self.active_id = self.collections[0].id;
        }
        Ok(true)
    }

    /// Renames a collection. Blank names fall back to the default.
    pub fn rename_collection(&mut self, id: u32, name: &str) -> Result<(), CartError> {
        let collection = self.collection_mut(id)?;
        let name = name.trim();
        collection.name = if name.is_empty() {
            format!("Coleção {}", id)
        } else {
            name.to_string()
        };
        Ok(())
    }

    /// Adds `quantity` of `product` to a collection.
    ///
    /// An existing `(product_id, category)` line has its quantity increased;
    /// its price snapshot is kept. The stock figure is refreshed either way.
    pub fn add_item(
        &mut self,
        collection_id: u32,
        product: &Product,
        quantity: i64,
    ) -> Result<(), CartError> {
        if quantity < 1 {
            return Err(CartError::QuantityBelowMinimum {
                requested: quantity,
            });
        }

        let collection = self.collection_mut(collection_id)?;

        if let Some(item) = collection.find_mut(&product.id, product.category) {
            let new_qty = item.quantity + quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CartError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            item.quantity = new_qty;
            item.available_stock = product.stock;
            return Ok(());
        }

        if quantity > MAX_ITEM_QUANTITY {
            return Err(CartError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }

        collection.items.push(LineItem::from_product(product, quantity));
        Ok(())
    }

    /// Sets a line's quantity.
    ///
    /// ## Behavior
    /// - Below 1: rejected, nothing changes
    /// - Above the last known stock: rejected
    /// - Stock unknown: accepted with a [`StockWarning`]
    pub fn update_quantity(
        &mut self,
        collection_id: u32,
        product_id: &str,
        category: Category,
        new_quantity: i64,
    ) -> Result<Option<StockWarning>, CartError> {
        if new_quantity < 1 {
            return Err(CartError::QuantityBelowMinimum {
                requested: new_quantity,
            });
        }
        if new_quantity > MAX_ITEM_QUANTITY {
            return Err(CartError::QuantityTooLarge {
                requested: new_quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }

        let item = self
            .collection_mut(collection_id)?
            .find_mut(product_id, category)
            .ok_or_else(|| CartError::ItemNotFound {
                product_id: product_id.to_string(),
                category,
            })?;

        match item.available_stock {
            Some(available) if new_quantity > available => Err(CartError::InsufficientStock {
                title: item.title.clone(),
                available,
                requested: new_quantity,
            }),
            Some(_) => {
                item.quantity = new_quantity;
                Ok(None)
            }
            None => {
                item.quantity = new_quantity;
                Ok(Some(StockWarning::StockUnknown {
                    title: item.title.clone(),
                }))
            }
        }
    }

    /// Removes a line. Absent lines are not an error.
    pub fn remove_item(
        &mut self,
        collection_id: u32,
        product_id: &str,
        category: Category,
    ) -> Result<(), CartError> {
        self.collection_mut(collection_id)?
            .items
            .retain(|i| !i.matches(product_id, category));
        Ok(())
    }

    /// Every item of every collection, with its owner.
    pub fn all_items(&self) -> impl Iterator<Item = (&Collection, &LineItem)> {
        self.collections
            .iter()
            .flat_map(|c| c.items.iter().map(move |i| (c, i)))
    }

    /// True when no collection holds any item.
    pub fn is_empty(&self) -> bool {
        self.collections.iter().all(Collection::is_empty)
    }

    /// Number of distinct lines across collections.
    pub fn item_count(&self) -> usize {
        self.collections.iter().map(|c| c.items.len()).sum()
    }

    pub fn total_quantity(&self) -> i64 {
        self.all_items().map(|(_, i)| i.quantity).sum()
    }

    /// Σ collections Σ items unit price × quantity.
    pub fn subtotal(&self) -> Money {
        self.collections.iter().map(Collection::subtotal).sum()
    }
}

impl Default for CollectionCart {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, category: Category, price_cents: i64, stock: Option<i64>) -> Product {
        Product {
            id: id.to_string(),
            store_id: "loja-centro".to_string(),
            category,
            title: format!("Produto {}", id),
            brand: Some("Ray-Ban".to_string()),
            code: Some(format!("C-{}", id)),
            sku: None,
            price: Money::from_cents(price_cents),
            stock,
        }
    }

    #[test]
    fn test_new_cart_has_one_active_collection() {
        let cart = CollectionCart::new();
        assert_eq!(cart.collections().len(), 1);
        assert_eq!(cart.active_id(), 1);
        assert_eq!(cart.collections()[0].name, "Coleção 1");
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_collection_is_sequential_and_active() {
        let mut cart = CollectionCart::new();
        let p = product("a", Category::Armacoes, 10_000, Some(5));
        cart.add_item(1, &p, 1).unwrap();

        let id = cart.add_collection();
        assert_eq!(id, 2);
        assert_eq!(cart.active_id(), 2);
        // new active collection starts empty
        assert!(cart.active_items().is_empty());
        assert_eq!(cart.collection(2).unwrap().name, "Coleção 2");
    }

    #[test]
    fn test_add_same_identity_merges_quantity() {
        let mut cart = CollectionCart::new();
        let p = product("a", Category::Armacoes, 10_000, Some(10));

        cart.add_item(1, &p, 2).unwrap();
        cart.add_item(1, &p, 3).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.active_items()[0].quantity, 5);
    }

    #[test]
    fn test_same_product_id_different_category_is_separate_line() {
        let mut cart = CollectionCart::new();
        cart.add_item(1, &product("x", Category::Armacoes, 100, None), 1)
            .unwrap();
        cart.add_item(1, &product("x", Category::Lentes, 100, None), 1)
            .unwrap();
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn test_price_is_snapshotted_at_add_time() {
        let mut cart = CollectionCart::new();
        let mut p = product("a", Category::Lentes, 20_000, None);
        cart.add_item(1, &p, 1).unwrap();

        p.price = Money::from_cents(99_999);
        cart.add_item(1, &p, 1).unwrap();

        let item = &cart.active_items()[0];
        assert_eq!(item.unit_price.cents(), 20_000);
        assert_eq!(item.line_total().cents(), 40_000);
    }

    #[test]
    fn test_remove_last_collection_is_refused() {
        let mut cart = CollectionCart::new();
        assert_eq!(cart.remove_collection(1), Ok(false));
        assert_eq!(cart.collections().len(), 1);
    }

    #[test]
    fn test_remove_active_collection_reassigns_active_and_drops_items() {
        let mut cart = CollectionCart::new();
        let second = cart.add_collection();
        cart.add_item(second, &product("s", Category::Solares, 50_000, None), 1)
            .unwrap();

        assert_eq!(cart.remove_collection(second), Ok(true));
        assert_eq!(cart.active_id(), 1);
        assert!(cart.is_empty());
        assert_eq!(
            cart.remove_collection(second),
            Err(CartError::CollectionNotFound(second))
        );
    }

    #[test]
    fn test_ids_are_not_reused_after_removal() {
        let mut cart = CollectionCart::new();
        let two = cart.add_collection();
        cart.remove_collection(two).unwrap();
        assert_eq!(cart.add_collection(), 3);
    }

    #[test]
    fn test_active_items_follows_set_active() {
        let mut cart = CollectionCart::new();
        cart.add_item(1, &product("a", Category::Armacoes, 100, None), 1)
            .unwrap();
        let two = cart.add_collection();
        cart.add_item(two, &product("b", Category::Lentes, 100, None), 1)
            .unwrap();

        assert_eq!(cart.active_items()[0].product_id, "b");
        cart.set_active(1).unwrap();
        assert_eq!(cart.active_items()[0].product_id, "a");
        assert!(cart.set_active(42).is_err());
    }

    #[test]
    fn test_update_quantity_rules() {
        let mut cart = CollectionCart::new();
        cart.add_item(1, &product("a", Category::Armacoes, 100, Some(3)), 1)
            .unwrap();

        assert_eq!(
            cart.update_quantity(1, "a", Category::Armacoes, 0),
            Err(CartError::QuantityBelowMinimum { requested: 0 })
        );
        assert!(matches!(
            cart.update_quantity(1, "a", Category::Armacoes, 4),
            Err(CartError::InsufficientStock { available: 3, .. })
        ));
        assert_eq!(cart.update_quantity(1, "a", Category::Armacoes, 3), Ok(None));
        assert_eq!(cart.active_items()[0].quantity, 3);
    }

    #[test]
    fn test_update_quantity_without_stock_warns() {
        let mut cart = CollectionCart::new();
        cart.add_item(1, &product("a", Category::Lentes, 100, None), 1)
            .unwrap();

        let warning = cart
            .update_quantity(1, "a", Category::Lentes, 50)
            .unwrap();
        assert!(matches!(warning, Some(StockWarning::StockUnknown { .. })));
        assert_eq!(cart.active_items()[0].quantity, 50);
    }

    #[test]
    fn test_remove_item_absent_is_ok() {
        let mut cart = CollectionCart::new();
        cart.add_item(1, &product("a", Category::Armacoes, 100, None), 1)
            .unwrap();
        cart.remove_item(1, "zzz", Category::Armacoes).unwrap();
        assert_eq!(cart.item_count(), 1);
        cart.remove_item(1, "a", Category::Armacoes).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_subtotal_across_collections() {
        let mut cart = CollectionCart::new();
        cart.add_item(1, &product("a", Category::Armacoes, 30_000, None), 2)
            .unwrap();
        let two = cart.add_collection();
        cart.add_item(two, &product("b", Category::Lentes, 40_000, None), 1)
            .unwrap();

        assert_eq!(cart.subtotal().cents(), 100_000);
        assert_eq!(cart.total_quantity(), 3);
        assert_eq!(cart.all_items().count(), 2);
    }

    #[test]
    fn test_rename_collection() {
        let mut cart = CollectionCart::new();
        cart.rename_collection(1, "Óculos de leitura").unwrap();
        assert_eq!(cart.collections()[0].name, "Óculos de leitura");
        cart.rename_collection(1, "  ").unwrap();
        assert_eq!(cart.collections()[0].name, "Coleção 1");
    }
}
