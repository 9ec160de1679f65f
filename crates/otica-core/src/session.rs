//! # Sale Session
//!
//! One in-progress sale or quote. Owns the cart, the OS composer, the payment
//! allocator, the selected client and the discount, and keeps them consistent:
//! every change that can move the total re-syncs the allocator, and every cart
//! change re-syncs the composer.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::{CollectionCart, StockWarning};
use crate::checkout::{self, CheckoutParts, FinalizeContext, FinalizedTransaction, Totals};
use crate::error::{CheckoutError, CoreResult};
use crate::money::Money;
use crate::payment::{CaptureRequest, DistributionMode, PaymentAllocator, PaymentEntry, PaymentMethod};
use crate::service_order::{OsForm, OsRecord, ServiceOrderComposer};
use crate::types::{Category, Client, Discount, Product, SelectedClient, TransactionKind};
use crate::validation::validate_discount;
use crate::OS_DELIVERY_DAYS;

/// Read-only summary for the operator screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TotalsView {
    pub collection_count: usize,
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub total: Money,
    pub allocated: Money,
    pub remaining: Money,
    pub payment_complete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleSession {
    kind: TransactionKind,
    cart: CollectionCart,
    composer: ServiceOrderComposer,
    payments: PaymentAllocator,
    client: Option<SelectedClient>,
    discount: Discount,
    observacoes: Option<String>,
}

impl SaleSession {
    pub fn new(kind: TransactionKind) -> Self {
        Self::with_delivery_days(kind, OS_DELIVERY_DAYS)
    }

    pub fn with_delivery_days(kind: TransactionKind, delivery_days: i64) -> Self {
        SaleSession {
            kind,
            cart: CollectionCart::new(),
            composer: ServiceOrderComposer::with_delivery_days(delivery_days),
            payments: PaymentAllocator::new(),
            client: None,
            discount: Discount::Nenhum,
            observacoes: None,
        }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    /// Re-derives everything that depends on the cart and the discount.
    fn refresh(&mut self) {
        self.composer.sync(&self.cart, Self::today());
        self.payments.sync_total(self.totals().total);
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn cart(&self) -> &CollectionCart {
        &self.cart
    }

    pub fn composer(&self) -> &ServiceOrderComposer {
        &self.composer
    }

    pub fn payments(&self) -> &PaymentAllocator {
        &self.payments
    }

    pub fn client(&self) -> Option<&SelectedClient> {
        self.client.as_ref()
    }

    pub fn discount(&self) -> &Discount {
        &self.discount
    }

    pub fn observacoes(&self) -> Option<&str> {
        self.observacoes.as_deref()
    }

    pub fn totals(&self) -> Totals {
        checkout::compute_totals(&self.cart, &self.discount)
    }

    pub fn summary(&self) -> TotalsView {
        let totals = self.totals();
        TotalsView {
            collection_count: self.cart.collections().len(),
            item_count: self.cart.item_count(),
            total_quantity: self.cart.total_quantity(),
            subtotal: totals.subtotal,
            discount_amount: totals.discount_amount,
            total: totals.total,
            allocated: self.payments.total_allocated(),
            remaining: self.payments.remaining(),
            payment_complete: self.payments.is_complete(),
        }
    }

    // =========================================================================
    // Transaction Settings
    // =========================================================================

    pub fn set_kind(&mut self, kind: TransactionKind) {
        self.kind = kind;
    }

    pub fn set_discount(&mut self, discount: Discount) -> CoreResult<Totals> {
        validate_discount(&discount)?;
        self.discount = discount;
        self.refresh();
        Ok(self.totals())
    }

    pub fn set_observacoes(&mut self, observacoes: Option<String>) {
        self.observacoes = observacoes;
    }

    pub fn select_client(&mut self, client: SelectedClient) {
        self.client = Some(client);
    }

    pub fn clear_client(&mut self) {
        self.client = None;
    }

    // =========================================================================
    // Cart
    // =========================================================================

    pub fn add_collection(&mut self) -> u32 {
        let id = self.cart.add_collection();
        self.refresh();
        id
    }

    pub fn set_active_collection(&mut self, id: u32) -> CoreResult<()> {
        Ok(self.cart.set_active(id)?)
    }

    pub fn remove_collection(&mut self, id: u32) -> CoreResult<bool> {
        let removed = self.cart.remove_collection(id)?;
        if removed {
            self.refresh();
        }
        Ok(removed)
    }

    pub fn rename_collection(&mut self, id: u32, name: &str) -> CoreResult<()> {
        Ok(self.cart.rename_collection(id, name)?)
    }

    pub fn add_item(&mut self, collection_id: u32, product: &Product, quantity: i64) -> CoreResult<()> {
        self.cart.add_item(collection_id, product, quantity)?;
        self.refresh();
        Ok(())
    }

    pub fn update_quantity(
        &mut self,
        collection_id: u32,
        product_id: &str,
        category: Category,
        quantity: i64,
    ) -> CoreResult<Option<StockWarning>> {
        let warning = self
            .cart
            .update_quantity(collection_id, product_id, category, quantity)?;
        self.refresh();
        Ok(warning)
    }

    pub fn remove_item(&mut self, collection_id: u32, product_id: &str, category: Category) -> CoreResult<()> {
        self.cart.remove_item(collection_id, product_id, category)?;
        self.refresh();
        Ok(())
    }

    // =========================================================================
    // Service Orders
    // =========================================================================

    pub fn open_os_form(&mut self, collection_id: u32) -> CoreResult<OsForm> {
        Ok(self
            .composer
            .open_form(&self.cart, collection_id, Self::today())?)
    }

    pub fn submit_os_form(&mut self, collection_id: u32, form: OsForm) -> CoreResult<OsRecord> {
        let record = self
            .composer
            .submit(&self.cart, collection_id, form, Self::today())?;
        Ok(record.clone())
    }

    pub fn pending_service_orders(&self) -> Vec<u32> {
        self.composer.pending_collections(&self.cart)
    }

    // =========================================================================
    // Payments
    // =========================================================================

    pub fn set_payment_mode(&mut self, mode: DistributionMode) {
        self.payments.set_mode(mode);
    }

    pub fn add_payment(&mut self) -> CoreResult<usize> {
        Ok(self.payments.add_entry()?)
    }

    pub fn remove_payment(&mut self, index: usize) -> CoreResult<PaymentEntry> {
        Ok(self.payments.remove_entry(index)?)
    }

    pub fn change_payment_method(&mut self, index: usize, method: PaymentMethod) -> CoreResult<()> {
        Ok(self.payments.change_method(index, method)?)
    }

    pub fn set_payment_value(&mut self, index: usize, value: Money) -> CoreResult<()> {
        Ok(self.payments.set_value(index, value)?)
    }

    pub fn process_payment(&mut self, index: usize, request: CaptureRequest) -> CoreResult<PaymentEntry> {
        let entry = self.payments.process(index, request)?;
        Ok(entry.clone())
    }

    // =========================================================================
    // Finalize
    // =========================================================================

    /// The ordered finalize checks against the current state.
    pub fn check_preconditions(&self) -> Result<(), CheckoutError> {
        checkout::check_preconditions(
            self.kind,
            &self.cart,
            self.client.is_some(),
            &self.composer,
            &self.payments,
        )
    }

    /// Assembles the documents to write. `client` must carry its store id.
    pub fn assemble(&self, client: &Client, ctx: &FinalizeContext) -> FinalizedTransaction {
        let parts = CheckoutParts {
            kind: self.kind,
            cart: &self.cart,
            composer: &self.composer,
            payments: &self.payments,
            discount: &self.discount,
            observacoes: self.observacoes.as_deref(),
        };
        checkout::assemble(parts, client, ctx)
    }

    /// Starts over with one empty collection, keeping the transaction kind.
    pub fn reset(&mut self) {
        let kind = self.kind;
        let composer = ServiceOrderComposer::with_delivery_days(self.delivery_days());
        *self = SaleSession {
            kind,
            cart: CollectionCart::new(),
            composer,
            payments: PaymentAllocator::new(),
            client: None,
            discount: Discount::Nenhum,
            observacoes: None,
        };
    }

    fn delivery_days(&self) -> i64 {
        self.composer.delivery_days()
    }
}

impl Default for SaleSession {
    fn default() -> Self {
        Self::new(TransactionKind::Venda)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CartError, CoreError};
    use crate::service_order::{AdditionalDetails, OsStatus, OsType};
    use crate::prescription::Prescription;
    use chrono::Duration;

    fn product(id: &str, category: Category, price: i64) -> Product {
        Product {
            id: id.to_string(),
            store_id: "loja-centro".to_string(),
            category,
            title: format!("Item {}", id),
            brand: None,
            code: None,
            sku: None,
            price: Money::from_cents(price),
            stock: Some(10),
        }
    }

    #[test]
    fn test_auto_payment_follows_discount() {
        let mut session = SaleSession::default();
        session
            .add_item(1, &product("a", Category::Armacoes, 50_000), 1)
            .unwrap();
        assert_eq!(session.payments().entries()[0].value.cents(), 50_000);

        session
            .set_discount(Discount::Value {
                amount: Money::from_cents(5_000),
            })
            .unwrap();
        assert_eq!(session.payments().entries()[0].value.cents(), 45_000);
        assert_eq!(session.summary().remaining, Money::zero());
    }

    #[test]
    fn test_invalid_discount_leaves_state() {
        let mut session = SaleSession::default();
        session
            .add_item(1, &product("a", Category::Armacoes, 10_000), 1)
            .unwrap();
        assert!(matches!(
            session.set_discount(Discount::Percentage { bps: 15_000 }),
            Err(CoreError::Validation(_))
        ));
        assert_eq!(session.discount(), &Discount::Nenhum);
        assert_eq!(session.totals().total.cents(), 10_000);
    }

    #[test]
    fn test_cart_errors_surface_as_core_errors() {
        let mut session = SaleSession::default();
        assert!(matches!(
            session.add_item(7, &product("a", Category::Lentes, 1), 1),
            Err(CoreError::Cart(CartError::CollectionNotFound(7)))
        ));
    }

    #[test]
    fn test_os_record_created_when_item_added() {
        let mut session = SaleSession::default();
        session
            .add_item(1, &product("a", Category::Solares, 10_000), 1)
            .unwrap();
        assert_eq!(session.pending_service_orders(), vec![1]);
        assert_eq!(
            session.composer().record(1).map(|r| r.recommended_type),
            Some(OsType::Completa)
        );

        let form = OsForm {
            tipo: OsType::Completa,
            receita: Prescription::default(),
            laboratorio: "Lab Central".to_string(),
            status: OsStatus::AguardandoEnvio,
            observacoes: None,
            data_prevista_entrega: Utc::now().date_naive() + Duration::days(3),
            detalhes_adicionais: AdditionalDetails::default(),
        };
        session.submit_os_form(1, form).unwrap();
        assert!(session.pending_service_orders().is_empty());
    }

    #[test]
    fn test_summary_counts() {
        let mut session = SaleSession::default();
        session
            .add_item(1, &product("a", Category::Armacoes, 10_000), 2)
            .unwrap();
        let two = session.add_collection();
        session
            .add_item(two, &product("b", Category::Lentes, 5_000), 1)
            .unwrap();

        let summary = session.summary();
        assert_eq!(summary.collection_count, 2);
        assert_eq!(summary.item_count, 2);
        assert_eq!(summary.total_quantity, 3);
        assert_eq!(summary.total.cents(), 25_000);
        assert!(!summary.payment_complete);
    }

    #[test]
    fn test_reset_keeps_kind() {
        let mut session = SaleSession::new(TransactionKind::Orcamento);
        session
            .add_item(1, &product("a", Category::Armacoes, 10_000), 1)
            .unwrap();
        session.add_collection();
        session.reset();

        assert_eq!(session.kind(), TransactionKind::Orcamento);
        assert_eq!(session.cart().collections().len(), 1);
        assert!(session.cart().is_empty());
        assert!(session.client().is_none());
    }
}
