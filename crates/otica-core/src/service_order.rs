//! # Service-Order (OS) Composer
//!
//! Decides which collections need a service order, recommends an OS type for
//! each, and holds the per-collection form the operator fills in.
//!
//! ## Per-Collection Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   collection gains an eligible item                                     │
//! │            │                                                            │
//! │            ▼                                                            │
//! │   sync() ─► OsRecord { recommended, chosen = recommended, open }        │
//! │            │                                                            │
//! │            ▼                                                            │
//! │   open_form() ──► prefilled OsForm                                      │
//! │            │                                                            │
//! │      ┌─────┴──────┐                                                     │
//! │      ▼            ▼                                                     │
//! │   cancel       submit() ─► validated, chosen = form.tipo,               │
//! │  (no-op)                   is_completed = true                          │
//! │                                                                         │
//! │   Later syncs only refresh `recommended`; `chosen` is sticky.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Recommendation
//! | Collection contents                 | Recommended  |
//! |-------------------------------------|--------------|
//! | nothing eligible                    | `sem_os`     |
//! | frame + lens, or any sunglasses     | `completa`   |
//! | frame only / lens only              | `incompleta` |

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::{Collection, CollectionCart, LineItem};
use crate::error::{ServiceOrderError, ValidationError};
use crate::prescription::Prescription;
use crate::types::Category;
use crate::OS_DELIVERY_DAYS;

// =============================================================================
// Enums
// =============================================================================

/// Kind of service order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OsType {
    /// Ready for lab assembly.
    Completa,
    /// Missing frame or lens.
    Incompleta,
    /// Direct delivery, no lab work.
    SemOs,
}

/// Workflow stage of a service order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OsStatus {
    #[default]
    AguardandoEnvio,
    EnviadoLaboratorio,
    EmProducao,
    ProntoParaRetirada,
    Entregue,
}

/// Parts the client brought in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AdditionalDetails {
    /// Client supplies the frame.
    pub armacao_cliente: bool,
    /// Client supplies the lenses.
    pub lentes_cliente: bool,
}

// =============================================================================
// Eligibility & Recommendation
// =============================================================================

pub fn is_eligible(item: &LineItem) -> bool {
    item.category.requires_service_order()
}

pub fn has_eligible_items(collection: &Collection) -> bool {
    collection.items.iter().any(is_eligible)
}

/// Recommended OS type for a collection's current contents.
pub fn recommend(collection: &Collection) -> OsType {
    if !has_eligible_items(collection) {
        return OsType::SemOs;
    }

    let frame = collection.has_category(Category::Armacoes);
    let lens = collection.has_category(Category::Lentes);
    let sunglasses = collection.has_category(Category::Solares);

    if (frame && lens) || sunglasses {
        OsType::Completa
    } else {
        OsType::Incompleta
    }
}

// =============================================================================
// Form & Record
// =============================================================================

/// What the operator edits and submits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OsForm {
    #[serde(rename = "tipoOS")]
    pub tipo: OsType,
    pub receita: Prescription,
    pub laboratorio: String,
    pub status: OsStatus,
    pub observacoes: Option<String>,
    #[ts(as = "String")]
    pub data_prevista_entrega: NaiveDate,
    pub detalhes_adicionais: AdditionalDetails,
}

/// Per-collection OS state kept in memory until finalize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OsRecord {
    pub collection_id: u32,
    /// Pure function of the collection contents, refreshed on every sync.
    pub recommended_type: OsType,
    /// Set from the recommendation once, then only by the operator.
    pub chosen_type: OsType,
    pub receita: Prescription,
    pub laboratorio: String,
    pub status: OsStatus,
    pub observacoes: Option<String>,
    #[ts(as = "String")]
    pub data_criacao: NaiveDate,
    #[ts(as = "String")]
    pub data_prevista_entrega: NaiveDate,
    pub detalhes_adicionais: AdditionalDetails,
    pub is_completed: bool,
}

impl OsRecord {
    fn initial(collection: &Collection, today: NaiveDate, delivery_days: i64) -> Self {
        let recommended = recommend(collection);
        OsRecord {
            collection_id: collection.id,
            recommended_type: recommended,
            chosen_type: recommended,
            receita: Prescription::default(),
            laboratorio: String::new(),
            status: OsStatus::default(),
            observacoes: None,
            data_criacao: today,
            data_prevista_entrega: today + Duration::days(delivery_days),
            detalhes_adicionais: AdditionalDetails::default(),
            is_completed: false,
        }
    }

    fn to_form(&self) -> OsForm {
        OsForm {
            tipo: self.chosen_type,
            receita: self.receita.clone(),
            laboratorio: self.laboratorio.clone(),
            status: self.status,
            observacoes: self.observacoes.clone(),
            data_prevista_entrega: self.data_prevista_entrega,
            detalhes_adicionais: self.detalhes_adicionais,
        }
    }

    /// Whether finalize should write an OS document for this record.
    pub fn produces_document(&self) -> bool {
        self.is_completed && self.chosen_type != OsType::SemOs
    }
}

// =============================================================================
// Composer
// =============================================================================

/// The in-memory `osData` map, keyed by collection id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceOrderComposer {
    records: BTreeMap<u32, OsRecord>,
    delivery_days: i64,
}

impl ServiceOrderComposer {
    pub fn new() -> Self {
        Self::with_delivery_days(OS_DELIVERY_DAYS)
    }

    pub fn with_delivery_days(delivery_days: i64) -> Self {
        ServiceOrderComposer {
            records: BTreeMap::new(),
            delivery_days,
        }
    }

    pub fn delivery_days(&self) -> i64 {
        self.delivery_days
    }

    pub fn record(&self, collection_id: u32) -> Option<&OsRecord> {
        self.records.get(&collection_id)
    }

    pub fn records(&self) -> impl Iterator<Item = &OsRecord> {
        self.records.values()
    }

    /// Reconciles records with the cart.
    ///
    /// Lazily creates a record for each collection that now needs one,
    /// refreshes recommendations, and drops records of removed collections.
    pub fn sync(&mut self, cart: &CollectionCart, today: NaiveDate) {
        self.records
            .retain(|id, _| cart.collection(*id).is_some());

        for collection in cart.collections() {
            if let Some(record) = self.records.get_mut(&collection.id) {
                record.recommended_type = recommend(collection);
            } else if has_eligible_items(collection) {
                self.records.insert(
                    collection.id,
                    OsRecord::initial(collection, today, self.delivery_days),
                );
            }
        }
    }

    /// Returns the form prefilled with the current record.
    ///
    /// A completed record reopens with its last submitted values.
    pub fn open_form(
        &mut self,
        cart: &CollectionCart,
        collection_id: u32,
        today: NaiveDate,
    ) -> Result<OsForm, ServiceOrderError> {
        let collection = cart
            .collection(collection_id)
            .ok_or(ServiceOrderError::CollectionNotFound(collection_id))?;

        if !has_eligible_items(collection) {
            return Err(ServiceOrderError::NotRequired(collection_id));
        }

        let delivery_days = self.delivery_days;
        let record = self
            .records
            .entry(collection_id)
            .or_insert_with(|| OsRecord::initial(collection, today, delivery_days));

        Ok(record.to_form())
    }

    /// Validates and stores a submitted form, marking the record completed.
    ///
    /// Resubmitting overwrites the previous values. On error nothing changes.
    pub fn submit(
        &mut self,
        cart: &CollectionCart,
        collection_id: u32,
        form: OsForm,
        today: NaiveDate,
    ) -> Result<&OsRecord, ServiceOrderError> {
        let collection = cart
            .collection(collection_id)
            .ok_or(ServiceOrderError::CollectionNotFound(collection_id))?;

        if !has_eligible_items(collection) {
            return Err(ServiceOrderError::NotRequired(collection_id));
        }

        let laboratorio = form.laboratorio.trim().to_string();
        if laboratorio.is_empty() && form.tipo != OsType::SemOs {
            return Err(ValidationError::required("laboratorio").into());
        }

        let receita = form.receita.normalized()?;
        let observacoes = form
            .observacoes
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty());

        let delivery_days = self.delivery_days;
        let record = self
            .records
            .entry(collection_id)
            .or_insert_with(|| OsRecord::initial(collection, today, delivery_days));

        if form.data_prevista_entrega < record.data_criacao {
            return Err(ValidationError::invalid(
                "dataPrevistaEntrega",
                "cannot be before the OS creation date",
            )
            .into());
        }

        record.recommended_type = recommend(collection);
        record.chosen_type = form.tipo;
        record.receita = receita;
        record.laboratorio = laboratorio;
        record.status = form.status;
        record.observacoes = observacoes;
        record.data_prevista_entrega = form.data_prevista_entrega;
        record.detalhes_adicionais = form.detalhes_adicionais;
        record.is_completed = true;

        Ok(record)
    }

    /// Collections that still block a sale.
    ///
    /// A collection blocks when it has eligible items, its chosen type is
    /// not `sem_os`, and its form has not been submitted.
    pub fn pending_collections(&self, cart: &CollectionCart) -> Vec<u32> {
        cart.collections()
            .iter()
            .filter(|c| has_eligible_items(c))
            .filter(|c| match self.records.get(&c.id) {
                Some(record) => record.chosen_type != OsType::SemOs && !record.is_completed,
                None => true,
            })
            .map(|c| c.id)
            .collect()
    }

    /// The completion gate for sales.
    pub fn all_completed(&self, cart: &CollectionCart) -> bool {
        self.pending_collections(cart).is_empty()
    }

    /// Completed records that become OS documents, in collection order.
    pub fn documents_to_write<'a>(
        &'a self,
        cart: &'a CollectionCart,
    ) -> impl Iterator<Item = (&'a Collection, &'a OsRecord)> + 'a {
        cart.collections().iter().filter_map(move |c| {
            self.records
                .get(&c.id)
                .filter(|r| has_eligible_items(c) && r.produces_document())
                .map(|r| (c, r))
        })
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl Default for ServiceOrderComposer {
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
    use crate::money::Money;
    use crate::prescription::EyeReading;
    use crate::types::Product;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    fn product(id: &str, category: Category) -> Product {
        Product {
            id: id.to_string(),
            store_id: "loja-centro".to_string(),
            category,
            title: format!("Item {}", id),
            brand: None,
            code: None,
            sku: None,
            price: Money::from_cents(10_000),
            stock: None,
        }
    }

    fn cart_with(categories: &[Category]) -> CollectionCart {
        let mut cart = CollectionCart::new();
        for (i, c) in categories.iter().enumerate() {
            cart.add_item(1, &product(&i.to_string(), *c), 1).unwrap();
        }
        cart
    }

    fn valid_form(tipo: OsType) -> OsForm {
        OsForm {
            tipo,
            receita: Prescription {
                right_eye: EyeReading {
                    sphere: Some("-1.25".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            },
            laboratorio: "Lab Visão".to_string(),
            status: OsStatus::AguardandoEnvio,
            observacoes: Some("  ".to_string()),
            data_prevista_entrega: today() + Duration::days(10),
            detalhes_adicionais: AdditionalDetails::default(),
        }
    }

    #[test]
    fn test_recommendation_table() {
        let rec = |cats: &[Category]| recommend(&cart_with(cats).collections()[0]);

        assert_eq!(rec(&[]), OsType::SemOs);
        assert_eq!(rec(&[Category::Armacoes, Category::Lentes]), OsType::Completa);
        assert_eq!(rec(&[Category::Solares]), OsType::Completa);
        assert_eq!(rec(&[Category::Armacoes]), OsType::Incompleta);
        assert_eq!(rec(&[Category::Lentes]), OsType::Incompleta);
    }

    #[test]
    fn test_sync_initializes_lazily_with_delivery_date() {
        let mut composer = ServiceOrderComposer::new();
        let mut cart = CollectionCart::new();

        composer.sync(&cart, today());
        assert!(composer.record(1).is_none());

        cart.add_item(1, &product("a", Category::Armacoes), 1).unwrap();
        composer.sync(&cart, today());

        let record = composer.record(1).unwrap();
        assert_eq!(record.chosen_type, OsType::Incompleta);
        assert_eq!(record.data_prevista_entrega, today() + Duration::days(15));
        assert!(!record.is_completed);
    }

    #[test]
    fn test_chosen_type_is_sticky_across_syncs() {
        let mut composer = ServiceOrderComposer::new();
        let mut cart = cart_with(&[Category::Armacoes]);
        composer.sync(&cart, today());
        composer
            .submit(&cart, 1, valid_form(OsType::Incompleta), today())
            .unwrap();

        cart.add_item(1, &product("l", Category::Lentes), 1).unwrap();
        composer.sync(&cart, today());

        let record = composer.record(1).unwrap();
        assert_eq!(record.recommended_type, OsType::Completa);
        assert_eq!(record.chosen_type, OsType::Incompleta);
    }

    #[test]
    fn test_open_form_prefills_last_submission() {
        let mut composer = ServiceOrderComposer::new();
        let cart = cart_with(&[Category::Solares]);
        composer
            .submit(&cart, 1, valid_form(OsType::Completa), today())
            .unwrap();

        let form = composer.open_form(&cart, 1, today()).unwrap();
        assert_eq!(form.laboratorio, "Lab Visão");
        assert_eq!(form.receita.right_eye.sphere.as_deref(), Some("-1.25"));
        assert_eq!(form.observacoes, None);
    }

    #[test]
    fn test_open_form_on_collection_without_eligible_items() {
        let mut composer = ServiceOrderComposer::new();
        let cart = CollectionCart::new();
        assert_eq!(
            composer.open_form(&cart, 1, today()),
            Err(ServiceOrderError::NotRequired(1))
        );
        assert_eq!(
            composer.open_form(&cart, 9, today()),
            Err(ServiceOrderError::CollectionNotFound(9))
        );
    }

    #[test]
    fn test_submit_requires_laboratorio_and_valid_receita() {
        let mut composer = ServiceOrderComposer::new();
        let cart = cart_with(&[Category::Armacoes]);

        let mut form = valid_form(OsType::Completa);
        form.laboratorio = " ".to_string();
        assert!(composer.submit(&cart, 1, form, today()).is_err());

        let mut form = valid_form(OsType::Completa);
        form.receita.left_eye.sphere = Some("+9.00".to_string());
        assert!(composer.submit(&cart, 1, form, today()).is_err());

        let mut form = valid_form(OsType::Completa);
        form.data_prevista_entrega = today() - Duration::days(1);
        assert!(composer.submit(&cart, 1, form, today()).is_err());

        assert!(!composer.all_completed(&cart));
    }

    #[test]
    fn test_completion_gate() {
        let mut composer = ServiceOrderComposer::new();
        let mut cart = cart_with(&[Category::Armacoes]);
        let two = cart.add_collection();
        cart.add_item(two, &product("s", Category::Solares), 1).unwrap();
        cart.add_collection(); // empty third collection never blocks
        composer.sync(&cart, today());

        assert_eq!(composer.pending_collections(&cart), vec![1, 2]);

        composer
            .submit(&cart, 1, valid_form(OsType::Incompleta), today())
            .unwrap();
        assert_eq!(composer.pending_collections(&cart), vec![2]);

        composer
            .submit(&cart, two, valid_form(OsType::Completa), today())
            .unwrap();
        assert!(composer.all_completed(&cart));
        assert_eq!(composer.documents_to_write(&cart).count(), 2);
    }

    #[test]
    fn test_sem_os_submission_writes_no_document() {
        let mut composer = ServiceOrderComposer::new();
        let cart = cart_with(&[Category::Solares]);
        let mut form = valid_form(OsType::SemOs);
        form.laboratorio = String::new();
        composer.submit(&cart, 1, form, today()).unwrap();

        assert!(composer.all_completed(&cart));
        assert_eq!(composer.documents_to_write(&cart).count(), 0);
    }

    #[test]
    fn test_removed_collection_drops_record() {
        let mut composer = ServiceOrderComposer::new();
        let mut cart = CollectionCart::new();
        let two = cart.add_collection();
        cart.add_item(two, &product("a", Category::Armacoes), 1).unwrap();
        composer.sync(&cart, today());
        assert!(composer.record(two).is_some());

        cart.remove_collection(two).unwrap();
        composer.sync(&cart, today());
        assert!(composer.record(two).is_none());
        assert!(composer.all_completed(&cart));
    }
}
