//! # Transaction Finalizer (pure part)
//!
//! Precondition checks, totals, and assembly of the documents a finalize
//! writes. The writes themselves live in `otica-db`.
//!
//! ## Finalize Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. check_preconditions()       (this module, in order)                 │
//! │       cart empty?  ──► CartEmpty                                        │
//! │       no client?   ──► NoClient                                         │
//! │       sale && OS pending?        ──► PendingServiceOrders               │
//! │       sale && payment incomplete ──► PaymentIncomplete                  │
//! │                                                                         │
//! │  2. register temporary client   (otica-pos → otica-db)                  │
//! │                                                                         │
//! │  3. assemble()                  (this module)                           │
//! │       totals, flattened items, one OS document per completed collection │
//! │                                                                         │
//! │  4. atomic batch: OS documents + transaction record (otica-db)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::cart::{Collection, CollectionCart};
use crate::error::CheckoutError;
use crate::money::Money;
use crate::payment::{PaymentAllocator, PaymentEntry};
use crate::prescription::Prescription;
use crate::service_order::{AdditionalDetails, OsRecord, OsStatus, OsType, ServiceOrderComposer};
use crate::types::{Category, Client, ClientSnapshot, Discount, TransactionKind, TransactionStatus};

// =============================================================================
// Preconditions
// =============================================================================

/// Runs the four finalize checks in order. The first failure wins.
pub fn check_preconditions(
    kind: TransactionKind,
    cart: &CollectionCart,
    has_client: bool,
    composer: &ServiceOrderComposer,
    payments: &PaymentAllocator,
) -> Result<(), CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::CartEmpty);
    }

    if !has_client {
        return Err(CheckoutError::NoClient);
    }

    if kind.is_sale() {
        let pending = composer.pending_collections(cart);
        if !pending.is_empty() {
            return Err(CheckoutError::PendingServiceOrders {
                collections: pending,
            });
        }

        if !payments.is_complete() {
            return Err(CheckoutError::PaymentIncomplete);
        }
    }

    Ok(())
}

// =============================================================================
// Totals
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: Money,
    pub discount_amount: Money,
    pub total: Money,
}

/// subtotal → discount → total, in that order.
pub fn compute_totals(cart: &CollectionCart, discount: &Discount) -> Totals {
    let subtotal = cart.subtotal();
    let discount_amount = discount.amount_for(subtotal);
    Totals {
        subtotal,
        discount_amount,
        total: subtotal - discount_amount,
    }
}

// =============================================================================
// Documents
// =============================================================================

/// A line in the flattened item list, tagged with its collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionItem {
    pub id: String,
    pub categoria: Category,
    pub loja: String,
    pub titulo: String,
    pub marca: Option<String>,
    pub codigo: Option<String>,
    pub sku: Option<String>,
    pub preco_unitario: Money,
    pub quantidade: i64,
    pub subtotal: Money,
    pub colecao_id: u32,
    pub colecao_nome: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountRecord {
    /// Amount actually taken off.
    pub valor: Money,
    /// `nenhum`, `valor` or `percentual`.
    pub tipo: String,
    /// Operator input: centavos or basis points.
    pub valor_original: i64,
}

/// The sale or quote document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionRecord {
    pub id: String,
    pub tipo: TransactionKind,
    pub loja: String,
    #[ts(as = "String")]
    pub data_criacao: DateTime<Utc>,
    #[ts(as = "String")]
    pub data: NaiveDate,
    pub cliente: ClientSnapshot,
    pub itens: Vec<TransactionItem>,
    pub subtotal: Money,
    pub desconto: DiscountRecord,
    pub total: Money,
    /// Sales only.
    pub formas_pagamento: Option<Vec<PaymentEntry>>,
    pub observacoes: Option<String>,
    pub vendedor: String,
    pub status: TransactionStatus,
    /// Quotes only.
    #[ts(as = "Option<String>")]
    pub validade: Option<NaiveDate>,
    /// Ids of the OS documents written with this sale.
    pub ordens_servico: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OsProduct {
    pub id: String,
    pub categoria: Category,
    pub nome: String,
    pub marca: Option<String>,
    pub quantidade: i64,
}

/// One service order, written per completed collection of a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ServiceOrderDocument {
    pub id_os: String,
    pub id_venda: String,
    pub loja: String,
    pub colecao_id: u32,
    pub colecao_nome: String,
    pub cliente: ClientSnapshot,
    pub tipo: OsType,
    pub status: OsStatus,
    #[ts(as = "String")]
    pub data_criacao: DateTime<Utc>,
    #[ts(as = "String")]
    pub data_previsao: NaiveDate,
    pub produtos: Vec<OsProduct>,
    pub receita: Prescription,
    pub observacoes: Option<String>,
    pub laboratorio: String,
    pub detalhes_adicionais: AdditionalDetails,
}

/// Everything one finalize writes.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedTransaction {
    pub record: TransactionRecord,
    pub service_orders: Vec<ServiceOrderDocument>,
}

// =============================================================================
// Assembly
// =============================================================================

/// Ids for one finalize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionIds {
    pub transaction_id: String,
    /// Prefix of every OS id: `{os_base_id}-{collection_id}`.
    pub os_base_id: String,
}

impl TransactionIds {
    pub fn generate(now: DateTime<Utc>) -> Self {
        let uuid = Uuid::new_v4();
        let short = uuid.simple().to_string()[..6].to_uppercase();
        TransactionIds {
            transaction_id: uuid.to_string(),
            os_base_id: format!("OS{}{}", now.format("%Y%m%d"), short),
        }
    }
}

/// Inputs that do not come from the session itself.
#[derive(Debug, Clone)]
pub struct FinalizeContext {
    pub store_id: String,
    pub seller: String,
    pub now: DateTime<Utc>,
    pub quote_validity_days: i64,
    pub ids: TransactionIds,
}

/// Borrowed view of the session state being finalized.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutParts<'a> {
    pub kind: TransactionKind,
    pub cart: &'a CollectionCart,
    pub composer: &'a ServiceOrderComposer,
    pub payments: &'a PaymentAllocator,
    pub discount: &'a Discount,
    pub observacoes: Option<&'a str>,
}

fn flatten_items(cart: &CollectionCart) -> Vec<TransactionItem> {
    cart.all_items()
        .map(|(collection, item)| TransactionItem {
            id: item.product_id.clone(),
            categoria: item.category,
            loja: item.store_id.clone(),
            titulo: item.title.clone(),
            marca: item.brand.clone(),
            codigo: item.code.clone(),
            sku: item.sku.clone(),
            preco_unitario: item.unit_price,
            quantidade: item.quantity,
            subtotal: item.line_total(),
            colecao_id: collection.id,
            colecao_nome: collection.name.clone(),
        })
        .collect()
}

fn service_order_document(
    collection: &Collection,
    record: &OsRecord,
    cliente: &ClientSnapshot,
    ctx: &FinalizeContext,
) -> ServiceOrderDocument {
    ServiceOrderDocument {
        id_os: format!("{}-{}", ctx.ids.os_base_id, collection.id),
        id_venda: ctx.ids.transaction_id.clone(),
        loja: ctx.store_id.clone(),
        colecao_id: collection.id,
        colecao_nome: collection.name.clone(),
        cliente: cliente.clone(),
        tipo: record.chosen_type,
        status: record.status,
        data_criacao: ctx.now,
        data_previsao: record.data_prevista_entrega,
        produtos: collection
            .items
            .iter()
            .filter(|i| i.category.requires_service_order())
            .map(|i| OsProduct {
                id: i.product_id.clone(),
                categoria: i.category,
                nome: i.title.clone(),
                marca: i.brand.clone(),
                quantidade: i.quantity,
            })
            .collect(),
        receita: record.receita.clone(),
        observacoes: record.observacoes.clone(),
        laboratorio: record.laboratorio.clone(),
        detalhes_adicionais: record.detalhes_adicionais,
    }
}

/// Builds the transaction record and, for sales, the OS documents.
///
/// `client` must already carry its store id.
pub fn assemble(parts: CheckoutParts<'_>, client: &Client, ctx: &FinalizeContext) -> FinalizedTransaction {
    let totals = compute_totals(parts.cart, parts.discount);
    let cliente = client.snapshot();

    let service_orders: Vec<ServiceOrderDocument> = if parts.kind.is_sale() {
        parts
            .composer
            .documents_to_write(parts.cart)
            .map(|(collection, record)| service_order_document(collection, record, &cliente, ctx))
            .collect()
    } else {
        Vec::new()
    };

    let validade = match parts.kind {
        TransactionKind::Orcamento => {
            Some(ctx.now.date_naive() + Duration::days(ctx.quote_validity_days))
        }
        TransactionKind::Venda => None,
    };

    let record = TransactionRecord {
        id: ctx.ids.transaction_id.clone(),
        tipo: parts.kind,
        loja: ctx.store_id.clone(),
        data_criacao: ctx.now,
        data: ctx.now.date_naive(),
        cliente,
        itens: flatten_items(parts.cart),
        subtotal: totals.subtotal,
        desconto: DiscountRecord {
            valor: totals.discount_amount,
            tipo: parts.discount.kind_label().to_string(),
            valor_original: parts.discount.original_input(),
        },
        total: totals.total,
        formas_pagamento: parts
            .kind
            .is_sale()
            .then(|| parts.payments.entries().to_vec()),
        observacoes: parts
            .observacoes
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string),
        vendedor: ctx.seller.clone(),
        status: TransactionStatus::from(parts.kind),
        validade,
        ordens_servico: service_orders.iter().map(|os| os.id_os.clone()).collect(),
    };

    FinalizedTransaction {
        record,
        service_orders,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::CaptureRequest;
    use crate::service_order::OsForm;
    use crate::types::{Address, Product};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-10T14:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn product(id: &str, category: Category, price: i64) -> Product {
        Product {
            id: id.to_string(),
            store_id: "loja-centro".to_string(),
            category,
            title: format!("Item {}", id),
            brand: Some("Zeiss".to_string()),
            code: None,
            sku: None,
            price: Money::from_cents(price),
            stock: None,
        }
    }

    fn client() -> Client {
        Client {
            id: "cli-1".to_string(),
            name: "Maria Silva".to_string(),
            cpf: "52998224725".to_string(),
            phone: "11987654321".to_string(),
            email: None,
            address: Address::default(),
            photo_url: None,
            dependent_of: None,
            relationship: None,
            has_dependents: false,
            cashback_balance: Money::zero(),
            created_at: now(),
        }
    }

    fn ctx() -> FinalizeContext {
        FinalizeContext {
            store_id: "loja-centro".to_string(),
            seller: "Joana".to_string(),
            now: now(),
            quote_validity_days: 7,
            ids: TransactionIds {
                transaction_id: "tx-1".to_string(),
                os_base_id: "OS20240310ABC".to_string(),
            },
        }
    }

    fn os_form() -> OsForm {
        OsForm {
            tipo: OsType::Completa,
            receita: Prescription::default(),
            laboratorio: "Lab Visão".to_string(),
            status: OsStatus::AguardandoEnvio,
            observacoes: None,
            data_prevista_entrega: now().date_naive() + Duration::days(15),
            detalhes_adicionais: AdditionalDetails::default(),
        }
    }

    #[test]
    fn test_preconditions_order() {
        let empty = CollectionCart::new();
        let composer = ServiceOrderComposer::new();
        let payments = PaymentAllocator::new();

        assert_eq!(
            check_preconditions(TransactionKind::Venda, &empty, false, &composer, &payments),
            Err(CheckoutError::CartEmpty)
        );

        let mut cart = CollectionCart::new();
        cart.add_item(1, &product("a", Category::Armacoes, 100), 1)
            .unwrap();
        assert_eq!(
            check_preconditions(TransactionKind::Venda, &cart, false, &composer, &payments),
            Err(CheckoutError::NoClient)
        );
        assert_eq!(
            check_preconditions(TransactionKind::Venda, &cart, true, &composer, &payments),
            Err(CheckoutError::PendingServiceOrders {
                collections: vec![1]
            })
        );
        // quotes skip the OS and payment checks
        assert_eq!(
            check_preconditions(TransactionKind::Orcamento, &cart, true, &composer, &payments),
            Ok(())
        );
    }

    #[test]
    fn test_payment_checked_after_os() {
        let mut cart = CollectionCart::new();
        cart.add_item(1, &product("a", Category::Armacoes, 100), 1)
            .unwrap();
        let mut composer = ServiceOrderComposer::new();
        composer
            .submit(&cart, 1, os_form(), now().date_naive())
            .unwrap();
        let mut payments = PaymentAllocator::new();
        payments.sync_total(Money::from_cents(100));

        assert_eq!(
            check_preconditions(TransactionKind::Venda, &cart, true, &composer, &payments),
            Err(CheckoutError::PaymentIncomplete)
        );

        payments
            .process(
                0,
                CaptureRequest::Dinheiro {
                    valor_recebido: Money::from_cents(100),
                },
            )
            .unwrap();
        assert_eq!(
            check_preconditions(TransactionKind::Venda, &cart, true, &composer, &payments),
            Ok(())
        );
    }

    #[test]
    fn test_totals_percentage() {
        let mut cart = CollectionCart::new();
        cart.add_item(1, &product("a", Category::Armacoes, 100_000), 1)
            .unwrap();

        let totals = compute_totals(&cart, &Discount::Percentage { bps: 1000 });
        assert_eq!(totals.subtotal.cents(), 100_000);
        assert_eq!(totals.discount_amount.cents(), 10_000);
        assert_eq!(totals.total.cents(), 90_000);
    }

    #[test]
    fn test_value_discount_is_not_clamped() {
        let mut cart = CollectionCart::new();
        cart.add_item(1, &product("a", Category::Lentes, 1_000), 1)
            .unwrap();
        let totals = compute_totals(
            &cart,
            &Discount::Value {
                amount: Money::from_cents(1_500),
            },
        );
        assert_eq!(totals.total.cents(), -500);
    }

    #[test]
    fn test_quote_flattens_items_with_provenance() {
        let mut cart = CollectionCart::new();
        cart.add_item(1, &product("a", Category::Armacoes, 30_000), 1)
            .unwrap();
        cart.add_item(1, &product("b", Category::Lentes, 20_000), 2)
            .unwrap();
        let two = cart.add_collection();
        cart.add_item(two, &product("c", Category::Solares, 50_000), 1)
            .unwrap();

        let composer = ServiceOrderComposer::new();
        let payments = PaymentAllocator::new();
        let parts = CheckoutParts {
            kind: TransactionKind::Orcamento,
            cart: &cart,
            composer: &composer,
            payments: &payments,
            discount: &Discount::Nenhum,
            observacoes: Some("  "),
        };

        let done = assemble(parts, &client(), &ctx());
        let record = done.record;

        let provenance: Vec<(&str, u32)> = record
            .itens
            .iter()
            .map(|i| (i.id.as_str(), i.colecao_id))
            .collect();
        assert_eq!(provenance, vec![("a", 1), ("b", 1), ("c", 2)]);
        assert_eq!(record.itens[2].colecao_nome, "Coleção 2");
        assert_eq!(record.subtotal.cents(), 120_000);
        assert_eq!(record.status, TransactionStatus::AguardandoAprovacao);
        assert_eq!(
            record.validade,
            NaiveDate::from_ymd_opt(2024, 3, 17)
        );
        assert_eq!(record.formas_pagamento, None);
        assert_eq!(record.observacoes, None);
        assert!(done.service_orders.is_empty());
    }

    #[test]
    fn test_sale_builds_one_os_per_completed_collection() {
        let mut cart = CollectionCart::new();
        cart.add_item(1, &product("a", Category::Armacoes, 30_000), 1)
            .unwrap();
        let two = cart.add_collection();
        cart.add_item(two, &product("c", Category::Solares, 50_000), 1)
            .unwrap();

        let mut composer = ServiceOrderComposer::new();
        composer.submit(&cart, 1, os_form(), now().date_naive()).unwrap();
        composer.submit(&cart, two, os_form(), now().date_naive()).unwrap();

        let payments = PaymentAllocator::new();
        let parts = CheckoutParts {
            kind: TransactionKind::Venda,
            cart: &cart,
            composer: &composer,
            payments: &payments,
            discount: &Discount::Nenhum,
            observacoes: None,
        };

        let done = assemble(parts, &client(), &ctx());
        let ids: Vec<&str> = done.service_orders.iter().map(|o| o.id_os.as_str()).collect();
        assert_eq!(ids, vec!["OS20240310ABC-1", "OS20240310ABC-2"]);
        assert_eq!(done.service_orders[0].id_venda, "tx-1");
        assert_eq!(done.service_orders[0].cliente.contato, "11987654321");
        assert_eq!(done.record.ordens_servico.len(), 2);
        assert_eq!(done.record.status, TransactionStatus::Paga);
        assert_eq!(done.record.validade, None);
        assert!(done.record.formas_pagamento.is_some());
    }

    #[test]
    fn test_generated_ids_shape() {
        let ids = TransactionIds::generate(now());
        assert!(ids.os_base_id.starts_with("OS20240310"));
        assert_eq!(ids.os_base_id.len(), 16);
        assert!(Uuid::parse_str(&ids.transaction_id).is_ok());
    }
}
