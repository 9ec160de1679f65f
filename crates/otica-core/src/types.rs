//! # Domain Types
//!
//! Core domain types shared by every workflow component.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │     Client      │   │    Discount     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id + category  │   │  id / cpf       │   │  None           │       │
//! │  │  titulo, marca  │   │  dependentesDe  │   │  Value(Money)   │       │
//! │  │  preco          │   │  temDependentes │   │  Percentage(bp) │       │
//! │  │  quantidade?    │   │  endereco       │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────────┐                         │
//! │  │    Category     │   │   TransactionKind    │                         │
//! │  │  armacoes       │   │   venda | orcamento  │                         │
//! │  │  lentes         │   └──────────────────────┘                         │
//! │  │  solares        │                                                    │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rust field names are English; the serde names are the document-store
//! field names shared with the rest of the chain's systems.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::format_cpf;

// =============================================================================
// Category
// =============================================================================

/// Inventory category. Part of a line item's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Frames.
    Armacoes,
    /// Lenses.
    Lentes,
    /// Sunglasses.
    Solares,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Armacoes, Category::Lentes, Category::Solares];

    /// Store path segment / serialized name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Category::Armacoes => "armacoes",
            Category::Lentes => "lentes",
            Category::Solares => "solares",
        }
    }

    /// Whether an item of this category needs a service order.
    ///
    /// Sunglasses are always eligible, prescription or not.
    pub const fn requires_service_order(&self) -> bool {
        matches!(
            self,
            Category::Armacoes | Category::Lentes | Category::Solares
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "armacoes" => Ok(Category::Armacoes),
            "lentes" => Ok(Category::Lentes),
            "solares" => Ok(Category::Solares),
            other => Err(ValidationError::NotInDomain {
                field: "categoria".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// An inventory record as read from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: String,

    #[serde(rename = "loja")]
    pub store_id: String,

    #[serde(rename = "categoria")]
    pub category: Category,

    #[serde(rename = "titulo")]
    pub title: String,

    #[serde(rename = "marca", default)]
    pub brand: Option<String>,

    #[serde(rename = "codigo", default)]
    pub code: Option<String>,

    #[serde(default)]
    pub sku: Option<String>,

    /// Current sale price.
    #[serde(rename = "preco")]
    pub price: Money,

    /// Available quantity. `None` when the store does not track stock for it.
    #[serde(rename = "quantidade", default)]
    pub stock: Option<i64>,
}

impl Product {
    /// True when stock is tracked and nothing is left.
    pub fn is_out_of_stock(&self) -> bool {
        matches!(self.stock, Some(q) if q <= 0)
    }
}

// =============================================================================
// Client
// =============================================================================

/// Postal address sub-record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Address {
    #[serde(default)]
    pub cep: Option<String>,
    #[serde(default)]
    pub logradouro: Option<String>,
    #[serde(default)]
    pub numero: Option<String>,
    #[serde(default)]
    pub complemento: Option<String>,
    #[serde(default)]
    pub bairro: Option<String>,
    #[serde(default)]
    pub cidade: Option<String>,
    #[serde(default)]
    pub estado: Option<String>,
}

/// A titular or dependent client record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,

    #[serde(rename = "nome")]
    pub name: String,

    /// Digits only.
    pub cpf: String,

    #[serde(rename = "telefone")]
    pub phone: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(rename = "endereco", default)]
    pub address: Address,

    #[serde(rename = "fotoUrl", default)]
    pub photo_url: Option<String>,

    /// Titular id when this record is a dependent.
    #[serde(rename = "dependentesDe", default)]
    pub dependent_of: Option<String>,

    /// Relationship label to the titular (filho, conjuge, ...).
    #[serde(rename = "parentesco", default)]
    pub relationship: Option<String>,

    #[serde(rename = "temDependentes", default)]
    pub has_dependents: bool,

    /// Cashback available to spend on future purchases.
    #[serde(rename = "saldoCashback", default)]
    pub cashback_balance: Money,

    #[serde(rename = "dataCadastro")]
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Client {
    pub fn is_dependent(&self) -> bool {
        self.dependent_of.is_some()
    }

    /// Denormalized copy embedded into transaction and OS documents.
    pub fn snapshot(&self) -> ClientSnapshot {
        ClientSnapshot {
            id: self.id.clone(),
            nome: self.name.clone(),
            cpf: self.cpf.clone(),
            contato: self.phone.clone(),
        }
    }

    /// CPF as `NNN.NNN.NNN-NN`.
    pub fn formatted_cpf(&self) -> String {
        format_cpf(&self.cpf)
    }
}

/// The client attached to the in-progress transaction.
///
/// A temporary client was typed in at the counter and has no store id yet;
/// the finalizer registers it before writing anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SelectedClient {
    pub client: Client,
    pub is_temporary: bool,
}

impl SelectedClient {
    pub fn existing(client: Client) -> Self {
        SelectedClient {
            client,
            is_temporary: false,
        }
    }

    pub fn temporary(client: Client) -> Self {
        SelectedClient {
            client,
            is_temporary: true,
        }
    }
}

/// Client fields frozen into a written document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClientSnapshot {
    pub id: String,
    pub nome: String,
    pub cpf: String,
    pub contato: String,
}

// =============================================================================
// Transaction Kind & Status
// =============================================================================

/// Whether the workflow produces a sale or a quote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    #[default]
    Venda,
    Orcamento,
}

impl TransactionKind {
    pub fn is_sale(&self) -> bool {
        matches!(self, TransactionKind::Venda)
    }
}

/// Status stamped on the written transaction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Completed sale.
    Paga,
    /// Quote awaiting the client's approval.
    AguardandoAprovacao,
}

impl From<TransactionKind> for TransactionStatus {
    fn from(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::Venda => TransactionStatus::Paga,
            TransactionKind::Orcamento => TransactionStatus::AguardandoAprovacao,
        }
    }
}

// =============================================================================
// Discount
// =============================================================================

/// Discount applied to the whole transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "tipo", rename_all = "lowercase")]
pub enum Discount {
    #[default]
    Nenhum,
    /// Fixed amount off.
    #[serde(rename = "valor")]
    Value { amount: Money },
    /// Basis points of the subtotal (1000 = 10%).
    #[serde(rename = "percentual")]
    Percentage { bps: u32 },
}

impl Discount {
    /// Amount taken off `subtotal`.
    ///
    /// Value discounts are used as-is; a value larger than the subtotal
    /// yields a negative total rather than being clamped.
    pub fn amount_for(&self, subtotal: Money) -> Money {
        match self {
            Discount::Nenhum => Money::zero(),
            Discount::Value { amount } => *amount,
            Discount::Percentage { bps } => subtotal.percentage(*bps),
        }
    }

    /// Stored discount type label.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Discount::Nenhum => "nenhum",
            Discount::Value { .. } => "valor",
            Discount::Percentage { .. } => "percentual",
        }
    }

    /// The operator's original input: centavos for value, bps for percentage.
    pub fn original_input(&self) -> i64 {
        match self {
            Discount::Nenhum => 0,
            Discount::Value { amount } => amount.cents(),
            Discount::Percentage { bps } => *bps as i64,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
