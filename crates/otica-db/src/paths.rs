//! # Store Paths
//!
//! Collection paths shared with the chain's other systems.
//!
//! ```text
//! lojas/{loja}/estoque/{categoria}    inventory per store and category
//! clientes                            client directory (all stores)
//! lojas/{loja}/vendas                 completed sales
//! lojas/{loja}/orcamentos             quotes
//! lojas/{loja}/servicos               service orders
//! ```

use otica_core::{Category, TransactionKind};

/// Shared client directory.
pub const CLIENTS: &str = "clientes";

pub fn inventory(store_id: &str, category: Category) -> String {
    format!("lojas/{store_id}/estoque/{}", category.as_str())
}

pub fn sales(store_id: &str) -> String {
    format!("lojas/{store_id}/vendas")
}

pub fn quotes(store_id: &str) -> String {
    format!("lojas/{store_id}/orcamentos")
}

pub fn service_orders(store_id: &str) -> String {
    format!("lojas/{store_id}/servicos")
}

/// Where a finalized transaction of `kind` is written.
pub fn transactions(store_id: &str, kind: TransactionKind) -> String {
    match kind {
        TransactionKind::Venda => sales(store_id),
        TransactionKind::Orcamento => quotes(store_id),
    }
}

/// Blob path of a client's photo.
pub fn client_photo(client_id: &str, extension: &str) -> String {
    format!("{CLIENTS}/{client_id}/foto.{extension}")
}
