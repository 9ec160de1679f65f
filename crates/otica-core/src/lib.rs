//! # otica-core: Pure Business Logic for Otica POS
//!
//! This crate holds the sale/quote workflow of an optical retail counter as
//! pure, deterministic code. Nothing here touches the document store, the blob
//! store, or the network; `otica-db` and `apps/pos` do that.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Otica POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web front end (out of scope)                 │   │
//! │  │   Client search ─► Collections ─► OS forms ─► Payments ─► Save  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 apps/pos (commands + state)                     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ otica-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   cart ─► service_order ─► payment ─► checkout                  │   │
//! │  │   catalog / directory (lookup filtering)                        │   │
//! │  │   money / validation / prescription / document                  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 otica-db (document + blob stores)               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Client, Category, Discount, ...)
//! - [`money`] - Integer centavo arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - CPF check digits and field rules
//! - [`cart`] - Collection Cart Manager
//! - [`catalog`] / [`directory`] - Product and client lookup filtering
//! - [`registration`] - Client registration form validation
//! - [`prescription`] - Discrete optometric value domains
//! - [`service_order`] - OS recommendation, forms, completion gate
//! - [`payment`] - Payment Allocator and capture validation
//! - [`checkout`] - Finalizer preconditions, totals, record assembly
//! - [`session`] - One in-progress sale/quote tying the above together
//! - [`document`] - Sanitization applied before every store write
//!
//! ## Example Usage
//!
//! ```rust
//! use otica_core::money::Money;
//! use otica_core::types::Discount;
//!
//! let subtotal = Money::from_cents(100_000); // R$ 1.000,00
//! let discount = Discount::Percentage { bps: 1000 }; // 10%
//! assert_eq!(discount.amount_for(subtotal).cents(), 10_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod directory;
pub mod document;
pub mod error;
pub mod money;
pub mod payment;
pub mod prescription;
pub mod registration;
pub mod service_order;
pub mod session;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{
    CaptureError, CartError, CheckoutError, CoreError, CoreResult, PaymentError,
    ServiceOrderError, ValidationError,
};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single line item.
///
/// Guards against typing 1000 instead of 10 at the counter.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Default number of rows returned by product and client lookups.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Days between OS creation and the default expected delivery date.
pub const OS_DELIVERY_DAYS: i64 = 15;

/// Default number of days a quote stays valid.
pub const DEFAULT_QUOTE_VALIDITY_DAYS: i64 = 7;
