//! # POS Commands Module
//!
//! All commands exposed to the counter front end.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs            ◄─── You are here (exports)
//! ├── product.rs        ◄─── Catalog lookup
//! ├── client.rs         ◄─── Client lookup, registration, selection
//! ├── cart.rs           ◄─── Collections, items, discount
//! ├── service_order.rs  ◄─── OS forms per collection
//! ├── payment.rs        ◄─── Payment entries and capture
//! ├── sale.rs           ◄─── Finalize, saved sales and quotes
//! └── config.rs         ◄─── Configuration retrieval
//! ```
//!
//! ## State Injection
//! Each command declares only the state it needs:
//! ```rust,ignore
//! // Only needs the session
//! fn get_cart(session: &SessionState)
//!
//! // Needs the store and the session
//! async fn select_client(db: &DbState, session: &SessionState, ...)
//!
//! // Needs everything
//! async fn finalize_transaction(db: &DbState, session: &SessionState, config: &ConfigState)
//! ```
//!
//! Commands return `Result<T, ApiError>` except lookups, which always
//! answer and report failures inline.

pub mod cart;
pub mod client;
pub mod config;
pub mod payment;
pub mod product;
pub mod sale;
pub mod service_order;
