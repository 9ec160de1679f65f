//! # Session State
//!
//! The one in-progress sale or quote at the counter.
//!
//! ## Thread Safety
//! The session is wrapped in `Arc<Mutex<T>>`: commands may arrive
//! concurrently, but only one of them mutates the session at a time.
//! The lock is never held across an `.await`; commands that touch the
//! store copy what they need out of the session first.
//!
//! ## Session Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Session State Operations                             │
//! │                                                                         │
//! │  Operator Action          Command                 Session Change        │
//! │  ───────────────          ───────                 ──────────────        │
//! │                                                                         │
//! │  Pick client ────────────► select_client() ─────► client = Some(..)    │
//! │  New collection ─────────► add_collection() ────► collections.push()   │
//! │  Click product ──────────► add_to_cart() ───────► items.push / qty += n│
//! │  Fill OS form ───────────► submit_os_form() ────► osData[id] completed │
//! │  Confirm payment ────────► process_payment() ───► entry.processed      │
//! │  Save ───────────────────► finalize() ──────────► reset()              │
//! │                                                                         │
//! │  Lookups issue a ticket; only the newest ticket's answer is shown.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use otica_core::directory::LookupSequencer;
use otica_core::session::SaleSession;
use otica_core::TransactionKind;

/// Session state managed by the app.
///
/// ## Usage
/// ```rust,ignore
/// let totals = session.with_session(|s| s.summary());
/// session.with_session_mut(|s| s.add_collection());
/// ```
#[derive(Debug, Clone)]
pub struct SessionState {
    session: Arc<Mutex<SaleSession>>,
    client_lookups: Arc<LookupSequencer>,
}

impl SessionState {
    /// Creates a session with one empty collection.
    pub fn new(kind: TransactionKind, os_delivery_days: i64) -> Self {
        SessionState {
            session: Arc::new(Mutex::new(SaleSession::with_delivery_days(
                kind,
                os_delivery_days,
            ))),
            client_lookups: Arc::new(LookupSequencer::new()),
        }
    }

    /// Session mutations validate before they change anything, so a guard
    /// poisoned by a panicking command still holds a consistent session.
    fn lock(&self) -> MutexGuard<'_, SaleSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Executes a function with read access to the session.
    pub fn with_session<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&SaleSession) -> R,
    {
        let session = self.lock();
        f(&session)
    }

    /// Executes a function with write access to the session.
    pub fn with_session_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut SaleSession) -> R,
    {
        let mut session = self.lock();
        f(&mut session)
    }

    /// Sequencer for debounced client lookups.
    pub fn client_lookups(&self) -> &LookupSequencer {
        &self.client_lookups
    }
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::new(TransactionKind::Venda, otica_core::OS_DELIVERY_DAYS)
    }
}
