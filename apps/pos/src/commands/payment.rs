//! # Payment Commands
//!
//! Splitting the total across payment methods.
//!
//! ## Distribution Modes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  auto    one entry, its value always equals the total                  │
//! │          (items or discount change ─► entry follows)                   │
//! │                                                                         │
//! │  manual  any number of entries, values typed by the operator           │
//! │          new entry defaults to dinheiro with the remaining value       │
//! │                                                                         │
//! │  Every entry must be confirmed (process_payment) before a sale saves.  │
//! │  Changing an entry's method or value drops its confirmation.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use otica_core::payment::{CaptureRequest, DistributionMode, PaymentEntry, PaymentMethod};
use otica_core::session::SaleSession;
use otica_core::Money;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::SessionState;

/// Payment panel state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentsResponse {
    pub mode: DistributionMode,
    pub entries: Vec<PaymentEntry>,
    pub total: Money,
    pub allocated: Money,
    pub remaining: Money,
    pub complete: bool,
}

impl From<&SaleSession> for PaymentsResponse {
    fn from(session: &SaleSession) -> Self {
        let payments = session.payments();
        PaymentsResponse {
            mode: payments.mode(),
            entries: payments.entries().to_vec(),
            total: payments.total(),
            allocated: payments.total_allocated(),
            remaining: payments.remaining(),
            complete: payments.is_complete(),
        }
    }
}

pub fn get_payments(session: &SessionState) -> PaymentsResponse {
    debug!("get_payments command");
    session.with_session(|s| PaymentsResponse::from(s))
}

/// Switches between auto and manual distribution.
///
/// Back to auto keeps only the first entry, set to the total.
pub fn set_payment_mode(session: &SessionState, mode: DistributionMode) -> PaymentsResponse {
    debug!(?mode, "set_payment_mode command");
    session.with_session_mut(|s| {
        s.set_payment_mode(mode);
        PaymentsResponse::from(&*s)
    })
}

/// Appends a dinheiro entry holding the remaining value.
pub fn add_payment(session: &SessionState) -> Result<PaymentsResponse, ApiError> {
    debug!("add_payment command");
    session.with_session_mut(|s| {
        s.add_payment()?;
        Ok(PaymentsResponse::from(&*s))
    })
}

pub fn remove_payment(session: &SessionState, index: usize) -> Result<PaymentsResponse, ApiError> {
    debug!(index, "remove_payment command");
    session.with_session_mut(|s| {
        s.remove_payment(index)?;
        Ok(PaymentsResponse::from(&*s))
    })
}

/// Changes an entry's method. The entry must be confirmed again.
pub fn change_payment_method(
    session: &SessionState,
    index: usize,
    method: PaymentMethod,
) -> Result<PaymentsResponse, ApiError> {
    debug!(index, %method, "change_payment_method command");
    session.with_session_mut(|s| {
        s.change_payment_method(index, method)?;
        Ok(PaymentsResponse::from(&*s))
    })
}

/// Sets an entry's value (manual mode).
pub fn set_payment_value(
    session: &SessionState,
    index: usize,
    value: Money,
) -> Result<PaymentsResponse, ApiError> {
    debug!(index, %value, "set_payment_value command");
    session.with_session_mut(|s| {
        s.set_payment_value(index, value)?;
        Ok(PaymentsResponse::from(&*s))
    })
}

/// Confirms an entry with what its capture dialog collected.
///
/// ## Errors
/// The dialog's own checks (cash received below the value, missing boleto
/// due date, empty crypto address, ...). The entry stays unconfirmed.
pub fn process_payment(
    session: &SessionState,
    index: usize,
    request: CaptureRequest,
) -> Result<PaymentsResponse, ApiError> {
    debug!(index, method = %request.method(), "process_payment command");
    session.with_session_mut(|s| {
        let entry = s.process_payment(index, request)?;
        info!(index, method = %entry.method, value = %entry.value, "Payment confirmed");
        Ok(PaymentsResponse::from(&*s))
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use otica_core::{Category, Discount, Product};

    fn session_with_total(cents: i64) -> SessionState {
        let state = SessionState::default();
        state.with_session_mut(|s| {
            let id = s.cart().active_id();
            let product = Product {
                id: "l1".to_string(),
                store_id: "loja-01".to_string(),
                category: Category::Lentes,
                title: "Lente".to_string(),
                brand: None,
                code: None,
                sku: None,
                price: Money::from_cents(cents),
                stock: Some(10),
            };
            s.add_item(id, &product, 1).unwrap();
        });
        state
    }

    #[test]
    fn test_auto_entry_follows_discount() {
        let state = session_with_total(50_000);
        assert_eq!(get_payments(&state).entries[0].value, Money::from_cents(50_000));

        crate::commands::cart::set_discount(
            &state,
            Discount::Value {
                amount: Money::from_cents(5_000),
            },
        )
        .unwrap();

        let payments = get_payments(&state);
        assert_eq!(payments.entries.len(), 1);
        assert_eq!(payments.entries[0].value, Money::from_cents(45_000));
    }

    #[test]
    fn test_cash_below_value_is_rejected() {
        let state = session_with_total(50_000);

        let err = process_payment(
            &state,
            0,
            CaptureRequest::Dinheiro {
                valor_recebido: Money::from_cents(40_000),
            },
        )
        .unwrap_err();

        assert_eq!(err.code, ErrorCode::PaymentError);
        assert!(!get_payments(&state).complete);
    }

    #[test]
    fn test_manual_split_completes_when_all_processed() {
        let state = session_with_total(50_000);
        set_payment_mode(&state, DistributionMode::Manual);
        set_payment_value(&state, 0, Money::from_cents(20_000)).unwrap();
        let payments = add_payment(&state).unwrap();
        assert_eq!(payments.entries[1].value, Money::from_cents(30_000));
        assert_eq!(payments.remaining, Money::zero());

        change_payment_method(&state, 1, PaymentMethod::Pix).unwrap();
        process_payment(
            &state,
            0,
            CaptureRequest::Dinheiro {
                valor_recebido: Money::from_cents(20_000),
            },
        )
        .unwrap();
        let payments = process_payment(
            &state,
            1,
            CaptureRequest::Pix {
                valor_confirmado: Money::from_cents(30_000),
                id_transacao: Some("E1234".to_string()),
            },
        )
        .unwrap();

        assert!(payments.complete);
        assert_eq!(payments.allocated, Money::from_cents(50_000));
    }

    #[test]
    fn test_second_entry_rejected_in_auto_mode() {
        let state = session_with_total(10_000);
        assert!(add_payment(&state).is_err());
        assert_eq!(get_payments(&state).entries.len(), 1);
    }
}
