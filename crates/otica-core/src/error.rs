//! # Error Types
//!
//! Domain-specific error types for otica-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  otica-core errors (this file)                                         │
//! │  ├── ValidationError   - Field-level input failures                    │
//! │  ├── CartError         - Collection / line item operations             │
//! │  ├── ServiceOrderError - OS form open/submit                           │
//! │  ├── PaymentError      - Allocator operations                          │
//! │  │   └── CaptureError  - Method-specific capture dialog checks         │
//! │  ├── CheckoutError     - Finalize preconditions (ordered)              │
//! │  └── CoreError         - Umbrella for all of the above                 │
//! │                                                                         │
//! │  otica-db errors (separate crate)                                      │
//! │  └── DbError           - Store operation failures                      │
//! │                                                                         │
//! │  apps/pos errors                                                       │
//! │  └── ApiError          - What the front end sees (serialized)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant here is recoverable: the in-memory session is left as it was
//! before the failing call.

use thiserror::Error;

use crate::money::Money;
use crate::types::Category;

// =============================================================================
// Core Error
// =============================================================================

/// Umbrella error for business logic failures.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    ServiceOrder(#[from] ServiceOrderError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid CPF, invalid phone).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not one of the discrete values accepted for the field.
    #[error("{value} is not an accepted value for {field}")]
    NotInDomain { field: String, value: String },

    /// Duplicate value (e.g., CPF already registered).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Shorthand for [`ValidationError::InvalidFormat`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Cart Error
// =============================================================================

/// Collection Cart Manager errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Collection {0} not found")]
    CollectionNotFound(u32),

    #[error("Item {product_id} ({category}) not found in collection")]
    ItemNotFound {
        product_id: String,
        category: Category,
    },

    /// Quantity must stay at or above one; removal is a separate action.
    #[error("Quantity must be at least 1, got {requested}")]
    QuantityBelowMinimum { requested: i64 },

    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    #[error("Insufficient stock for {title}: available {available}, requested {requested}")]
    InsufficientStock {
        title: String,
        available: i64,
        requested: i64,
    },
}

// =============================================================================
// Service Order Error
// =============================================================================

/// OS Composer errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceOrderError {
    #[error("Collection {0} not found")]
    CollectionNotFound(u32),

    /// The collection has no frame, lens or sunglasses.
    #[error("Collection {0} has no items that require a service order")]
    NotRequired(u32),

    #[error("Service order form is invalid: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Payment Errors
// =============================================================================

/// Payment Allocator errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("Payment entry {0} not found")]
    EntryNotFound(usize),

    /// Auto mode sizes exactly one entry to the total.
    #[error("Automatic distribution allows a single payment method; switch to manual first")]
    AutoModeSingleEntry,

    /// Auto mode owns the entry value.
    #[error("Payment value is set automatically; switch to manual to edit it")]
    ValueLockedInAutoMode,

    #[error("Payment value cannot be negative")]
    NegativeValue,

    #[error("Capture details are for {got}, entry uses {expected}")]
    MethodMismatch { expected: String, got: String },

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// Method-specific capture dialog validation.
///
/// These block confirmation locally and never reach the finalizer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Received amount {received} is less than the amount due {due}")]
    InsufficientCash { received: Money, due: Money },

    #[error("Cashback balance {available} does not cover {due}")]
    InsufficientCashback { available: Money, due: Money },

    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} is invalid: {reason}")]
    Invalid { field: String, reason: String },
}

impl CaptureError {
    pub(crate) fn required(field: &str) -> Self {
        CaptureError::Required {
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        CaptureError::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Checkout Error
// =============================================================================

/// Finalize preconditions, checked in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("Cart empty: add at least one item")]
    CartEmpty,

    #[error("No client selected")]
    NoClient,

    #[error("Pending OS forms for collections {collections:?}")]
    PendingServiceOrders { collections: Vec<u32> },

    #[error("Payment incomplete")]
    PaymentIncomplete,
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CartError::InsufficientStock {
            title: "Ray-Ban RB2140".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Ray-Ban RB2140: available 3, requested 5"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("laboratorio");
        assert_eq!(err.to_string(), "laboratorio is required");

        let err = ValidationError::NotInDomain {
            field: "esfera".to_string(),
            value: "+6.10".to_string(),
        };
        assert_eq!(err.to_string(), "+6.10 is not an accepted value for esfera");
    }

    #[test]
    fn test_capture_error_converts_to_core_error() {
        let capture = CaptureError::required("data_vencimento");
        let payment: PaymentError = capture.into();
        let core: CoreError = payment.into();
        assert!(matches!(
            core,
            CoreError::Payment(PaymentError::Capture(CaptureError::Required { .. }))
        ));
    }

    #[test]
    fn test_pending_os_message_lists_collections() {
        let err = CheckoutError::PendingServiceOrders {
            collections: vec![1, 3],
        };
        assert_eq!(err.to_string(), "Pending OS forms for collections [1, 3]");
    }
}
