//! # API Error Type
//!
//! Unified error type for POS commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Otica POS                              │
//! │                                                                         │
//! │  Front end                   Rust Backend                               │
//! │  ─────────                   ────────────                               │
//! │                                                                         │
//! │  { "command": "finalize_transaction" }                                  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Precondition? ─── CheckoutError::NoClient ───────┐             │  │
//! │  │         │                                          │             │  │
//! │  │         ▼                                          ▼             │  │
//! │  │  Write failed? ─── DbError (message verbatim) ── ApiError ─────►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  Lookups never get here: a failed search answers with a warning and    │
//! │  an empty result instead.                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error leaves the in-memory session as it was before the command.

use std::fmt;

use otica_core::{CheckoutError, CoreError, ValidationError};
use otica_db::DbError;
use serde::Serialize;

use crate::state::ConfigError;

/// API error returned from POS commands.
///
/// ## Serialization
/// This is what the front end receives when a command fails:
/// ```json
/// {
///   "code": "CHECKOUT_ERROR",
///   "message": "Pending OS forms for collections [2]"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Store operation failed
    DatabaseError,

    /// Collection or line item operation failed
    CartError,

    /// OS form could not be opened or submitted
    ServiceOrderError,

    /// Payment allocation or capture failed
    PaymentError,

    /// A finalize precondition is not met
    CheckoutError,

    /// Configuration could not be loaded
    ConfigError,

    /// Unknown command or malformed request
    BadRequest,

    /// Internal error
    Internal,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::BadRequest, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// A failed finalize write. The store's own message reaches the operator
    /// unchanged.
    pub fn write_failed(err: DbError) -> Self {
        tracing::error!(error = %err, "Finalize write failed");
        ApiError::new(ErrorCode::DatabaseError, err.to_string())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::InvalidDocument { collection, message } => {
                tracing::error!(%collection, "Invalid document: {}", message);
                ApiError::new(ErrorCode::DatabaseError, "Stored document is invalid")
            }
            DbError::Blob(e) => {
                tracing::error!("Blob storage failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "File upload failed")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::Cart(_) => ErrorCode::CartError,
            CoreError::ServiceOrder(_) => ErrorCode::ServiceOrderError,
            CoreError::Payment(_) => ErrorCode::PaymentError,
            CoreError::Checkout(_) => ErrorCode::CheckoutError,
            CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::new(ErrorCode::CheckoutError, err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::new(ErrorCode::ConfigError, err.to_string())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use otica_core::CartError;

    #[test]
    fn test_serializes_code_and_message() {
        let err = ApiError::not_found("Client", "c-1");
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Client not found: c-1");
    }

    #[test]
    fn test_duplicate_cpf_is_a_validation_error() {
        let err: ApiError = DbError::duplicate("cpf", "529.982.247-25").into();

        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("529.982.247-25"));
    }

    #[test]
    fn test_query_failures_hide_details() {
        let err: ApiError = DbError::QueryFailed("disk I/O error at page 7".into()).into();

        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Database operation failed");
    }

    #[test]
    fn test_write_failures_pass_message_verbatim() {
        let db_err = DbError::TransactionFailed("database is locked".into());
        let expected = db_err.to_string();

        let err = ApiError::write_failed(db_err);

        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, expected);
    }

    #[test]
    fn test_checkout_errors_keep_their_message() {
        let err: ApiError = CheckoutError::PendingServiceOrders { collections: vec![2] }.into();
        assert_eq!(err.code, ErrorCode::CheckoutError);
        assert!(err.message.contains("Pending OS forms"));

        let core: ApiError = CoreError::from(CheckoutError::NoClient).into();
        assert_eq!(core, ApiError::from(CheckoutError::NoClient));
    }

    #[test]
    fn test_cart_errors_map_to_cart_code() {
        let err: ApiError = CoreError::from(CartError::CollectionNotFound(9)).into();
        assert_eq!(err.code, ErrorCode::CartError);
    }
}
