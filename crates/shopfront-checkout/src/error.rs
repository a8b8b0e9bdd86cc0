//! # Checkout Error Type
//!
//! The single caller-facing error union for the checkout surface.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Error Flow at the Service Boundary                      │
//! │                                                                         │
//! │  LedgerError ──┐                                                        │
//! │  OrderError  ──┤                                                        │
//! │  DbError     ──┼──► CheckoutError { code, message } ──► transport       │
//! │  CoreError   ──┤         │                                              │
//! │  Validation  ──┘         └── code: machine-readable reason enum         │
//! │                              message: human-displayable text            │
//! │                                                                         │
//! │  Infrastructure details (SQL text, pool state) are logged here and     │
//! │  replaced with a generic storage message — they never reach callers.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use shopfront_core::{CoreError, ValidationError};
use shopfront_db::{DbError, LedgerError, OrderError};

/// Error returned from the checkout service surface.
///
/// Serialized form:
/// ```json
/// { "code": "INSUFFICIENT_STOCK", "message": "insufficient stock for ..." }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutError {
    /// Machine-readable reason for programmatic handling
    pub code: CheckoutErrorCode,

    /// Human-readable message for display
    pub message: String,
}

/// Reason codes for checkout surface errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutErrorCode {
    /// Malformed input, rejected before any side effect
    Validation,

    /// A referenced entity does not exist
    NotFound,

    /// Checkout attempted with no cart lines
    EmptyCart,

    /// A cart line's product is missing or not sellable
    ProductUnavailable,

    /// The supplied promotion code resolves to nothing
    PromotionNotFound,

    /// The promotion exists but failed an eligibility check
    PromotionIneligible,

    /// One or more lines could not be reserved
    InsufficientStock,

    /// Stock adjustment would drive a level negative
    NegativeStock,

    /// The order lifecycle table rejected the transition
    InvalidTransition,

    /// Persistence failed; the attempt was rolled back
    Storage,
}

impl CheckoutError {
    /// Creates a new checkout error.
    pub fn new(code: CheckoutErrorCode, message: impl Into<String>) -> Self {
        CheckoutError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        CheckoutError::new(
            CheckoutErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        CheckoutError::new(CheckoutErrorCode::Validation, message)
    }

    /// Creates a storage error with a generic message.
    pub fn storage() -> Self {
        CheckoutError::new(CheckoutErrorCode::Storage, "storage operation failed")
    }
}

/// Converts ledger outcomes to checkout errors.
impl From<LedgerError> for CheckoutError {
    fn from(err: LedgerError) -> Self {
        match &err {
            LedgerError::InsufficientStock { .. } => {
                CheckoutError::new(CheckoutErrorCode::InsufficientStock, err.to_string())
            }
            LedgerError::NegativeStock { .. } => {
                CheckoutError::new(CheckoutErrorCode::NegativeStock, err.to_string())
            }
            LedgerError::UnknownProduct { .. } => {
                CheckoutError::new(CheckoutErrorCode::NotFound, err.to_string())
            }
            LedgerError::AlreadySettled { .. } => {
                CheckoutError::new(CheckoutErrorCode::Validation, err.to_string())
            }
            LedgerError::InvalidQuantity { .. } => {
                CheckoutError::new(CheckoutErrorCode::Validation, err.to_string())
            }
            LedgerError::Db(db) => {
                tracing::error!(error = %db, "Ledger storage failure");
                CheckoutError::storage()
            }
        }
    }
}

/// Converts order-store outcomes to checkout errors.
impl From<OrderError> for CheckoutError {
    fn from(err: OrderError) -> Self {
        match &err {
            OrderError::NotFound { order_id } => CheckoutError::not_found("Order", order_id),
            OrderError::InvalidTransition(_) => {
                CheckoutError::new(CheckoutErrorCode::InvalidTransition, err.to_string())
            }
            OrderError::Db(db) => {
                tracing::error!(error = %db, "Order storage failure");
                CheckoutError::storage()
            }
        }
    }
}

/// Converts database errors to checkout errors.
///
/// NotFound keeps its context; everything else is logged and replaced with
/// a generic storage message.
impl From<DbError> for CheckoutError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CheckoutError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => CheckoutError::validation(format!(
                "{} '{}' already exists",
                field, value
            )),
            other => {
                tracing::error!(error = %other, "Storage failure");
                CheckoutError::storage()
            }
        }
    }
}

/// Converts core domain errors to checkout errors.
impl From<CoreError> for CheckoutError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::ProductNotFound(_) => CheckoutErrorCode::NotFound,
            CoreError::ProductNotSellable(_) => CheckoutErrorCode::ProductUnavailable,
            CoreError::EmptyCart => CheckoutErrorCode::EmptyCart,
            CoreError::InsufficientStock { .. } => CheckoutErrorCode::InsufficientStock,
            CoreError::NegativeStock { .. } => CheckoutErrorCode::NegativeStock,
            CoreError::Ineligible(_) => CheckoutErrorCode::PromotionIneligible,
            CoreError::InvalidTransition(_) => CheckoutErrorCode::InvalidTransition,
            CoreError::Validation(_) => CheckoutErrorCode::Validation,
        };
        CheckoutError::new(code, err.to_string())
    }
}

impl From<ValidationError> for CheckoutError {
    fn from(err: ValidationError) -> Self {
        CheckoutError::validation(err.to_string())
    }
}

impl std::fmt::Display for CheckoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for CheckoutError {}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_insufficient_stock_maps_with_detail() {
        let err: CheckoutError = LedgerError::InsufficientStock {
            product_id: "prod-b".to_string(),
            available: 0,
            requested: 1,
        }
        .into();

        assert_eq!(err.code, CheckoutErrorCode::InsufficientStock);
        assert!(err.message.contains("prod-b"));
    }

    #[test]
    fn test_db_internals_do_not_leak() {
        let err: CheckoutError =
            DbError::QueryFailed("near \"SELEC\": syntax error".to_string()).into();

        assert_eq!(err.code, CheckoutErrorCode::Storage);
        assert!(!err.message.contains("SELEC"));
    }

    #[test]
    fn test_serialized_shape() {
        let err = CheckoutError::new(CheckoutErrorCode::EmptyCart, "cart is empty");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "EMPTY_CART");
        assert_eq!(json["message"], "cart is empty");
    }
}
