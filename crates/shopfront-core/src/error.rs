//! # Error Types
//!
//! Domain-specific error types for shopfront-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  shopfront-core errors (this file)                                     │
//! │  ├── CoreError        - Business-rule violations                       │
//! │  └── ValidationError  - Malformed input, rejected before side effects  │
//! │                                                                         │
//! │  shopfront-db errors (separate crate)                                  │
//! │  ├── DbError          - Infrastructure (pool, SQL, migrations)         │
//! │  ├── LedgerError      - Inventory outcomes (insufficient stock, ...)   │
//! │  └── OrderError       - Order store outcomes (illegal transitions)     │
//! │                                                                         │
//! │  shopfront-checkout (service boundary)                                 │
//! │  └── CheckoutError    - The single caller-facing union                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. `thiserror` derives, never manual impls
//! 2. Context in every message (product id, quantities, limits)
//! 3. Errors are enum variants, never bare strings
//! 4. Business-rule failures are expected outcomes, not panics

use thiserror::Error;

use crate::eligibility::IneligibleReason;
use crate::lifecycle::TransitionError;

// =============================================================================
// Core Error
// =============================================================================

/// Business-rule violations in the checkout domain.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found or is no longer listed.
    #[error("product not found: {0}")]
    ProductNotFound(String),

    /// Product exists but may not currently be sold.
    #[error("product is not sellable: {0}")]
    ProductNotSellable(String),

    /// Checkout was attempted against a cart with no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// A reservation could not be satisfied.
    ///
    /// This is a normal, expected outcome of checkout (not exceptional)
    /// and carries the facts the caller needs to report per line.
    #[error("insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// A stock adjustment would drive the level negative.
    #[error("stock for {product_id} cannot go negative (available {available}, delta {delta})")]
    NegativeStock {
        product_id: String,
        available: i64,
        delta: i64,
    },

    /// Promotion exists but failed an eligibility check.
    #[error("promotion not eligible: {0}")]
    Ineligible(#[from] IneligibleReason),

    /// Illegal order status transition.
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    /// Validation error (wraps ValidationError).
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These reject malformed input before business logic runs; nothing has
/// been reserved, persisted, or counted when one of these is returned.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
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
        let err = CoreError::InsufficientStock {
            product_id: "prod-b".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock for prod-b: available 3, requested 5"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "promotion code".to_string(),
        };
        assert_eq!(err.to_string(), "promotion code is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_ineligible_reason_converts() {
        let core_err: CoreError = IneligibleReason::UsageLimitReached.into();
        assert_eq!(
            core_err.to_string(),
            "promotion not eligible: promotion usage limit reached"
        );
    }
}
