//! # Error Types
//!
//! Domain-specific error types for sellpoint-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  sellpoint-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Malformed input                                │
//! │                                                                         │
//! │  sellpoint-db errors (separate crate)                                  │
//! │  └── DbError          - Persistence failures                           │
//! │                                                                         │
//! │  sellpoint-service errors                                              │
//! │  └── ServiceError     - What callers see (code + user message)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                  │
//! │                           DbError ──┴──► ServiceError → Caller         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Variants carry the product and amounts involved so the service layer can
//! build a message without another lookup.

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. The calculator and the
/// stock rules return them to the caller; nothing in this crate logs and
/// continues past one.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    ///
    /// ## When This Occurs
    /// - Product ID doesn't exist in the catalog
    /// - Stock adjustment targets an unknown product
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Insufficient stock to complete a subtraction.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (Mouse × 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Mouse", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Sale aborted, stock untouched
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Amount tendered is less than the grand total.
    #[error("Insufficient payment: total {total}, tendered {tendered}")]
    InsufficientPayment { total: Money, tendered: Money },

    /// Checkout attempted with no line items.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cart operation targets a product that is not in the cart.
    #[error("Product {0} is not in the cart")]
    NotInCart(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InsufficientStock error.
    pub fn insufficient_stock(product: impl Into<String>, available: i64, requested: i64) -> Self {
        CoreError::InsufficientStock {
            product: product.into(),
            available,
            requested,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Malformed input, rejected before any rule or query runs.
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

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Invalid format (e.g., invalid UUID, malformed amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Payment method is not one of the recognized values.
    #[error("Unknown payment method '{value}'")]
    InvalidPaymentMethod { value: String },

    /// Stock adjustment mode is not one of add, subtract, set.
    #[error("Unknown stock operation '{value}'")]
    InvalidStockMode { value: String },

    /// Duplicate value (e.g., duplicate product name).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::insufficient_stock("Mouse", 3, 5);
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Mouse: available 3, requested 5"
        );

        let err = CoreError::InsufficientPayment {
            total: Money::from_cents(7138),
            tendered: Money::from_cents(7000),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient payment: total $71.38, tendered $70.00"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::InvalidPaymentMethod {
            value: "bitcoin".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown payment method 'bitcoin'");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
