//! # Service Error Type
//!
//! The one error type callers of `sellpoint-service` see.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Sellpoint                              │
//! │                                                                         │
//! │  CheckoutService::checkout()                                           │
//! │         │                                                               │
//! │         ├── CoreError (empty cart, insufficient payment/stock, ...)    │
//! │         │        └──► ServiceError::Core                                │
//! │         │                                                               │
//! │         ├── DbError (connection, constraint, transaction)              │
//! │         │        └──► ServiceError::Persistence                         │
//! │         │                                                               │
//! │         └── config / notifier problems                                 │
//! │                  └──► ServiceError::Config / ::Notification             │
//! │                                                                         │
//! │  Caller:                                                               │
//! │    err.code()          → ErrorCode::InsufficientStock (for branching)  │
//! │    err.user_message()  → "Not enough Mouse in stock: 3 left, 5 ..."    │
//! │    err.to_string()     → full detail, for logs                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use sellpoint_core::{CoreError, ValidationError};
use sellpoint_db::DbError;
use thiserror::Error;

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// A business rule rejected the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage failed. The operation did not take effect.
    #[error("Persistence error: {0}")]
    Persistence(#[from] DbError),

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The notifier could not accept or deliver a message.
    #[error("Notification error: {0}")]
    Notification(String),
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Core(CoreError::Validation(err))
    }
}

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    EmptyCart,
    InsufficientStock,
    PaymentError,
    Duplicate,
    DatabaseError,
    ConfigError,
    NotificationError,
}

impl ServiceError {
    pub fn config(message: impl Into<String>) -> Self {
        ServiceError::Config(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::Core(err) => match err {
                CoreError::ProductNotFound(_) => ErrorCode::NotFound,
                CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
                CoreError::InsufficientPayment { .. } => ErrorCode::PaymentError,
                CoreError::EmptyCart => ErrorCode::EmptyCart,
                CoreError::NotInCart(_) => ErrorCode::NotFound,
                CoreError::Validation(ValidationError::InvalidPaymentMethod { .. }) => {
                    ErrorCode::PaymentError
                }
                CoreError::Validation(ValidationError::Duplicate { .. }) => ErrorCode::Duplicate,
                CoreError::Validation(_) => ErrorCode::ValidationError,
            },
            ServiceError::Persistence(err) => match err {
                DbError::NotFound { .. } => ErrorCode::NotFound,
                DbError::UniqueViolation { .. } => ErrorCode::Duplicate,
                _ => ErrorCode::DatabaseError,
            },
            ServiceError::Config(_) => ErrorCode::ConfigError,
            ServiceError::Notification(_) => ErrorCode::NotificationError,
        }
    }

    /// Message fit to show a cashier or an API client.
    ///
    /// Storage details are logged, not returned.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Core(err) => match err {
                CoreError::ProductNotFound(id) => format!("Product {} does not exist", id),
                CoreError::InsufficientStock {
                    product,
                    available,
                    requested,
                } => format!(
                    "Not enough {} in stock: {} left, {} requested",
                    product, available, requested
                ),
                CoreError::InsufficientPayment { total, tendered } => format!(
                    "Payment of {} does not cover the total of {}",
                    tendered, total
                ),
                CoreError::EmptyCart => "The cart is empty".to_string(),
                CoreError::NotInCart(id) => format!("Product {} is not in the cart", id),
                CoreError::Validation(e) => e.to_string(),
            },
            ServiceError::Persistence(err) => match err {
                DbError::NotFound { entity, id } => format!("{} {} does not exist", entity, id),
                DbError::UniqueViolation { field, value } => {
                    let column = field.rsplit('.').next().unwrap_or(field);
                    format!("A record with {} '{}' already exists", column, value)
                }
                DbError::ForeignKeyViolation { message } => {
                    tracing::error!(%message, "Foreign key violation");
                    "The record refers to something that does not exist".to_string()
                }
                DbError::PoolExhausted => "The system is busy, please retry".to_string(),
                other => {
                    tracing::error!(error = %other, "Storage failure");
                    "The operation could not be saved, please retry".to_string()
                }
            },
            ServiceError::Config(message) => format!("Invalid configuration: {}", message),
            ServiceError::Notification(_) => "The invoice e-mail could not be sent".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sellpoint_core::Money;

    #[test]
    fn test_codes() {
        let err: ServiceError = CoreError::insufficient_stock("Mouse", 3, 5).into();
        assert_eq!(err.code(), ErrorCode::InsufficientStock);

        let err: ServiceError = ValidationError::InvalidPaymentMethod {
            value: "bitcoin".into(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::PaymentError);

        let err: ServiceError = DbError::duplicate("clients.email", "a@b.c").into();
        assert_eq!(err.code(), ErrorCode::Duplicate);

        let err: ServiceError = DbError::PoolExhausted.into();
        assert_eq!(err.code(), ErrorCode::DatabaseError);
    }

    #[test]
    fn test_user_messages_are_distinct_and_plain() {
        let errors: Vec<ServiceError> = vec![
            CoreError::EmptyCart.into(),
            CoreError::insufficient_stock("Mouse", 3, 5).into(),
            CoreError::InsufficientPayment {
                total: Money::from_cents(7138),
                tendered: Money::from_cents(7000),
            }
            .into(),
            CoreError::ProductNotFound("p-1".into()).into(),
            DbError::QueryFailed("near \"SELEC\": syntax error".into()).into(),
            ServiceError::config("tax rate out of range"),
            ServiceError::Notification("smtp timeout".into()),
        ];

        let messages: Vec<String> = errors.iter().map(|e| e.user_message()).collect();
        for (i, message) in messages.iter().enumerate() {
            assert!(!message.contains("DbError"));
            assert!(!message.contains("SELEC"));
            assert!(!messages[i + 1..].contains(message));
        }

        assert_eq!(
            messages[2],
            "Payment of $70.00 does not cover the total of $71.38"
        );
    }

    #[test]
    fn test_duplicate_message_names_column() {
        let err: ServiceError = DbError::duplicate("products.name", "Mouse").into();
        assert_eq!(err.user_message(), "A record with name 'Mouse' already exists");
    }
}
