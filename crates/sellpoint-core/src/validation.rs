//! # Validation Module
//!
//! Input validation for Sellpoint.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (form / API payload)                                  │
//! │  └── Parsing: Money::from_str, PaymentMethod::from_str                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Business rule validation (ranges, lengths, formats)               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (quantity >= 0)                                             │
//! │  ├── UNIQUE constraints (product name, client e-mail)                  │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use sellpoint_core::validation::{validate_product_name, validate_quantity};
//!
//! validate_product_name("Mouse").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{NewClient, NewProduct, ProductUpdate};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_PRICE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Product names are capped at 100 characters.
pub const MAX_PRODUCT_NAME_LEN: usize = 100;

/// Descriptions and sale notes are capped at 200 characters.
pub const MAX_TEXT_LEN: usize = 200;

// =============================================================================
// String Validators
// =============================================================================

fn required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.trim().chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most 100 characters
///
/// ## Example
/// ```rust
/// use sellpoint_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Wireless Mouse").is_ok());
/// assert!(validate_product_name("").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    required("name", name)?;
    max_len("name", name, MAX_PRODUCT_NAME_LEN)
}

/// Validates free text such as a description or sale notes.
pub fn validate_text(field: &str, value: &str) -> ValidationResult<()> {
    max_len(field, value, MAX_TEXT_LEN)
}

/// Validates a search query.
///
/// Empty is allowed (no filtering). Returns the trimmed query.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();
    max_len("query", query, MAX_PRODUCT_NAME_LEN)?;
    Ok(query.to_string())
}

/// Validates an e-mail address.
///
/// Only the shape is checked: one `@`, non-empty local part, and a domain
/// containing a dot. Deliverability is the mailer's problem.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    required("email", email)?;
    max_len("email", email, 254)?;

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must look like name@domain.tld".to_string(),
    };

    let email = email.trim();
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Cart: Add Item                                                         │
/// │                                                                         │
/// │  Cashier enters quantity: 5                                            │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       ├── qty > 999? → Error: "quantity must be between 1 and 999"     │
/// │       └── OK → item goes into the session cart                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price: zero (free items) up to [`MAX_PRICE`].
///
/// ```rust
/// use sellpoint_core::money::Money;
/// use sellpoint_core::validation::validate_price;
///
/// assert!(validate_price(Money::from_cents(0)).is_ok());
/// assert!(validate_price(Money::from_cents(-100)).is_err());
/// assert!(validate_price(Money::from_cents(i64::MAX / 100)).is_err());
/// ```
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::Negative {
            field: "price".to_string(),
        });
    }
    if price > MAX_PRICE {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE.cents(),
        });
    }
    Ok(())
}

/// Validates an amount tendered by the customer.
pub fn validate_tendered(amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::Negative {
            field: "amount tendered".to_string(),
        });
    }
    Ok(())
}

/// Validates a stock adjustment delta. The mode carries the direction, so
/// the delta itself is never negative.
pub fn validate_stock_delta(delta: i64) -> ValidationResult<()> {
    if delta < 0 {
        return Err(ValidationError::Negative {
            field: "delta".to_string(),
        });
    }
    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that another distinct item fits in a cart of `current_items`.
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Entity Validators
// =============================================================================

pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_product_name(&product.name)?;
    validate_price(product.price)?;
    if let Some(description) = &product.description {
        validate_text("description", description)?;
    }
    Ok(())
}

pub fn validate_product_update(update: &ProductUpdate) -> ValidationResult<()> {
    if let Some(name) = &update.name {
        validate_product_name(name)?;
    }
    if let Some(price) = update.price {
        validate_price(price)?;
    }
    if let Some(description) = &update.description {
        validate_text("description", description)?;
    }
    Ok(())
}

pub fn validate_new_client(client: &NewClient) -> ValidationResult<()> {
    required("name", &client.name)?;
    max_len("name", &client.name, MAX_PRODUCT_NAME_LEN)?;
    validate_email(&client.email)?;
    if let Some(phone) = &client.phone {
        if !phone
            .trim()
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'))
        {
            return Err(ValidationError::InvalidFormat {
                field: "phone".to_string(),
                reason: "must contain only digits, spaces, and + - ( )".to_string(),
            });
        }
    }
    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ```rust
/// use sellpoint_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    required("id", id)?;

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Wireless Mouse").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name("   ").is_err());
        assert!(validate_product_name(&"A".repeat(101)).is_err());
        assert!(validate_product_name(&"A".repeat(100)).is_ok());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(Money::zero()).is_ok());
        assert!(validate_price(Money::from_cents(2999)).is_ok());
        assert!(validate_price(Money::from_cents(-1)).is_err());

        assert!(validate_price(MAX_PRICE).is_ok());
        let err = validate_price(MAX_PRICE + Money::from_cents(1)).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { max: 100_000_000, .. }));
    }

    #[test]
    fn test_validate_stock_delta() {
        assert!(validate_stock_delta(0).is_ok());
        assert!(validate_stock_delta(5).is_ok());
        assert!(matches!(
            validate_stock_delta(-5),
            Err(ValidationError::Negative { .. })
        ));
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ana@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("ana.example.com").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ana@example").is_err());
        assert!(validate_email("ana@@example.com").is_err());
        assert!(validate_email("ana maria@example.com").is_err());
    }

    #[test]
    fn test_validate_new_client() {
        let client = NewClient {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            phone: Some("+57 300-123-4567".to_string()),
            ..Default::default()
        };
        assert!(validate_new_client(&client).is_ok());

        let bad_phone = NewClient {
            phone: Some("call me".to_string()),
            ..client
        };
        assert!(validate_new_client(&bad_phone).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("123").is_err());
    }

    #[test]
    fn test_validate_tax_rate_bps() {
        assert!(validate_tax_rate_bps(0).is_ok());
        assert!(validate_tax_rate_bps(1900).is_ok());
        assert!(validate_tax_rate_bps(10001).is_err());
    }

    #[test]
    fn test_validate_cart_size() {
        assert!(validate_cart_size(0).is_ok());
        assert!(validate_cart_size(99).is_ok());
        assert!(validate_cart_size(100).is_err());
    }
}
