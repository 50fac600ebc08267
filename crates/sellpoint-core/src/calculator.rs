//! # Sale Calculator
//!
//! Turns a list of line items into totals, and a tendered amount into change.
//!
//! ## Computation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  line_items ──► validate each (qty 1..=999, price 0..=MAX_PRICE)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  line_total = quantity × unit_price          (exact, checked cents)     │
//! │  subtotal   = Σ line_total                   (no intermediate rounding) │
//! │  tax        = round_half_up(subtotal × rate) (rounded once)             │
//! │  grand      = subtotal + tax                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tendered? ──► tendered < grand → InsufficientPayment                  │
//! │               otherwise change = tendered - grand                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is pure: the same inputs always yield the same `Totals`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{LineItem, TaxRate};
use crate::validation::{validate_price, validate_quantity, validate_tendered};

/// Result of pricing a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Totals {
    pub line_items: Vec<LineItem>,
    /// Sum of quantities across all lines.
    pub quantity_total: i64,
    pub subtotal: Money,
    pub tax: Money,
    pub grand_total: Money,
    /// Present only when an amount tendered was supplied.
    pub change: Option<Money>,
}

/// Computes subtotal, tax, grand total and optionally change for a sale.
///
/// ## Errors
/// - `Validation` when a quantity is not in `1..=999`, a price is negative
///   or above `MAX_PRICE`, or a total would not fit in `i64` cents
/// - `InsufficientPayment` when `amount_tendered` is below the grand total
///
/// An empty list is valid here and produces all-zero totals; rejecting an
/// empty cart is the checkout's decision.
///
/// ## Example
/// ```rust
/// use sellpoint_core::calculator::compute_totals;
/// use sellpoint_core::money::Money;
/// use sellpoint_core::types::{LineItem, TaxRate};
///
/// let items = vec![LineItem {
///     product_id: "p1".into(),
///     name: "Mouse".into(),
///     quantity: 2,
///     unit_price: Money::from_cents(2999),
/// }];
///
/// let totals = compute_totals(&items, Some(Money::from_cents(7500)), TaxRate::from_bps(1900)).unwrap();
/// assert_eq!(totals.subtotal.cents(), 5998);
/// assert_eq!(totals.tax.cents(), 1140);
/// assert_eq!(totals.grand_total.cents(), 7138);
/// assert_eq!(totals.change.unwrap().cents(), 362);
/// ```
pub fn compute_totals(
    line_items: &[LineItem],
    amount_tendered: Option<Money>,
    tax_rate: TaxRate,
) -> CoreResult<Totals> {
    for item in line_items {
        validate_quantity(item.quantity)?;
        validate_price(item.unit_price)?;
    }

    let subtotal = line_items.iter().try_fold(Money::zero(), |acc, item| {
        item.unit_price
            .checked_multiply_quantity(item.quantity)
            .and_then(|line| acc.checked_add(line))
            .ok_or_else(total_overflow)
    })?;
    let quantity_total = line_items.iter().map(|item| item.quantity).sum();
    let tax = subtotal.calculate_tax(tax_rate);
    let grand_total = subtotal.checked_add(tax).ok_or_else(total_overflow)?;

    let change = match amount_tendered {
        Some(tendered) => Some(calculate_change(grand_total, tendered)?),
        None => None,
    };

    Ok(Totals {
        line_items: line_items.to_vec(),
        quantity_total,
        subtotal,
        tax,
        grand_total,
        change,
    })
}

fn total_overflow() -> CoreError {
    ValidationError::OutOfRange {
        field: "total".to_string(),
        min: 0,
        max: i64::MAX,
    }
    .into()
}

/// Change owed for a payment against a total.
///
/// ```rust
/// use sellpoint_core::calculator::calculate_change;
/// use sellpoint_core::money::Money;
///
/// let change = calculate_change(Money::from_cents(7138), Money::from_cents(7500)).unwrap();
/// assert_eq!(change.cents(), 362);
///
/// assert!(calculate_change(Money::from_cents(7138), Money::from_cents(7000)).is_err());
/// ```
pub fn calculate_change(total: Money, payment: Money) -> CoreResult<Money> {
    validate_tendered(payment)?;

    if payment < total {
        return Err(CoreError::InsufficientPayment {
            total,
            tendered: payment,
        });
    }

    Ok(payment - total)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    fn mouse(quantity: i64) -> LineItem {
        LineItem {
            product_id: "p-mouse".to_string(),
            name: "Mouse".to_string(),
            quantity,
            unit_price: Money::from_cents(2999),
        }
    }

    fn rate() -> TaxRate {
        TaxRate::from_bps(1900)
    }

    #[test]
    fn test_totals_without_tendered() {
        let totals = compute_totals(&[mouse(2)], None, rate()).unwrap();

        assert_eq!(totals.quantity_total, 2);
        assert_eq!(totals.subtotal.cents(), 5998);
        assert_eq!(totals.tax.cents(), 1140);
        assert_eq!(totals.grand_total.cents(), 7138);
        assert_eq!(totals.change, None);
    }

    #[test]
    fn test_insufficient_payment() {
        let err = compute_totals(&[mouse(2)], Some(Money::from_cents(7000)), rate()).unwrap_err();

        match err {
            CoreError::InsufficientPayment { total, tendered } => {
                assert_eq!(total.cents(), 7138);
                assert_eq!(tendered.cents(), 7000);
            }
            other => panic!("expected InsufficientPayment, got {other:?}"),
        }
    }

    #[test]
    fn test_change_returned() {
        let totals = compute_totals(&[mouse(2)], Some(Money::from_cents(7500)), rate()).unwrap();
        assert_eq!(totals.change, Some(Money::from_cents(362)));
    }

    #[test]
    fn test_exact_payment_gives_zero_change() {
        let totals = compute_totals(&[mouse(2)], Some(Money::from_cents(7138)), rate()).unwrap();
        assert_eq!(totals.change, Some(Money::zero()));
    }

    #[test]
    fn test_multiple_lines_round_once() {
        // 3 × 0.33 + 1 × 0.01 = 1.00, and 8.25% of 1.00 = 0.0825 → 0.08
        let items = vec![
            LineItem {
                product_id: "a".to_string(),
                name: "A".to_string(),
                quantity: 3,
                unit_price: Money::from_cents(33),
            },
            LineItem {
                product_id: "b".to_string(),
                name: "B".to_string(),
                quantity: 1,
                unit_price: Money::from_cents(1),
            },
        ];
        let totals = compute_totals(&items, None, TaxRate::from_bps(825)).unwrap();
        assert_eq!(totals.subtotal.cents(), 100);
        assert_eq!(totals.tax.cents(), 8);
        assert_eq!(totals.grand_total.cents(), 108);
        assert_eq!(totals.quantity_total, 4);
    }

    #[test]
    fn test_idempotent() {
        let items = vec![mouse(2), mouse(1)];
        let tendered = Some(Money::from_cents(20000));
        let first = compute_totals(&items, tendered, rate()).unwrap();
        let second = compute_totals(&items, tendered, rate()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_bad_quantity_and_price() {
        let err = compute_totals(&[mouse(0)], None, rate()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MustBePositive { .. })
        ));

        let mut negative = mouse(1);
        negative.unit_price = Money::from_cents(-1);
        assert!(compute_totals(&[negative], None, rate()).is_err());
    }

    #[test]
    fn test_huge_price_is_rejected_not_overflowed() {
        let mut item = mouse(999);
        item.unit_price = Money::from_cents(i64::MAX / 100);

        let err = compute_totals(&[item], None, rate()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { ref field, .. }) if field == "price"
        ));
    }

    #[test]
    fn test_full_cart_at_max_price_fits() {
        let mut item = mouse(crate::MAX_ITEM_QUANTITY);
        item.unit_price = crate::MAX_PRICE;
        let cart = vec![item; crate::MAX_CART_ITEMS];

        let totals = compute_totals(&cart, None, rate()).unwrap();
        assert_eq!(totals.subtotal.cents(), 100_000_000 * 999 * 100);
        assert_eq!(totals.grand_total, totals.subtotal + totals.tax);
    }

    #[test]
    fn test_empty_items_are_zero() {
        let totals = compute_totals(&[], None, rate()).unwrap();
        assert!(totals.grand_total.is_zero());
        assert_eq!(totals.quantity_total, 0);
    }

    #[test]
    fn test_calculate_change_rule() {
        let total = Money::from_cents(1000);
        assert_eq!(calculate_change(total, Money::from_cents(1000)).unwrap(), Money::zero());
        assert_eq!(calculate_change(total, Money::from_cents(2000)).unwrap().cents(), 1000);
        assert!(calculate_change(total, Money::from_cents(999)).is_err());
        assert!(calculate_change(total, Money::from_cents(-1)).is_err());
    }
}
