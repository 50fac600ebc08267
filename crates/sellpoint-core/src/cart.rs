//! # Cart
//!
//! Session-scoped shopping carts.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Caller Action            SessionCarts            Cart State Change     │
//! │  ─────────────            ────────────            ─────────────────     │
//! │                                                                         │
//! │  Scan product ───────────► add() ───────────────► push or merge qty    │
//! │  Change quantity ────────► update_quantity() ───► items[i].qty = n     │
//! │  Remove line ────────────► remove() ────────────► items.remove(i)      │
//! │  Checkout ───────────────► list() ──────────────► (read only)          │
//! │  Sale committed ─────────► clear() ─────────────► cart dropped         │
//! │                                                                         │
//! │  Every call names its CartSession; two cashiers never share a cart.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The unit price is captured when a product enters the cart. If the catalog
//! price changes afterwards, the cart keeps the captured price and
//! [`validate_cart`] reports the drift as a warning.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{CartSession, LineItem, Product};
use crate::validation::{validate_cart_size, validate_quantity};
use crate::MAX_ITEM_QUANTITY;

// =============================================================================
// Cart Store Seam
// =============================================================================

/// Read-and-clear access to carts, which is all checkout needs.
pub trait CartStore: Send + Sync {
    /// Line items in the session's cart, in insertion order. Unknown
    /// sessions have an empty cart.
    fn list(&self, session: &CartSession) -> Vec<LineItem>;

    /// Drops every item in the session's cart.
    fn clear(&self, session: &CartSession);
}

// =============================================================================
// Cart
// =============================================================================

/// One session's cart.
///
/// ## Invariants
/// - Items are unique by `product_id` (adding the same product merges)
/// - Quantity is in `1..=999`
/// - At most 100 distinct items
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    pub items: Vec<LineItem>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self {
        Cart::new()
    }
}

impl Cart {
    pub fn new() -> Self {
        Cart {
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Adds a product, or increases its quantity if already present.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;

        if !product.is_active {
            return Err(CoreError::ProductNotFound(product.id.clone()));
        }

        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            let new_qty = item.quantity + quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(ValidationError::OutOfRange {
                    field: "quantity".to_string(),
                    min: 1,
                    max: MAX_ITEM_QUANTITY,
                }
                .into());
            }
            item.quantity = new_qty;
            return Ok(());
        }

        validate_cart_size(self.items.len())?;

        self.items.push(LineItem {
            product_id: product.id.clone(),
            name: product.name.clone(),
            quantity,
            unit_price: product.price,
        });
        Ok(())
    }

    /// Sets the quantity of a line. Zero removes it.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_item(product_id);
        }
        validate_quantity(quantity)?;

        let item = self
            .items
            .iter_mut()
            .find(|i| i.product_id == product_id)
            .ok_or_else(|| CoreError::NotInCart(product_id.to_string()))?;
        item.quantity = quantity;
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: &str) -> CoreResult<()> {
        let initial_len = self.items.len();
        self.items.retain(|i| i.product_id != product_id);

        if self.items.len() == initial_len {
            Err(CoreError::NotInCart(product_id.to_string()))
        } else {
            Ok(())
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Sum of line totals, before tax.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(LineItem::line_total).sum()
    }
}

// =============================================================================
// Session Carts
// =============================================================================

/// In-memory carts keyed by session.
///
/// ## Thread Safety
/// One `Mutex` guards the whole map. Cart operations are short and never
/// await while holding the lock. A poisoned lock is recovered rather than
/// propagated, since every operation leaves the map consistent.
#[derive(Debug, Default)]
pub struct SessionCarts {
    carts: Mutex<HashMap<CartSession, Cart>>,
}

impl SessionCarts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` with mutable access to the session's cart, creating it if
    /// needed.
    pub fn with_cart_mut<F, R>(&self, session: &CartSession, f: F) -> R
    where
        F: FnOnce(&mut Cart) -> R,
    {
        let mut carts = self.carts.lock().unwrap_or_else(PoisonError::into_inner);
        let cart = carts.entry(session.clone()).or_default();
        f(cart)
    }

    /// Runs `f` with read access to the session's cart. Unknown sessions see
    /// an empty cart.
    pub fn with_cart<F, R>(&self, session: &CartSession, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        let carts = self.carts.lock().unwrap_or_else(PoisonError::into_inner);
        match carts.get(session) {
            Some(cart) => f(cart),
            None => f(&Cart::new()),
        }
    }

    pub fn add(&self, session: &CartSession, product: &Product, quantity: i64) -> CoreResult<()> {
        self.with_cart_mut(session, |cart| cart.add_item(product, quantity))
    }

    pub fn update_quantity(&self, session: &CartSession, product_id: &str, quantity: i64) -> CoreResult<()> {
        self.with_cart_mut(session, |cart| cart.update_quantity(product_id, quantity))
    }

    pub fn remove(&self, session: &CartSession, product_id: &str) -> CoreResult<()> {
        self.with_cart_mut(session, |cart| cart.remove_item(product_id))
    }

    /// Number of sessions holding a cart.
    pub fn session_count(&self) -> usize {
        self.carts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl CartStore for SessionCarts {
    fn list(&self, session: &CartSession) -> Vec<LineItem> {
        self.with_cart(session, |cart| cart.items.clone())
    }

    fn clear(&self, session: &CartSession) {
        self.carts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session);
    }
}

// =============================================================================
// Cart Validation
// =============================================================================

/// Outcome of checking a cart against the current catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartValidation {
    /// Problems that block checkout.
    pub errors: Vec<String>,
    /// Things the cashier should know about but that do not block checkout.
    pub warnings: Vec<String>,
}

impl CartValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Prices that moved by more than this are reported.
const PRICE_DRIFT_TOLERANCE: Money = Money::from_cents(1);

/// Checks cart lines against the products as they are now.
///
/// `current` holds the freshly loaded products; a line whose product is
/// missing or inactive is an error.
pub fn validate_cart(items: &[LineItem], current: &[Product]) -> CartValidation {
    let mut result = CartValidation::default();

    if items.is_empty() {
        result.errors.push("Cart is empty".to_string());
        return result;
    }

    for item in items {
        match current.iter().find(|p| p.id == item.product_id) {
            Some(product) if product.is_active => {
                let drift = (product.price - item.unit_price).cents().abs();
                if drift > PRICE_DRIFT_TOLERANCE.cents() {
                    result.warnings.push(format!(
                        "Price of {} changed from {} to {}",
                        item.name, item.unit_price, product.price
                    ));
                }
            }
            _ => result
                .errors
                .push(format!("{} is no longer available", item.name)),
        }
    }

    result
}

// =============================================================================
// Unit Tests
// =============================================================================
