//! # Stock Rules
//!
//! Pure inventory rules. The database layer applies them atomically; this
//! module decides what a correct result is.
//!
//! ## Adjustment Modes
//! ```text
//! ┌────────────┬──────────────────────────┬──────────────────────────────┐
//! │ Mode       │ Result                   │ Rejected when                │
//! ├────────────┼──────────────────────────┼──────────────────────────────┤
//! │ add        │ current + delta          │ delta < 0                    │
//! │ subtract   │ current - delta          │ delta < 0, delta > current   │
//! │ set        │ delta                    │ delta < 0                    │
//! └────────────┴──────────────────────────┴──────────────────────────────┘
//! ```
//!
//! Subtraction never clamps at zero. A shortfall is an `InsufficientStock`
//! error and the quantity stays as it was.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{LineItem, Product, StockMode};
use crate::validation::validate_stock_delta;

/// Maximum number of restock suggestions returned.
pub const MAX_RESTOCK_SUGGESTIONS: usize = 10;

/// Minimum units suggested for any restock order.
pub const MIN_RESTOCK_ORDER: i64 = 20;

// =============================================================================
// Adjustment
// =============================================================================

/// Computes the quantity after applying `delta` in `mode` to `current`.
///
/// ```rust
/// use sellpoint_core::stock::apply_adjustment;
/// use sellpoint_core::types::StockMode;
///
/// assert_eq!(apply_adjustment("Mouse", 3, 2, StockMode::Add).unwrap(), 5);
/// assert_eq!(apply_adjustment("Mouse", 3, 3, StockMode::Subtract).unwrap(), 0);
/// assert!(apply_adjustment("Mouse", 3, 5, StockMode::Subtract).is_err());
/// ```
pub fn apply_adjustment(product: &str, current: i64, delta: i64, mode: StockMode) -> CoreResult<i64> {
    validate_stock_delta(delta)?;

    match mode {
        StockMode::Add => current
            .checked_add(delta)
            .ok_or_else(|| quantity_overflow().into()),
        StockMode::Subtract if delta > current => {
            Err(CoreError::insufficient_stock(product, current, delta))
        }
        StockMode::Subtract => Ok(current - delta),
        StockMode::Set => Ok(delta),
    }
}

/// The error for a stock quantity that would exceed `i64::MAX`.
pub fn quantity_overflow() -> ValidationError {
    ValidationError::OutOfRange {
        field: "quantity".to_string(),
        min: 0,
        max: i64::MAX,
    }
}

// =============================================================================
// Stock Status
// =============================================================================

/// Where a quantity sits relative to the low-stock threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    /// Above zero, below the threshold.
    Low,
    OutOfStock,
}

impl StockStatus {
    pub fn classify(quantity: i64, threshold: i64) -> Self {
        if quantity <= 0 {
            StockStatus::OutOfStock
        } else if quantity < threshold {
            StockStatus::Low
        } else {
            StockStatus::InStock
        }
    }
}

/// True when `quantity` is strictly below the threshold (zero included).
#[inline]
pub fn is_low_stock(quantity: i64, threshold: i64) -> bool {
    quantity < threshold
}

// =============================================================================
// Checkout Demand
// =============================================================================

/// Total units a checkout needs from one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDemand {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
}

/// Collapses line items into one demand per product, ordered by product id.
///
/// A cart normally merges duplicates already, but the decrement must be
/// correct even when handed a list that repeats a product.
pub fn aggregate_demand(items: &[LineItem]) -> Vec<StockDemand> {
    let mut demands: Vec<StockDemand> = Vec::with_capacity(items.len());

    for item in items {
        match demands.iter_mut().find(|d| d.product_id == item.product_id) {
            Some(existing) => existing.quantity += item.quantity,
            None => demands.push(StockDemand {
                product_id: item.product_id.clone(),
                name: item.name.clone(),
                quantity: item.quantity,
            }),
        }
    }

    demands.sort_by(|a, b| a.product_id.cmp(&b.product_id));
    demands
}

/// Answer to "can I sell `required` units of this product?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Availability {
    pub available: bool,
    pub current_stock: i64,
    pub required: i64,
    /// Units left after the sale, when it can go ahead.
    pub remaining_after: Option<i64>,
}

impl Availability {
    pub fn evaluate(current_stock: i64, required: i64) -> Self {
        let available = current_stock >= required;
        Availability {
            available,
            current_stock,
            required,
            remaining_after: available.then(|| current_stock - required),
        }
    }
}

// =============================================================================
// Reporting
// =============================================================================

/// Inventory overview.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockSummary {
    /// Sum of all on-hand quantities.
    pub total_units: i64,
    pub low_stock_count: i64,
    pub out_of_stock_count: i64,
    /// Up to ten low (but not empty) products, lowest first.
    pub low_stock_products: Vec<Product>,
    /// Up to ten empty products, by name.
    pub out_of_stock_products: Vec<Product>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockAlert {
    pub level: AlertLevel,
    pub message: String,
    pub count: i64,
}

/// Builds dashboard alerts from out-of-stock and low-stock counts.
/// Zero counts produce no alert.
pub fn stock_alerts(out_of_stock: i64, low_stock: i64) -> Vec<StockAlert> {
    let mut alerts = Vec::new();

    if out_of_stock > 0 {
        alerts.push(StockAlert {
            level: AlertLevel::Error,
            message: format!("{out_of_stock} products out of stock"),
            count: out_of_stock,
        });
    }
    if low_stock > 0 {
        alerts.push(StockAlert {
            level: AlertLevel::Warning,
            message: format!("{low_stock} products low on stock"),
            count: low_stock,
        });
    }

    alerts
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RestockPriority {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RestockSuggestion {
    pub product_id: String,
    pub product_name: String,
    pub current_stock: i64,
    pub suggested_order: i64,
    pub priority: RestockPriority,
}

/// Suggests reorder quantities for products below the threshold.
///
/// ## Rules
/// - suggested order = max(20, 3 × current)
/// - priority is high when the product is out of stock
/// - lowest stock first, at most ten suggestions
pub fn suggest_restock(products: &[Product], threshold: i64) -> Vec<RestockSuggestion> {
    let mut low: Vec<&Product> = products
        .iter()
        .filter(|p| is_low_stock(p.current_stock, threshold))
        .collect();
    low.sort_by(|a, b| a.current_stock.cmp(&b.current_stock).then_with(|| a.name.cmp(&b.name)));

    low.into_iter()
        .take(MAX_RESTOCK_SUGGESTIONS)
        .map(|p| RestockSuggestion {
            product_id: p.id.clone(),
            product_name: p.name.clone(),
            current_stock: p.current_stock,
            suggested_order: MIN_RESTOCK_ORDER.max(p.current_stock * 3),
            priority: if p.current_stock <= 0 {
                RestockPriority::High
            } else {
                RestockPriority::Medium
            },
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
