//! # sellpoint-core: Pure Business Logic for Sellpoint
//!
//! This crate holds the sale and inventory rules as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sellpoint Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Callers (web views, REST handlers, scripts)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 sellpoint-service                               │   │
//! │  │    CheckoutService, StockAdjuster, Dashboard, Notifier          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ sellpoint-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │calculator │  │   │
//! │  │   │  Product  │  │   Money   │  │ Sessions  │  │  Totals   │  │   │
//! │  │   │SaleRecord │  │  TaxRate  │  │ CartStore │  │  change   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   stock   │  │  filter   │  │  metrics  │  │validation │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 sellpoint-db (Database Layer)                   │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, SaleRecord, Client, etc.)
//! - [`money`] - Money type with integer arithmetic
//! - [`calculator`] - Subtotal, tax, grand total, change
//! - [`stock`] - Stock adjustment rules and restock suggestions
//! - [`cart`] - Session-scoped carts
//! - [`filter`] - Typed list filters and pagination
//! - [`metrics`] - Dashboard math
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use sellpoint_core::money::Money;
//! use sellpoint_core::types::TaxRate;
//!
//! let subtotal = Money::from_cents(5998); // 59.98
//! let tax = subtotal.calculate_tax(TaxRate::default()); // 19%
//!
//! assert_eq!(tax.cents(), 1140);
//! assert_eq!((subtotal + tax).cents(), 7138);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod calculator;
pub mod cart;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod money;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use calculator::{calculate_change, compute_totals, Totals};
pub use cart::{CartStore, SessionCarts};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default sales tax in basis points (19%).
pub const DEFAULT_TAX_RATE_BPS: u32 = 1900;

/// Quantities strictly below this are reported as low stock.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// Maximum distinct items allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single item in a cart.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest unit price a product may carry ($1,000,000.00).
///
/// A full cart at this price and [`MAX_ITEM_QUANTITY`] still totals well
/// inside `i64` cents.
pub const MAX_PRICE: Money = Money::from_cents(100_000_000);
