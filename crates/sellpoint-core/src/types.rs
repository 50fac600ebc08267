//! # Domain Types
//!
//! Core domain types used throughout Sellpoint.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │──►│   StockLevel    │   │   SaleRecord    │       │
//! │  │  ─────────────  │1:1│  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  product_id     │   │  id (UUID)      │       │
//! │  │  name (unique)  │   │  quantity >= 0  │   │  receipt_number │       │
//! │  │  price (Money)  │   └─────────────────┘   │  lines (JSON)   │       │
//! │  └─────────────────┘                         │  totals         │       │
//! │                                              └─────────────────┘       │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │   SaleStatus    │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  Paid           │   │  Cash           │       │
//! │  │  1900 = 19%     │   │  Pending        │   │  CreditCard     │       │
//! │  └─────────────────┘   └─────────────────┘   │  DebitCard      │       │
//! │                                              │  Transfer       │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A `SaleRecord` never references products by foreign key. Its lines are
//! copied at checkout time, so renaming or repricing a product later does not
//! rewrite history.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::Money;
use crate::DEFAULT_TAX_RATE_BPS;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1900 bps = 19% (the default sales tax)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::from_bps(DEFAULT_TAX_RATE_BPS)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
///
/// `current_stock` is read from the product's `StockLevel` row when the
/// product is loaded; it is a snapshot, not a live value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name, unique across the catalog.
    pub name: String,

    /// Optional description for product details.
    pub description: Option<String>,

    /// Unit price.
    pub price: Money,

    /// Units on hand when the product was read.
    pub current_stock: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    /// When the product was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Checks if the requested quantity is on hand.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.is_active && self.current_stock >= quantity
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
}

/// Partial update of a product. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
}

// =============================================================================
// Stock
// =============================================================================

/// On-hand quantity for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockLevel {
    pub product_id: String,
    pub quantity: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// How a stock adjustment applies its delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockMode {
    /// quantity + delta
    Add,
    /// quantity - delta, rejected when it would go below zero
    Subtract,
    /// quantity = delta
    Set,
}

impl StockMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockMode::Add => "add",
            StockMode::Subtract => "subtract",
            StockMode::Set => "set",
        }
    }
}

impl FromStr for StockMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(StockMode::Add),
            "subtract" => Ok(StockMode::Subtract),
            "set" => Ok(StockMode::Set),
            _ => Err(ValidationError::InvalidStockMode {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for StockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// A product in a cart, with the unit price captured when it was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub product_id: String,
    /// Product name at add-time, copied into the sale snapshot.
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
}

impl LineItem {
    /// quantity × unit price, exact.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a recorded sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Settled at the counter.
    Paid,
    /// Recorded but awaiting settlement (e.g. bank transfer).
    Pending,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Paid
    }
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Paid => "paid",
            SaleStatus::Pending => "pending",
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    CreditCard,
    DebitCard,
    /// Bank transfer.
    Transfer,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Cash,
        PaymentMethod::CreditCard,
        PaymentMethod::DebitCard,
        PaymentMethod::Transfer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::Transfer => "transfer",
        }
    }

    /// Transfers are recorded as pending until the money arrives.
    pub fn initial_status(&self) -> SaleStatus {
        match self {
            PaymentMethod::Transfer => SaleStatus::Pending,
            _ => SaleStatus::Paid,
        }
    }
}

/// Parses the payment method as it arrives from a form or API payload.
///
/// Matching ignores case, surrounding whitespace, and `-`/space separators,
/// so `"Credit Card"` and `"credit-card"` both parse.
impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        match normalized.as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "credit_card" | "credit" => Ok(PaymentMethod::CreditCard),
            "debit_card" | "debit" => Ok(PaymentMethod::DebitCard),
            "transfer" | "bank_transfer" => Ok(PaymentMethod::Transfer),
            _ => Err(ValidationError::InvalidPaymentMethod {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sale Record
// =============================================================================

/// One line of the itemized snapshot stored with a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SnapshotLine {
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

impl From<&LineItem> for SnapshotLine {
    fn from(item: &LineItem) -> Self {
        SnapshotLine {
            name: item.name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total: item.line_total(),
        }
    }
}

/// An immutable, persisted sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleRecord {
    pub id: String,
    pub receipt_number: String,
    pub employee_id: String,
    pub lines: Vec<SnapshotLine>,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub notes: Option<String>,
    pub amount_tendered: Option<Money>,
    pub change: Option<Money>,
    pub subtotal: Money,
    pub tax: Money,
    pub grand_total: Money,
    pub client_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleRecord {
    /// Total units across all snapshot lines.
    pub fn quantity_total(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

/// Everything needed to persist a sale, before id and receipt number exist.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleDraft {
    pub employee_id: String,
    pub lines: Vec<SnapshotLine>,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub notes: Option<String>,
    pub amount_tendered: Option<Money>,
    pub change: Option<Money>,
    pub subtotal: Money,
    pub tax: Money,
    pub grand_total: Money,
    pub client_id: Option<String>,
}

// =============================================================================
// Client
// =============================================================================

/// A registered customer. Invoices are e-mailed to `email`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub tax_id: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for registering a client.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewClient {
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub tax_id: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
}

// =============================================================================
// Notification Outbox
// =============================================================================

/// A pending invoice e-mail in the notification outbox.
///
/// Written in the same transaction as the sale it describes.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct NotificationEntry {
    pub id: String,
    pub sale_id: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    /// Number of delivery attempts.
    pub attempts: i64,
    /// Last error message if delivery failed.
    pub last_error: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub attempted_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub sent_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Cart Session
// =============================================================================

/// Identifies one cashier session's cart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartSession(String);

impl CartSession {
    /// Starts a fresh session with a random id.
    pub fn new() -> Self {
        CartSession(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CartSession {
    fn default() -> Self {
        CartSession::new()
    }
}

impl From<&str> for CartSession {
    fn from(id: &str) -> Self {
        CartSession(id.to_string())
    }
}

impl From<String> for CartSession {
    fn from(id: String) -> Self {
        CartSession(id)
    }
}

impl fmt::Display for CartSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_default_is_nineteen_percent() {
        let rate = TaxRate::default();
        assert_eq!(rate.bps(), 1900);
        assert!((rate.percentage() - 19.0).abs() < 0.001);
    }

    #[test]
    fn test_payment_method_parsing() {
        assert_eq!("cash".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert_eq!(" Credit Card ".parse::<PaymentMethod>().unwrap(), PaymentMethod::CreditCard);
        assert_eq!("debit-card".parse::<PaymentMethod>().unwrap(), PaymentMethod::DebitCard);
        assert_eq!("TRANSFER".parse::<PaymentMethod>().unwrap(), PaymentMethod::Transfer);

        let err = "bitcoin".parse::<PaymentMethod>().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPaymentMethod { .. }));
    }

    #[test]
    fn test_payment_method_round_trips_through_as_str() {
        for method in PaymentMethod::ALL {
            assert_eq!(method.as_str().parse::<PaymentMethod>().unwrap(), method);
        }
    }

    #[test]
    fn test_transfer_starts_pending() {
        assert_eq!(PaymentMethod::Transfer.initial_status(), SaleStatus::Pending);
        assert_eq!(PaymentMethod::Cash.initial_status(), SaleStatus::Paid);
    }

    #[test]
    fn test_stock_mode_parsing() {
        assert_eq!("Subtract".parse::<StockMode>().unwrap(), StockMode::Subtract);
        assert!("remove".parse::<StockMode>().is_err());
    }

    #[test]
    fn test_line_total_and_snapshot() {
        let item = LineItem {
            product_id: "p1".to_string(),
            name: "Mouse".to_string(),
            quantity: 2,
            unit_price: Money::from_cents(2999),
        };
        let line = SnapshotLine::from(&item);
        assert_eq!(line.line_total.cents(), 5998);
        assert_eq!(line.name, "Mouse");
    }

    #[test]
    fn test_snapshot_line_json_shape() {
        let line = SnapshotLine {
            name: "Mouse".to_string(),
            quantity: 2,
            unit_price: Money::from_cents(2999),
            line_total: Money::from_cents(5998),
        };
        let json = serde_json::to_string(&line).unwrap();
        assert_eq!(
            json,
            r#"{"name":"Mouse","quantity":2,"unit_price":2999,"line_total":5998}"#
        );
    }
}
