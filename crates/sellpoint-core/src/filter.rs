//! # Query Filters
//!
//! Typed filters for listing products and sales. The database layer turns
//! them into `WHERE` clauses; every field is optional and `None` means "no
//! constraint".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::stock::StockStatus;
use crate::types::{PaymentMethod, SaleStatus};
use crate::LOW_STOCK_THRESHOLD;

/// Products shown per page by default.
pub const PRODUCTS_PER_PAGE: u32 = 25;

/// Sales shown per page by default.
pub const SALES_PER_PAGE: u32 = 20;

/// Hard cap on page size.
pub const MAX_PAGE_SIZE: u32 = 500;

// =============================================================================
// Pagination
// =============================================================================

/// Limit/offset window over a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    /// Page `number` (1-based) of `per_page` rows. Page 0 is treated as 1 and
    /// `per_page` is clamped to `1..=500`.
    ///
    /// ```rust
    /// use sellpoint_core::filter::Page;
    ///
    /// let page = Page::number(3, 20);
    /// assert_eq!(page.offset, 40);
    /// assert_eq!(page.limit, 20);
    /// ```
    pub fn number(number: u32, per_page: u32) -> Self {
        let limit = per_page.clamp(1, MAX_PAGE_SIZE);
        Page {
            limit,
            offset: number.saturating_sub(1).saturating_mul(limit),
        }
    }

    pub fn first(per_page: u32) -> Self {
        Page::number(1, per_page)
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::first(SALES_PER_PAGE)
    }
}

// =============================================================================
// Product Filter
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductFilter {
    /// Case-insensitive substring of the name.
    pub name_contains: Option<String>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    /// Stock bucket, judged against the low-stock threshold.
    pub stock_status: Option<StockStatus>,
    /// Quantity below which a product counts as low stock.
    pub low_stock_threshold: i64,
    /// Soft-deleted products are hidden unless this is set.
    pub include_inactive: bool,
}

impl Default for ProductFilter {
    fn default() -> Self {
        ProductFilter {
            name_contains: None,
            min_price: None,
            max_price: None,
            stock_status: None,
            low_stock_threshold: LOW_STOCK_THRESHOLD,
            include_inactive: false,
        }
    }
}

impl ProductFilter {
    pub fn name(mut self, needle: impl Into<String>) -> Self {
        self.name_contains = Some(needle.into());
        self
    }

    pub fn price_between(mut self, min: Money, max: Money) -> Self {
        self.min_price = Some(min);
        self.max_price = Some(max);
        self
    }

    pub fn stock(mut self, status: StockStatus) -> Self {
        self.stock_status = Some(status);
        self
    }

    pub fn threshold(mut self, low_stock_threshold: i64) -> Self {
        self.low_stock_threshold = low_stock_threshold;
        self
    }
}

// =============================================================================
// Sale Filter
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleFilter {
    /// Inclusive lower bound on `created_at`.
    #[ts(as = "Option<String>")]
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    #[ts(as = "Option<String>")]
    pub to: Option<DateTime<Utc>>,
    pub employee_id: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub status: Option<SaleStatus>,
    pub client_id: Option<String>,
    pub min_total: Option<Money>,
    pub max_total: Option<Money>,
}

impl SaleFilter {
    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn employee(mut self, employee_id: impl Into<String>) -> Self {
        self.employee_id = Some(employee_id.into());
        self
    }

    pub fn paid_with(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    pub fn status(mut self, status: SaleStatus) -> Self {
        self.status = Some(status);
        self
    }
}
