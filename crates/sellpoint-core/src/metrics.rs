//! # Dashboard Metrics
//!
//! Report shapes and the arithmetic behind them. Aggregation over rows
//! happens in SQL; what is left here is comparing periods and folding sale
//! snapshots.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{PaymentMethod, SaleRecord};

/// Percentage change from `previous` to `current`, rounded to two decimals.
///
/// A previous value of zero (or less) has no meaningful baseline, so growth
/// is reported as 0.
///
/// ```rust
/// use sellpoint_core::metrics::growth_percent;
///
/// assert_eq!(growth_percent(150, 100), 50.0);
/// assert_eq!(growth_percent(2, 3), -33.33);
/// assert_eq!(growth_percent(10, 0), 0.0);
/// ```
pub fn growth_percent(current: i64, previous: i64) -> f64 {
    if previous <= 0 {
        return 0.0;
    }
    let pct = (current - previous) as f64 / previous as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

/// Mean of `count` sales totalling `total`, rounded half up to the cent.
pub fn average_sale(total: Money, count: i64) -> Money {
    if count <= 0 {
        return Money::zero();
    }
    let cents = total.cents();
    let rounded = (cents * 2 + count) / (count * 2);
    Money::from_cents(rounded)
}

/// Sales count and revenue for one payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentBreakdown {
    pub method: PaymentMethod,
    pub count: i64,
    pub revenue: Money,
}

/// Sales count and revenue for one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailySales {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub sales_count: i64,
    pub revenue: Money,
}

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MainKpis {
    pub total_sales: i64,
    pub total_revenue: Money,
    pub average_sale: Money,
    pub revenue_growth: f64,
    pub sales_growth: f64,

    pub total_products: i64,
    pub total_stock: i64,
    pub low_stock_products: i64,

    pub total_clients: i64,

    pub payment_methods: Vec<PaymentBreakdown>,

    pub period_days: u32,
    #[ts(as = "String")]
    pub period_start: DateTime<Utc>,
    #[ts(as = "String")]
    pub period_end: DateTime<Utc>,
}

/// How one product sold across a set of sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductPerformance {
    pub name: String,
    pub quantity_sold: i64,
    pub revenue: Money,
}

/// Best sellers by revenue, folded from sale snapshots.
///
/// Snapshots carry names rather than product ids, so a renamed product
/// appears under each name it was sold as.
pub fn top_products(sales: &[SaleRecord], limit: usize) -> Vec<ProductPerformance> {
    let mut by_name: HashMap<&str, (i64, Money)> = HashMap::new();

    for line in sales.iter().flat_map(|s| s.lines.iter()) {
        let entry = by_name.entry(line.name.as_str()).or_insert((0, Money::zero()));
        entry.0 += line.quantity;
        entry.1 += line.line_total;
    }

    let mut ranked: Vec<ProductPerformance> = by_name
        .into_iter()
        .map(|(name, (quantity_sold, revenue))| ProductPerformance {
            name: name.to_string(),
            quantity_sold,
            revenue,
        })
        .collect();
    ranked.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(limit);
    ranked
}
