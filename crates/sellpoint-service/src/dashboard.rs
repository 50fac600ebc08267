//! # Dashboard
//!
//! Read-only numbers for the back office.
//!
//! ```text
//! main_kpis(30)
//!
//!   previous window          current window
//!   [now-60d, now-30d)       [now-30d, now]
//!        │                        │
//!        └──── growth_percent ────┘
//! ```

use chrono::{Duration, Utc};

use sellpoint_core::filter::{ProductFilter, SaleFilter};
use sellpoint_core::metrics::{self, DailySales, MainKpis, ProductPerformance};
use sellpoint_db::Database;
use tracing::debug;

use crate::error::ServiceResult;

#[derive(Debug, Clone)]
pub struct DashboardService {
    db: Database,
    low_stock_threshold: i64,
}

impl DashboardService {
    pub fn new(db: Database, low_stock_threshold: i64) -> Self {
        DashboardService {
            db,
            low_stock_threshold,
        }
    }

    /// Headline numbers for the last `days_back` days, compared with the
    /// window of the same length just before it.
    pub async fn main_kpis(&self, days_back: u32) -> ServiceResult<MainKpis> {
        let days_back = days_back.max(1);
        let period_end = Utc::now();
        let period_start = period_end - Duration::days(i64::from(days_back));
        let previous_start = period_start - Duration::days(i64::from(days_back));

        // `to` is exclusive; nudge it so a sale stamped at `period_end` counts.
        let current = SaleFilter::default().between(period_start, period_end + Duration::seconds(1));
        let previous = SaleFilter::default().between(previous_start, period_start);

        let sales = self.db.sales();
        let (total_sales, total_revenue) = sales.totals(&current).await?;
        let (previous_sales, previous_revenue) = sales.totals(&previous).await?;
        let payment_methods = sales.payment_breakdown(&current).await?;

        let stock = self.db.stock().summary(self.low_stock_threshold).await?;
        let total_products = self.db.products().count(&ProductFilter::default()).await?;
        let total_clients = self.db.clients().count().await?;

        debug!(days_back, total_sales, previous_sales, "Computed dashboard KPIs");

        Ok(MainKpis {
            total_sales,
            total_revenue,
            average_sale: metrics::average_sale(total_revenue, total_sales),
            revenue_growth: metrics::growth_percent(total_revenue.cents(), previous_revenue.cents()),
            sales_growth: metrics::growth_percent(total_sales, previous_sales),
            total_products,
            total_stock: stock.total_units,
            low_stock_products: stock.low_stock_count,
            total_clients,
            payment_methods,
            period_days: days_back,
            period_start,
            period_end,
        })
    }

    /// One row per day with sales in the last `days_back` days.
    pub async fn sales_by_day(&self, days_back: u32) -> ServiceResult<Vec<DailySales>> {
        let now = Utc::now();
        let filter = SaleFilter::default().between(
            now - Duration::days(i64::from(days_back.max(1))),
            now + Duration::seconds(1),
        );
        Ok(self.db.sales().daily_totals(&filter).await?)
    }

    /// Best sellers by revenue over the last `days_back` days.
    pub async fn top_products(&self, days_back: u32, limit: usize) -> ServiceResult<Vec<ProductPerformance>> {
        let now = Utc::now();
        let filter = SaleFilter::default().between(
            now - Duration::days(i64::from(days_back.max(1))),
            now + Duration::seconds(1),
        );
        let sales = self.db.sales().all(&filter).await?;
        Ok(metrics::top_products(&sales, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sellpoint_core::{Money, NewProduct, PaymentMethod, SaleDraft, SnapshotLine};
    use sellpoint_db::DbConfig;

    fn draft(method: PaymentMethod, name: &str, qty: i64, cents: i64) -> SaleDraft {
        let total = Money::from_cents(cents * qty);
        SaleDraft {
            employee_id: "emp-1".into(),
            lines: vec![SnapshotLine {
                name: name.into(),
                quantity: qty,
                unit_price: Money::from_cents(cents),
                line_total: total,
            }],
            payment_method: method,
            status: method.initial_status(),
            notes: None,
            amount_tendered: None,
            change: None,
            subtotal: total,
            tax: Money::zero(),
            grand_total: total,
            client_id: None,
        }
    }

    async fn setup() -> (DashboardService, Database) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for (name, stock) in [("Mouse", 12), ("Cable", 4)] {
            let p = db
                .products()
                .insert(&NewProduct {
                    name: name.into(),
                    description: None,
                    price: Money::from_cents(1000),
                })
                .await
                .unwrap();
            db.stock().set(&p.id, stock).await.unwrap();
        }

        let sales = db.sales();
        sales.insert(&draft(PaymentMethod::Cash, "Mouse", 2, 2999)).await.unwrap();
        sales.insert(&draft(PaymentMethod::Cash, "Cable", 1, 500)).await.unwrap();
        sales.insert(&draft(PaymentMethod::CreditCard, "Mouse", 1, 2999)).await.unwrap();

        (DashboardService::new(db.clone(), 10), db)
    }

    #[tokio::test]
    async fn test_main_kpis() {
        let (dashboard, _db) = setup().await;
        let kpis = dashboard.main_kpis(30).await.unwrap();

        assert_eq!(kpis.total_sales, 3);
        assert_eq!(kpis.total_revenue.cents(), 5998 + 500 + 2999);
        assert_eq!(kpis.average_sale.cents(), 3166);
        // No sales in the previous window.
        assert_eq!(kpis.revenue_growth, 0.0);
        assert_eq!(kpis.total_products, 2);
        assert_eq!(kpis.total_stock, 16);
        assert_eq!(kpis.low_stock_products, 1);
        assert_eq!(kpis.total_clients, 0);
        assert_eq!(kpis.period_days, 30);

        assert_eq!(kpis.payment_methods[0].method, PaymentMethod::Cash);
        assert_eq!(kpis.payment_methods[0].count, 2);
    }

    #[tokio::test]
    async fn test_daily_and_top_products() {
        let (dashboard, _db) = setup().await;

        let days = dashboard.sales_by_day(7).await.unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].sales_count, 3);
        assert_eq!(days[0].date, Utc::now().date_naive());

        let top = dashboard.top_products(7, 5).await.unwrap();
        assert_eq!(top[0].name, "Mouse");
        assert_eq!(top[0].quantity_sold, 3);
        assert_eq!(top[0].revenue.cents(), 8997);
        assert_eq!(top[1].name, "Cable");
    }
}
