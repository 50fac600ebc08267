//! # Sale Repository
//!
//! Database operations for sale records.
//!
//! ## Sale Record Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Record Lifecycle                             │
//! │                                                                         │
//! │  1. DRAFT (in memory)                                                  │
//! │     └── SaleDraft { lines, totals, payment, status }                   │
//! │                                                                         │
//! │  2. INSERT (inside the checkout transaction)                           │
//! │     └── insert_in() → receipt YYYYMMDD-NNNN, lines → JSON `detail`     │
//! │                                                                         │
//! │  3. READ                                                               │
//! │     └── get_by_id() / list() / aggregates for the dashboard            │
//! │                                                                         │
//! │  There is no step 4. UPDATE and DELETE are rejected by triggers.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The itemized lines are a snapshot: they keep the name and price as sold
//! and carry no reference to the product row.

use chrono::{NaiveDate, Utc};
use sellpoint_core::filter::{Page, SaleFilter};
use sellpoint_core::metrics::{DailySales, PaymentBreakdown};
use sellpoint_core::{Money, PaymentMethod, SaleDraft, SaleRecord, SaleStatus, SnapshotLine};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::begin_immediate;

const SALE_SELECT: &str = r#"
    SELECT
        id,
        receipt_number,
        employee_id,
        detail,
        payment_method,
        status,
        notes,
        amount_tendered,
        change_due,
        subtotal,
        tax,
        grand_total,
        client_id,
        created_at
    FROM sales
"#;

/// Raw `sales` row. `detail` still holds the JSON snapshot.
#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    receipt_number: String,
    employee_id: String,
    detail: String,
    payment_method: PaymentMethod,
    status: SaleStatus,
    notes: Option<String>,
    amount_tendered: Option<Money>,
    change_due: Option<Money>,
    subtotal: Money,
    tax: Money,
    grand_total: Money,
    client_id: Option<String>,
    created_at: chrono::DateTime<Utc>,
}

impl TryFrom<SaleRow> for SaleRecord {
    type Error = DbError;

    fn try_from(row: SaleRow) -> DbResult<Self> {
        let lines: Vec<SnapshotLine> = serde_json::from_str(&row.detail)?;

        Ok(SaleRecord {
            id: row.id,
            receipt_number: row.receipt_number,
            employee_id: row.employee_id,
            lines,
            payment_method: row.payment_method,
            status: row.status,
            notes: row.notes,
            amount_tendered: row.amount_tendered,
            change: row.change_due,
            subtotal: row.subtotal,
            tax: row.tax,
            grand_total: row.grand_total,
            client_id: row.client_id,
            created_at: row.created_at,
        })
    }
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Writes a sale in its own transaction.
    pub async fn insert(&self, draft: &SaleDraft) -> DbResult<SaleRecord> {
        let mut tx = begin_immediate(&self.pool).await?;

        let record = Self::insert_in(&mut tx, draft).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(record)
    }

    /// Writes a sale on the caller's connection or transaction.
    ///
    /// Generates the ID and the receipt number. The receipt counter restarts
    /// every UTC day: `20261016-0001`, `20261016-0002`, ...
    pub async fn insert_in(conn: &mut SqliteConnection, draft: &SaleDraft) -> DbResult<SaleRecord> {
        let now = Utc::now();
        let day = now.format("%Y%m%d").to_string();

        let issued_today: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE receipt_number LIKE ?1 || '-%'")
                .bind(&day)
                .fetch_one(&mut *conn)
                .await?;
        let receipt_number = format!("{}-{:04}", day, issued_today + 1);

        let id = Uuid::new_v4().to_string();
        let detail = serde_json::to_string(&draft.lines)?;

        debug!(
            id = %id,
            receipt = %receipt_number,
            lines = draft.lines.len(),
            "Inserting sale"
        );

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, receipt_number, employee_id, detail, payment_method, status, notes,
                amount_tendered, change_due, subtotal, tax, grand_total, client_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&id)
        .bind(&receipt_number)
        .bind(&draft.employee_id)
        .bind(&detail)
        .bind(draft.payment_method)
        .bind(draft.status)
        .bind(&draft.notes)
        .bind(draft.amount_tendered)
        .bind(draft.change)
        .bind(draft.subtotal)
        .bind(draft.tax)
        .bind(draft.grand_total)
        .bind(&draft.client_id)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(&receipt_number))?;

        info!(
            id = %id,
            receipt = %receipt_number,
            total = %draft.grand_total,
            method = %draft.payment_method.as_str(),
            "Sale recorded"
        );

        Ok(SaleRecord {
            id,
            receipt_number,
            employee_id: draft.employee_id.clone(),
            lines: draft.lines.clone(),
            payment_method: draft.payment_method,
            status: draft.status,
            notes: draft.notes.clone(),
            amount_tendered: draft.amount_tendered,
            change: draft.change,
            subtotal: draft.subtotal,
            tax: draft.tax,
            grand_total: draft.grand_total,
            client_id: draft.client_id.clone(),
            created_at: now,
        })
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<SaleRecord>> {
        let sql = format!("{SALE_SELECT} WHERE id = ?1");
        let row = sqlx::query_as::<_, SaleRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(SaleRecord::try_from).transpose()
    }

    /// Gets a sale by its receipt number.
    pub async fn get_by_receipt(&self, receipt_number: &str) -> DbResult<Option<SaleRecord>> {
        let sql = format!("{SALE_SELECT} WHERE receipt_number = ?1");
        let row = sqlx::query_as::<_, SaleRow>(&sql)
            .bind(receipt_number)
            .fetch_optional(&self.pool)
            .await?;

        row.map(SaleRecord::try_from).transpose()
    }

    /// Lists sales matching `filter`, newest first.
    pub async fn list(&self, filter: &SaleFilter, page: Page) -> DbResult<Vec<SaleRecord>> {
        let mut builder = QueryBuilder::<Sqlite>::new(SALE_SELECT);
        push_conditions(&mut builder, filter);
        builder.push(" ORDER BY created_at DESC, receipt_number DESC LIMIT ");
        builder.push_bind(i64::from(page.limit));
        builder.push(" OFFSET ");
        builder.push_bind(i64::from(page.offset));

        let rows = builder
            .build_query_as::<SaleRow>()
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Listed sales");
        rows.into_iter().map(SaleRecord::try_from).collect()
    }

    /// Every sale matching `filter`, oldest first. For reports over a
    /// bounded window.
    pub async fn all(&self, filter: &SaleFilter) -> DbResult<Vec<SaleRecord>> {
        let mut builder = QueryBuilder::<Sqlite>::new(SALE_SELECT);
        push_conditions(&mut builder, filter);
        builder.push(" ORDER BY created_at, receipt_number");

        let rows = builder
            .build_query_as::<SaleRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(SaleRecord::try_from).collect()
    }

    /// Counts sales matching `filter`.
    pub async fn count(&self, filter: &SaleFilter) -> DbResult<i64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM sales");
        push_conditions(&mut builder, filter);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// `(sales count, revenue)` for sales matching `filter`.
    pub async fn totals(&self, filter: &SaleFilter) -> DbResult<(i64, Money)> {
        let mut builder =
            QueryBuilder::<Sqlite>::new("SELECT COUNT(*), COALESCE(SUM(grand_total), 0) FROM sales");
        push_conditions(&mut builder, filter);

        let (count, revenue): (i64, i64) = builder
            .build_query_as()
            .fetch_one(&self.pool)
            .await?;

        Ok((count, Money::from_cents(revenue)))
    }

    /// Sales count and revenue per payment method, highest revenue first.
    pub async fn payment_breakdown(&self, filter: &SaleFilter) -> DbResult<Vec<PaymentBreakdown>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT payment_method, COUNT(*), COALESCE(SUM(grand_total), 0) FROM sales",
        );
        push_conditions(&mut builder, filter);
        builder.push(" GROUP BY payment_method ORDER BY 3 DESC, payment_method");

        let rows: Vec<(PaymentMethod, i64, i64)> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(method, count, revenue)| PaymentBreakdown {
                method,
                count,
                revenue: Money::from_cents(revenue),
            })
            .collect())
    }

    /// Sales count and revenue per UTC calendar day, oldest first. Days
    /// without sales are absent.
    pub async fn daily_totals(&self, filter: &SaleFilter) -> DbResult<Vec<DailySales>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT substr(created_at, 1, 10) AS day, COUNT(*), COALESCE(SUM(grand_total), 0) FROM sales",
        );
        push_conditions(&mut builder, filter);
        builder.push(" GROUP BY day ORDER BY day");

        let rows: Vec<(String, i64, i64)> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|(day, sales_count, revenue)| {
                let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                    .map_err(|e| DbError::Serialization(format!("bad sale date '{day}': {e}")))?;
                Ok(DailySales {
                    date,
                    sales_count,
                    revenue: Money::from_cents(revenue),
                })
            })
            .collect()
    }
}

fn push_conditions(builder: &mut QueryBuilder<'_, Sqlite>, filter: &SaleFilter) {
    builder.push(" WHERE 1 = 1");

    if let Some(from) = filter.from {
        builder.push(" AND created_at >= ");
        builder.push_bind(from);
    }
    if let Some(to) = filter.to {
        builder.push(" AND created_at < ");
        builder.push_bind(to);
    }
    if let Some(employee_id) = &filter.employee_id {
        builder.push(" AND employee_id = ");
        builder.push_bind(employee_id.clone());
    }
    if let Some(method) = filter.payment_method {
        builder.push(" AND payment_method = ");
        builder.push_bind(method);
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }
    if let Some(client_id) = &filter.client_id {
        builder.push(" AND client_id = ");
        builder.push_bind(client_id.clone());
    }
    if let Some(min) = filter.min_total {
        builder.push(" AND grand_total >= ");
        builder.push_bind(min);
    }
    if let Some(max) = filter.max_total {
        builder.push(" AND grand_total <= ");
        builder.push_bind(max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Duration;

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn mouse_draft(method: PaymentMethod) -> SaleDraft {
        let line = SnapshotLine {
            name: "Mouse".to_string(),
            quantity: 2,
            unit_price: Money::from_cents(2999),
            line_total: Money::from_cents(5998),
        };
        SaleDraft {
            employee_id: "emp-1".to_string(),
            lines: vec![line],
            payment_method: method,
            status: method.initial_status(),
            notes: None,
            amount_tendered: Some(Money::from_cents(7500)),
            change: Some(Money::from_cents(362)),
            subtotal: Money::from_cents(5998),
            tax: Money::from_cents(1140),
            grand_total: Money::from_cents(7138),
            client_id: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back_snapshot() {
        let db = setup().await;
        let record = db.sales().insert(&mouse_draft(PaymentMethod::Cash)).await.unwrap();

        let fetched = db.sales().get_by_id(&record.id).await.unwrap().unwrap();
        assert_eq!(fetched.lines, record.lines);
        assert_eq!(fetched.grand_total, Money::from_cents(7138));
        assert_eq!(fetched.change, Some(Money::from_cents(362)));
        assert_eq!(fetched.status, SaleStatus::Paid);
        assert_eq!(fetched.quantity_total(), 2);

        let by_receipt = db.sales().get_by_receipt(&record.receipt_number).await.unwrap();
        assert_eq!(by_receipt.map(|s| s.id), Some(record.id));
    }

    #[tokio::test]
    async fn test_receipt_numbers_count_up_per_day() {
        let db = setup().await;
        let first = db.sales().insert(&mouse_draft(PaymentMethod::Cash)).await.unwrap();
        let second = db.sales().insert(&mouse_draft(PaymentMethod::Cash)).await.unwrap();

        let day = Utc::now().format("%Y%m%d").to_string();
        assert_eq!(first.receipt_number, format!("{day}-0001"));
        assert_eq!(second.receipt_number, format!("{day}-0002"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_get_distinct_receipts() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("sellpoint.db")).max_connections(8))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let sales = db.sales();
            handles.push(tokio::spawn(async move {
                sales.insert(&mouse_draft(PaymentMethod::Cash)).await
            }));
        }

        let mut receipts = Vec::new();
        for handle in handles {
            receipts.push(handle.await.unwrap().unwrap().receipt_number);
        }
        receipts.sort();
        receipts.dedup();

        assert_eq!(receipts.len(), 8);
        assert!(receipts[7].ends_with("-0008"));
        db.close().await;
    }

    #[tokio::test]
    async fn test_sales_are_immutable() {
        let db = setup().await;
        let record = db.sales().insert(&mouse_draft(PaymentMethod::Cash)).await.unwrap();

        let update = sqlx::query("UPDATE sales SET notes = 'edited' WHERE id = ?1")
            .bind(&record.id)
            .execute(db.pool())
            .await;
        assert!(update.is_err());

        let delete = sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(&record.id)
            .execute(db.pool())
            .await;
        assert!(delete.is_err());

        assert!(db.sales().get_by_id(&record.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_filters_and_aggregates() {
        let db = setup().await;
        let sales = db.sales();
        sales.insert(&mouse_draft(PaymentMethod::Cash)).await.unwrap();
        sales.insert(&mouse_draft(PaymentMethod::Cash)).await.unwrap();
        let transfer = sales.insert(&mouse_draft(PaymentMethod::Transfer)).await.unwrap();
        assert_eq!(transfer.status, SaleStatus::Pending);

        let cash = SaleFilter::default().paid_with(PaymentMethod::Cash);
        assert_eq!(sales.count(&cash).await.unwrap(), 2);

        let pending = SaleFilter::default().status(SaleStatus::Pending);
        let listed = sales.list(&pending, Page::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, transfer.id);

        let now = Utc::now();
        let window = SaleFilter::default().between(now - Duration::hours(1), now + Duration::hours(1));
        let (count, revenue) = sales.totals(&window).await.unwrap();
        assert_eq!(count, 3);
        assert_eq!(revenue, Money::from_cents(3 * 7138));

        let future = SaleFilter::default().between(now + Duration::hours(1), now + Duration::hours(2));
        assert_eq!(sales.totals(&future).await.unwrap(), (0, Money::zero()));

        let breakdown = sales.payment_breakdown(&window).await.unwrap();
        assert_eq!(breakdown[0].method, PaymentMethod::Cash);
        assert_eq!(breakdown[0].count, 2);
        assert_eq!(breakdown[1].method, PaymentMethod::Transfer);

        let daily = sales.daily_totals(&window).await.unwrap();
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].sales_count, 3);
        assert_eq!(daily[0].date, now.date_naive());

        let page = sales.list(&SaleFilter::default(), Page::number(2, 2)).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(sales.all(&SaleFilter::default().employee("emp-1")).await.unwrap().len(), 3);
    }
}
