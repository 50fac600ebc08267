//! # Notification Outbox Repository
//!
//! Pending invoice e-mails, written in the same transaction as the sale.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Invoice Outbox                                       │
//! │                                                                         │
//! │  CHECKOUT                                                              │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │  1. UPDATE stock_levels ... (per product)                       │   │
//! │  │  2. INSERT INTO sales ...                                       │   │
//! │  │  3. INSERT INTO notification_outbox (sale_id, recipient, body)  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼  COMMIT: no sale, no e-mail. No e-mail lost for a sale.        │
//! │                                                                         │
//! │  DISPATCHER (background task)                                          │
//! │  1. get_pending(batch, max_attempts)                                   │
//! │  2. send → mark_sent(id)                                               │
//! │     fail → mark_failed(id, error)  (attempts += 1)                     │
//! │  3. cleanup_sent(days) drops delivered rows eventually                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Duration, Utc};
use sellpoint_core::NotificationEntry;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;

const ENTRY_SELECT: &str = r#"
    SELECT id, sale_id, recipient, subject, body, attempts, last_error,
           created_at, attempted_at, sent_at
    FROM notification_outbox
"#;

/// Outbox row contents before insertion.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub sale_id: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        NotificationRepository { pool }
    }

    /// Queues a notification on its own.
    pub async fn enqueue(&self, notification: &NewNotification) -> DbResult<NotificationEntry> {
        let mut conn = self.pool.acquire().await?;
        Self::enqueue_in(&mut conn, notification).await
    }

    /// Queues a notification inside the caller's transaction.
    pub async fn enqueue_in(
        conn: &mut SqliteConnection,
        notification: &NewNotification,
    ) -> DbResult<NotificationEntry> {
        let entry = NotificationEntry {
            id: Uuid::new_v4().to_string(),
            sale_id: notification.sale_id.clone(),
            recipient: notification.recipient.clone(),
            subject: notification.subject.clone(),
            body: notification.body.clone(),
            attempts: 0,
            last_error: None,
            created_at: Utc::now(),
            attempted_at: None,
            sent_at: None,
        };

        debug!(
            id = %entry.id,
            sale_id = %entry.sale_id,
            recipient = %entry.recipient,
            "Queuing notification"
        );

        sqlx::query(
            r#"
            INSERT INTO notification_outbox (id, sale_id, recipient, subject, body, attempts, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.sale_id)
        .bind(&entry.recipient)
        .bind(&entry.subject)
        .bind(&entry.body)
        .bind(entry.created_at)
        .execute(conn)
        .await?;

        Ok(entry)
    }

    /// Unsent entries with fewer than `max_attempts` failures, oldest first.
    pub async fn get_pending(&self, limit: u32, max_attempts: u32) -> DbResult<Vec<NotificationEntry>> {
        let sql = format!(
            "{ENTRY_SELECT} WHERE sent_at IS NULL AND attempts < ?1 ORDER BY created_at ASC LIMIT ?2"
        );
        let entries = sqlx::query_as::<_, NotificationEntry>(&sql)
            .bind(i64::from(max_attempts))
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// All outbox entries for one sale.
    pub async fn get_for_sale(&self, sale_id: &str) -> DbResult<Vec<NotificationEntry>> {
        let sql = format!("{ENTRY_SELECT} WHERE sale_id = ?1 ORDER BY created_at");
        let entries = sqlx::query_as::<_, NotificationEntry>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    pub async fn mark_sent(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query("UPDATE notification_outbox SET sent_at = ?2, attempted_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Records a delivery failure and bumps the attempt counter.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE notification_outbox SET
                attempts = attempts + 1,
                last_error = ?2,
                attempted_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Unsent entries, including ones that ran out of attempts.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notification_outbox WHERE sent_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Deletes entries delivered more than `days_old` days ago. Returns the
    /// number removed.
    pub async fn cleanup_sent(&self, days_old: u32) -> DbResult<u64> {
        let cutoff = Utc::now() - Duration::days(i64::from(days_old));

        let result = sqlx::query(
            "DELETE FROM notification_outbox WHERE sent_at IS NOT NULL AND sent_at < ?1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, DbError};
    use sellpoint_core::{Money, PaymentMethod, SaleDraft, SaleStatus};

    async fn setup_with_sale() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sale = db
            .sales()
            .insert(&SaleDraft {
                employee_id: "emp-1".to_string(),
                lines: Vec::new(),
                payment_method: PaymentMethod::Cash,
                status: SaleStatus::Paid,
                notes: None,
                amount_tendered: None,
                change: None,
                subtotal: Money::zero(),
                tax: Money::zero(),
                grand_total: Money::zero(),
                client_id: None,
            })
            .await
            .unwrap();
        (db, sale.id)
    }

    fn invoice(sale_id: &str) -> NewNotification {
        NewNotification {
            sale_id: sale_id.to_string(),
            recipient: "ana@example.com".to_string(),
            subject: "Your receipt".to_string(),
            body: "Thanks".to_string(),
        }
    }

    #[tokio::test]
    async fn test_pending_then_sent() {
        let (db, sale_id) = setup_with_sale().await;
        let repo = db.notifications();
        let entry = repo.enqueue(&invoice(&sale_id)).await.unwrap();

        assert_eq!(repo.count_pending().await.unwrap(), 1);
        let pending = repo.get_pending(10, 5).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, entry.id);

        repo.mark_sent(&entry.id).await.unwrap();
        assert_eq!(repo.count_pending().await.unwrap(), 0);
        assert!(repo.get_pending(10, 5).await.unwrap().is_empty());

        let all = repo.get_for_sale(&sale_id).await.unwrap();
        assert!(all[0].sent_at.is_some());

        // Sent just now, so not older than a day.
        assert_eq!(repo.cleanup_sent(1).await.unwrap(), 0);
        assert_eq!(repo.cleanup_sent(0).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failures_exhaust_attempts() {
        let (db, sale_id) = setup_with_sale().await;
        let repo = db.notifications();
        let entry = repo.enqueue(&invoice(&sale_id)).await.unwrap();

        repo.mark_failed(&entry.id, "smtp down").await.unwrap();
        repo.mark_failed(&entry.id, "smtp down").await.unwrap();

        let pending = repo.get_pending(10, 3).await.unwrap();
        assert_eq!(pending[0].attempts, 2);
        assert_eq!(pending[0].last_error.as_deref(), Some("smtp down"));

        repo.mark_failed(&entry.id, "smtp down").await.unwrap();
        assert!(repo.get_pending(10, 3).await.unwrap().is_empty());
        assert_eq!(repo.count_pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_sale_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.notifications().enqueue(&invoice("no-such-sale")).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
