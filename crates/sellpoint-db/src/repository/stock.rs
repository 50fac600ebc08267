//! # Stock Repository
//!
//! On-hand quantities, one row per product in `stock_levels`.
//!
//! ## Conditional Subtract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Why subtract is a single UPDATE                      │
//! │                                                                         │
//! │  Checkout A: sells 2 ─┐                                                │
//! │                        ├──► UPDATE ... SET quantity = quantity - ?     │
//! │  Checkout B: sells 2 ─┘          WHERE product_id = ? AND quantity >= ?│
//! │                                                                         │
//! │  Stock = 3:  A matches the row → 1 left                                │
//! │              B matches nothing → Insufficient { available: 1 }         │
//! │                                                                         │
//! │  The check and the write are one statement, so no interleaving can    │
//! │  take the quantity below zero.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sellpoint_core::stock::{StockSummary, MAX_RESTOCK_SUGGESTIONS};
use sellpoint_core::{Product, StockLevel};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

/// Result of a conditional subtract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtractOutcome {
    /// The quantity was taken; this is the new level.
    Applied(StockLevel),
    /// Not enough on hand. Nothing changed.
    Insufficient { available: i64 },
    /// No stock row for this product.
    Missing,
}

/// Result of a bounded add.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Applied(StockLevel),
    /// `current + delta` would overflow. Nothing changed.
    Overflow { current: i64 },
    Missing,
}

/// Repository for stock level operations.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Gets the stock level of a product.
    pub async fn get(&self, product_id: &str) -> DbResult<Option<StockLevel>> {
        let level = sqlx::query_as::<_, StockLevel>(
            "SELECT product_id, quantity, updated_at FROM stock_levels WHERE product_id = ?1",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(level)
    }

    /// Current quantity, read through an existing connection or transaction.
    pub async fn quantity_in(conn: &mut SqliteConnection, product_id: &str) -> DbResult<Option<i64>> {
        let quantity: Option<i64> =
            sqlx::query_scalar("SELECT quantity FROM stock_levels WHERE product_id = ?1")
                .bind(product_id)
                .fetch_optional(conn)
                .await?;

        Ok(quantity)
    }

    /// Adds `delta` units, unless the result would not fit in an `i64`.
    pub async fn add(&self, product_id: &str, delta: i64) -> DbResult<AddOutcome> {
        debug!(product_id = %product_id, delta, "Adding stock");

        let mut conn = self.pool.acquire().await?;
        let applied = sqlx::query_as::<_, StockLevel>(
            r#"
            UPDATE stock_levels
            SET quantity = quantity + ?2, updated_at = ?3
            WHERE product_id = ?1 AND quantity <= ?4 - ?2
            RETURNING product_id, quantity, updated_at
            "#,
        )
        .bind(product_id)
        .bind(delta)
        .bind(Utc::now())
        .bind(i64::MAX)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(level) = applied {
            return Ok(AddOutcome::Applied(level));
        }

        Ok(match Self::quantity_in(&mut conn, product_id).await? {
            Some(current) => AddOutcome::Overflow { current },
            None => AddOutcome::Missing,
        })
    }

    /// Overwrites the quantity. `None` when the product has no stock row.
    pub async fn set(&self, product_id: &str, quantity: i64) -> DbResult<Option<StockLevel>> {
        debug!(product_id = %product_id, quantity, "Setting stock");

        let level = sqlx::query_as::<_, StockLevel>(
            r#"
            UPDATE stock_levels
            SET quantity = ?2, updated_at = ?3
            WHERE product_id = ?1
            RETURNING product_id, quantity, updated_at
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(level)
    }

    /// Takes `quantity` units if at least that many are on hand.
    pub async fn subtract(&self, product_id: &str, quantity: i64) -> DbResult<SubtractOutcome> {
        let mut conn = self.pool.acquire().await?;
        Self::subtract_in(&mut conn, product_id, quantity).await
    }

    /// [`subtract`](Self::subtract) inside a caller's transaction. Checkout
    /// uses this so every decrement commits or rolls back with the sale.
    pub async fn subtract_in(
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<SubtractOutcome> {
        debug!(product_id = %product_id, quantity, "Subtracting stock");

        let applied = sqlx::query_as::<_, StockLevel>(
            r#"
            UPDATE stock_levels
            SET quantity = quantity - ?2, updated_at = ?3
            WHERE product_id = ?1 AND quantity >= ?2
            RETURNING product_id, quantity, updated_at
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(level) = applied {
            return Ok(SubtractOutcome::Applied(level));
        }

        // Nothing matched: either the row is missing or it holds too little.
        Ok(match Self::quantity_in(conn, product_id).await? {
            Some(available) => SubtractOutcome::Insufficient { available },
            None => SubtractOutcome::Missing,
        })
    }

    /// Sum of on-hand units across active products.
    pub async fn total_units(&self) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(s.quantity), 0)
            FROM stock_levels s
            JOIN products p ON p.id = s.product_id
            WHERE p.is_active = 1
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    /// Active products with fewer than `threshold` units, lowest first.
    /// Includes empty products.
    pub async fn below_threshold(&self, threshold: i64) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT p.id, p.name, p.description, p.price, s.quantity AS current_stock,
                   p.is_active, p.created_at, p.updated_at
            FROM products p
            JOIN stock_levels s ON s.product_id = p.id
            WHERE p.is_active = 1 AND s.quantity < ?1
            ORDER BY s.quantity, p.name
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Inventory overview for active products.
    ///
    /// Low stock means above zero and below `threshold`. Each product list
    /// is capped at ten entries; the counts are not.
    pub async fn summary(&self, threshold: i64) -> DbResult<StockSummary> {
        let (total_units, low_stock_count, out_of_stock_count): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(s.quantity), 0),
                COALESCE(SUM(CASE WHEN s.quantity > 0 AND s.quantity < ?1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN s.quantity <= 0 THEN 1 ELSE 0 END), 0)
            FROM stock_levels s
            JOIN products p ON p.id = s.product_id
            WHERE p.is_active = 1
            "#,
        )
        .bind(threshold)
        .fetch_one(&self.pool)
        .await?;

        let below = self.below_threshold(threshold).await?;
        let (mut out_of_stock_products, mut low_stock_products): (Vec<Product>, Vec<Product>) =
            below.into_iter().partition(|p| p.current_stock <= 0);

        low_stock_products.truncate(MAX_RESTOCK_SUGGESTIONS);
        out_of_stock_products.sort_by(|a, b| a.name.cmp(&b.name));
        out_of_stock_products.truncate(MAX_RESTOCK_SUGGESTIONS);

        Ok(StockSummary {
            total_units,
            low_stock_count,
            out_of_stock_count,
            low_stock_products,
            out_of_stock_products,
        })
    }
}
