//! # Product Repository
//!
//! Catalog access. Every product read joins its stock level so callers get
//! `current_stock` without a second query.
//!
//! ## Listing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    ProductFilter → WHERE clause                         │
//! │                                                                         │
//! │  name_contains  "mou"     → instr(LOWER(p.name), LOWER('mou')) > 0     │
//! │  min/max_price            → p.price >= ? / p.price <= ?                │
//! │  stock_status   OutOfStock→ quantity <= 0                              │
//! │                 Low       → quantity > 0 AND quantity < threshold      │
//! │                 InStock   → quantity >= threshold                      │
//! │  include_inactive = false → p.is_active = 1                            │
//! │                                                                         │
//! │  ORDER BY p.name, then LIMIT/OFFSET from Page                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sellpoint_core::filter::{Page, ProductFilter};
use sellpoint_core::stock::StockStatus;
use sellpoint_core::{NewProduct, Product, ProductUpdate};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::begin_immediate;

/// Columns of [`Product`], with the stock level folded in.
const PRODUCT_SELECT: &str = r#"
    SELECT
        p.id,
        p.name,
        p.description,
        p.price,
        COALESCE(s.quantity, 0) AS current_stock,
        p.is_active,
        p.created_at,
        p.updated_at
    FROM products p
    LEFT JOIN stock_levels s ON s.product_id = p.id
"#;

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a product together with its zero stock row.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The stored product, `current_stock == 0`
    /// * `Err(DbError::UniqueViolation)` - The name is taken (case-insensitive)
    pub async fn insert(&self, product: &NewProduct) -> DbResult<Product> {
        debug!(name = %product.name, price = %product.price, "Inserting product");

        let now = Utc::now();
        let id = generate_product_id();

        let mut tx = begin_immediate(&self.pool).await?;

        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)
            "#,
        )
        .bind(&id)
        .bind(product.name.trim())
        .bind(&product.description)
        .bind(product.price)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(product.name.trim()))?;

        sqlx::query("INSERT INTO stock_levels (product_id, quantity, updated_at) VALUES (?1, 0, ?2)")
            .bind(&id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(id = %id, name = %product.name, "Product created");

        Ok(Product {
            id,
            name: product.name.trim().to_string(),
            description: product.description.clone(),
            price: product.price,
            current_stock: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Gets a product by its ID, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_by_id_in(&mut conn, id).await
    }

    /// [`get_by_id`](Self::get_by_id) on an existing connection or transaction.
    pub async fn get_by_id_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("{PRODUCT_SELECT} WHERE p.id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(product)
    }

    /// Gets a product by exact name (case-insensitive).
    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<Product>> {
        let sql = format!("{PRODUCT_SELECT} WHERE p.name = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Fetches several products at once. Unknown IDs are simply absent from
    /// the result.
    pub async fn get_many(&self, ids: &[String]) -> DbResult<Vec<Product>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_many_in(&mut conn, ids).await
    }

    /// [`get_many`](Self::get_many) on an existing connection or transaction.
    pub async fn get_many_in(conn: &mut SqliteConnection, ids: &[String]) -> DbResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(PRODUCT_SELECT);
        builder.push(" WHERE p.id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(") ORDER BY p.id");

        let products = builder
            .build_query_as::<Product>()
            .fetch_all(conn)
            .await?;

        Ok(products)
    }

    /// Applies the set fields of `update`. Fields left `None` keep their value.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - No product with this ID
    /// * `Err(DbError::UniqueViolation)` - The new name is taken
    pub async fn update(&self, id: &str, update: &ProductUpdate) -> DbResult<Product> {
        debug!(id = %id, "Updating product");

        let name = update.name.as_deref().map(str::trim);

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = COALESCE(?2, name),
                description = COALESCE(?3, description),
                price = COALESCE(?4, price),
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(&update.description)
        .bind(update.price)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(name.unwrap_or_default()))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Soft-deletes a product by setting `is_active = 0`.
    ///
    /// Sale snapshots don't reference products, so history is unaffected.
    /// The stock row is kept.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(id = %id, "Product deactivated");
        Ok(())
    }

    /// Lists products matching `filter`, ordered by name.
    pub async fn list(&self, filter: &ProductFilter, page: Page) -> DbResult<Vec<Product>> {
        let mut builder = QueryBuilder::<Sqlite>::new(PRODUCT_SELECT);
        push_conditions(&mut builder, filter);
        builder.push(" ORDER BY p.name LIMIT ");
        builder.push_bind(i64::from(page.limit));
        builder.push(" OFFSET ");
        builder.push_bind(i64::from(page.offset));

        let products = builder
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Counts products matching `filter`.
    pub async fn count(&self, filter: &ProductFilter) -> DbResult<i64> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) FROM products p LEFT JOIN stock_levels s ON s.product_id = p.id",
        );
        push_conditions(&mut builder, filter);

        let count: i64 = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Appends the `WHERE` clause for `filter`. Always emits `WHERE 1 = 1` so
/// every condition can start with `AND`.
fn push_conditions(builder: &mut QueryBuilder<'_, Sqlite>, filter: &ProductFilter) {
    builder.push(" WHERE 1 = 1");

    if !filter.include_inactive {
        builder.push(" AND p.is_active = 1");
    }

    if let Some(needle) = filter.name_contains.as_deref().map(str::trim) {
        if !needle.is_empty() {
            builder.push(" AND instr(LOWER(p.name), LOWER(");
            builder.push_bind(needle.to_string());
            builder.push(")) > 0");
        }
    }

    if let Some(min) = filter.min_price {
        builder.push(" AND p.price >= ");
        builder.push_bind(min);
    }

    if let Some(max) = filter.max_price {
        builder.push(" AND p.price <= ");
        builder.push_bind(max);
    }

    match filter.stock_status {
        Some(StockStatus::OutOfStock) => {
            builder.push(" AND COALESCE(s.quantity, 0) <= 0");
        }
        Some(StockStatus::Low) => {
            builder.push(" AND COALESCE(s.quantity, 0) > 0 AND COALESCE(s.quantity, 0) < ");
            builder.push_bind(filter.low_stock_threshold);
        }
        Some(StockStatus::InStock) => {
            builder.push(" AND COALESCE(s.quantity, 0) >= ");
            builder.push_bind(filter.low_stock_threshold);
        }
        None => {}
    }
}

/// Generates a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use sellpoint_core::Money;

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn new_product(name: &str, cents: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: None,
            price: Money::from_cents(cents),
        }
    }

    #[tokio::test]
    async fn test_insert_creates_zero_stock_row() {
        let db = setup().await;
        let mouse = db.products().insert(&new_product("Mouse", 2999)).await.unwrap();

        assert_eq!(mouse.current_stock, 0);
        let level = db.stock().get(&mouse.id).await.unwrap().unwrap();
        assert_eq!(level.quantity, 0);

        let fetched = db.products().get_by_id(&mouse.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Mouse");
        assert_eq!(fetched.price, Money::from_cents(2999));
    }

    #[tokio::test]
    async fn test_duplicate_name_is_rejected() {
        let db = setup().await;
        db.products().insert(&new_product("Mouse", 2999)).await.unwrap();

        let err = db.products().insert(&new_product("mouse", 1000)).await.unwrap_err();
        match err {
            DbError::UniqueViolation { value, .. } => assert_eq!(value, "mouse"),
            other => panic!("expected UniqueViolation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_by_name_ignores_case() {
        let db = setup().await;
        db.products().insert(&new_product("Keyboard", 4999)).await.unwrap();

        let found = db.products().get_by_name("KEYBOARD").await.unwrap();
        assert!(found.is_some());
        assert!(db.products().get_by_name("Monitor").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_and_soft_delete() {
        let db = setup().await;
        let repo = db.products();
        let mouse = repo.insert(&new_product("Mouse", 2999)).await.unwrap();

        let updated = repo
            .update(
                &mouse.id,
                &ProductUpdate {
                    price: Some(Money::from_cents(2499)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price, Money::from_cents(2499));
        assert_eq!(updated.name, "Mouse");

        repo.soft_delete(&mouse.id).await.unwrap();
        let listed = repo.list(&ProductFilter::default(), Page::first(25)).await.unwrap();
        assert!(listed.is_empty());

        let mut filter = ProductFilter::default();
        filter.include_inactive = true;
        assert_eq!(repo.count(&filter).await.unwrap(), 1);

        let err = repo.soft_delete("missing").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = setup().await;
        let repo = db.products();
        let mouse = repo.insert(&new_product("Mouse", 2999)).await.unwrap();
        let pad = repo.insert(&new_product("Mouse Pad", 999)).await.unwrap();
        repo.insert(&new_product("Monitor", 19999)).await.unwrap();

        db.stock().set(&mouse.id, 50).await.unwrap();
        db.stock().set(&pad.id, 3).await.unwrap();

        let by_name = repo
            .list(&ProductFilter::default().name("mouse"), Page::first(25))
            .await
            .unwrap();
        assert_eq!(by_name.len(), 2);
        assert_eq!(by_name[0].name, "Mouse");

        let cheap = repo
            .list(
                &ProductFilter::default().price_between(Money::zero(), Money::from_cents(3000)),
                Page::first(25),
            )
            .await
            .unwrap();
        assert_eq!(cheap.len(), 2);

        let low = repo
            .list(&ProductFilter::default().stock(StockStatus::Low), Page::first(25))
            .await
            .unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].id, pad.id);

        let out = ProductFilter::default().stock(StockStatus::OutOfStock);
        assert_eq!(repo.count(&out).await.unwrap(), 1);

        let in_stock = ProductFilter::default().stock(StockStatus::InStock);
        assert_eq!(repo.count(&in_stock).await.unwrap(), 1);

        let page_two = repo.list(&ProductFilter::default(), Page::number(2, 2)).await.unwrap();
        assert_eq!(page_two.len(), 1);
    }

    #[tokio::test]
    async fn test_get_many_skips_unknown_ids() {
        let db = setup().await;
        let a = db.products().insert(&new_product("A", 100)).await.unwrap();
        let b = db.products().insert(&new_product("B", 200)).await.unwrap();

        let found = db
            .products()
            .get_many(&[a.id.clone(), "nope".to_string(), b.id.clone()])
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert!(db.products().get_many(&[]).await.unwrap().is_empty());
    }
}
