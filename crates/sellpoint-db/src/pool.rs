//! # Connection Pool
//!
//! [`Database`] owns the SQLite pool and hands out repositories.
//!
//! ```text
//! DbConfig::new("sellpoint.db")          DbConfig::in_memory()
//!   WAL, synchronous=NORMAL                one connection, never recycled
//!   up to max_connections                  fresh schema per Database
//!            │                                      │
//!            └──────────► Database::new ◄───────────┘
//!                              │ migrations
//!                              ▼
//!          products() stock() sales() clients() notifications()
//!                              │
//!                       begin() ──► BEGIN IMMEDIATE transaction
//! ```
//!
//! Foreign keys are switched on for every connection; SQLite leaves them
//! off unless asked.
//!
//! ## Transactions
//! Every transaction this crate opens takes the write lock up front. A
//! deferred transaction that has read under WAL cannot later upgrade to a
//! writer once another connection committed, and SQLite fails it with
//! "database is locked" without consulting the busy timeout. Starting
//! with `BEGIN IMMEDIATE` makes contending writers queue on the busy
//! timeout instead.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::client::ClientRepository;
use crate::repository::notification::NotificationRepository;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::stock::StockRepository;

const IN_MEMORY: &str = ":memory:";
const MAX_CONNECTION_LIFETIME: Duration = Duration::from_secs(30 * 60);
const BEGIN_IMMEDIATE: &str = "BEGIN IMMEDIATE";

/// Opens a write transaction on `pool`.
pub(crate) async fn begin_immediate(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    pool.begin_with(BEGIN_IMMEDIATE)
        .await
        .map_err(|e| DbError::TransactionFailed(e.to_string()))
}

// =============================================================================
// Configuration
// =============================================================================

/// Where the database lives and how many connections it may use.
///
/// ```rust
/// use sellpoint_db::DbConfig;
///
/// let config = DbConfig::new("/var/lib/sellpoint/sellpoint.db").max_connections(8);
/// assert_eq!(config.max_connections, 8);
/// assert!(config.run_migrations);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, or `:memory:`.
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Acquire timeout for the pool and busy timeout for SQLite locks.
    pub connect_timeout: Duration,
    /// `None` keeps idle connections open.
    pub idle_timeout: Option<Duration>,
    pub run_migrations: bool,
}

impl DbConfig {
    /// File-backed database, created on first connect.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            run_migrations: true,
        }
    }

    /// Private database for tests and demos.
    ///
    /// Every `:memory:` connection is a separate database, so the pool is
    /// pinned to a single connection that is never closed.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(IN_MEMORY)
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let connection_failed = |e: sqlx::Error| DbError::ConnectionFailed(e.to_string());

        if self.is_in_memory() {
            return Ok(SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(connection_failed)?
                .foreign_keys(true));
        }

        let url = format!("sqlite://{}?mode=rwc", self.database_path.display());
        Ok(SqliteConnectOptions::from_str(&url)
            .map_err(connection_failed)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.connect_timeout))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the store. Clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening database");

        let options = config.connect_options()?;
        let lifetime = (!config.is_in_memory()).then_some(MAX_CONNECTION_LIFETIME);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(lifetime)
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(
            max_connections = config.max_connections,
            in_memory = config.is_in_memory(),
            "Pool ready"
        );

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// `(embedded, applied)` migration counts.
    pub async fn migration_status(&self) -> DbResult<(usize, usize)> {
        migrations::migration_status(&self.pool).await
    }

    /// Raw pool, for statements no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Starts a write transaction. Pass `&mut *tx` to the repositories'
    /// `*_in` functions so every statement runs on the transaction's
    /// connection.
    pub async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        begin_immediate(&self.pool).await
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn stock(&self) -> StockRepository {
        StockRepository::new(self.pool.clone())
    }

    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    pub fn clients(&self) -> ClientRepository {
        ClientRepository::new(self.pool.clone())
    }

    pub fn notifications(&self) -> NotificationRepository {
        NotificationRepository::new(self.pool.clone())
    }

    /// Waits for checked-out connections and closes the pool.
    pub async fn close(&self) {
        info!("Closing database");
        self.pool.close().await;
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sellpoint_core::{Money, NewProduct};

    #[tokio::test]
    async fn test_in_memory_database_is_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);
        let (embedded, applied) = db.migration_status().await.unwrap();
        assert_eq!(embedded, applied);
        assert!(embedded >= 1);
    }

    #[tokio::test]
    async fn test_in_memory_databases_are_isolated() {
        let a = Database::new(DbConfig::in_memory()).await.unwrap();
        let b = Database::new(DbConfig::in_memory()).await.unwrap();

        sqlx::query("INSERT INTO products (id, name, price, is_active, created_at, updated_at) VALUES ('p-1', 'Mouse', 2999, 1, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')")
            .execute(a.pool())
            .await
            .unwrap();

        assert!(a.products().get_by_id("p-1").await.unwrap().is_some());
        assert!(b.products().get_by_id("p-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_closed_pool_is_unhealthy() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;
        assert!(!db.health_check().await);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/sellpoint-test.db")
            .max_connections(10)
            .min_connections(2)
            .run_migrations(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(!config.run_migrations);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
        assert!(DbConfig::in_memory().idle_timeout.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_read_then_write_transactions_all_commit() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("sellpoint.db")).max_connections(8))
            .await
            .unwrap();
        let product = db
            .products()
            .insert(&NewProduct {
                name: "Mouse".to_string(),
                description: None,
                price: Money::from_cents(2999),
            })
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = db.clone();
            let id = product.id.clone();
            handles.push(tokio::spawn(async move {
                let mut tx = db.begin().await?;
                let current = StockRepository::quantity_in(&mut *tx, &id).await?.unwrap_or(0);
                tokio::task::yield_now().await;
                sqlx::query("UPDATE stock_levels SET quantity = ?2 WHERE product_id = ?1")
                    .bind(&id)
                    .bind(current + 1)
                    .execute(&mut *tx)
                    .await?;
                tx.commit()
                    .await
                    .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
                Ok::<_, DbError>(())
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Serialized read-modify-write: no increment lost, none rejected.
        assert_eq!(db.stock().get(&product.id).await.unwrap().unwrap().quantity, 8);
        db.close().await;
    }
}
