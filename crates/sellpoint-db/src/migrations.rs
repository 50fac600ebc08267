//! # Schema Migrations
//!
//! SQL files under `migrations/sqlite/` are compiled into the binary and
//! applied by [`Database::new`](crate::Database::new).
//!
//! ```text
//! 001_initial_schema.sql
//!   products ──1:1── stock_levels
//!      │
//!   sales (immutable, JSON detail) ──1:n── notification_outbox
//!      │
//!   clients
//! ```
//!
//! Applied files are checksummed in `_sqlx_migrations`; change the schema by
//! adding `NNN_description.sql`, never by editing an applied file.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!(embedded = MIGRATOR.migrations.len(), "Applying migrations");
    MIGRATOR.run(pool).await?;
    info!(version = latest_version(), "Schema up to date");
    Ok(())
}

/// `(embedded, applied)`. A database that was never migrated reports zero
/// applied.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((MIGRATOR.migrations.len(), usize::try_from(applied).unwrap_or(0)))
}

fn latest_version() -> i64 {
    MIGRATOR.migrations.iter().map(|m| m.version).max().unwrap_or(0)
}
