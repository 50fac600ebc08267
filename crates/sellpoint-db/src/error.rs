//! # Database Error Types
//!
//! What can go wrong between a repository call and the SQLite file.
//!
//! ```text
//! sqlx::Error ─────────┐
//! MigrateError ────────┼──► DbError ──► ServiceError::Persistence
//! serde_json::Error ───┘                   (code + user_message)
//! ```
//!
//! "Not enough stock" and "no such product" are not errors here.
//! Repositories return them as `Option` or [`SubtractOutcome`] and the
//! service layer gives them a meaning.
//!
//! [`SubtractOutcome`]: crate::repository::stock::SubtractOutcome

use sqlx::error::ErrorKind;
use thiserror::Error;

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// A lookup that must find a row found none.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index rejected the write. `field` is `table.column` as
    /// SQLite reports it.
    ///
    /// Product names, client e-mails and phones, receipt numbers.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A row pointed at a product, sale or client that does not exist.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// The statement ran and SQLite refused it: a CHECK constraint, the
    /// sale immutability triggers, or a malformed query.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Every pooled connection stayed busy past the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// The sale snapshot column could not be encoded or decoded.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// SQLite names the column of a failed UNIQUE index but never the value.
    /// Repositories call this with the value they tried to write. Other
    /// variants pass through untouched.
    pub fn with_duplicate_value(self, value: impl Into<String>) -> Self {
        match self {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: value.into(),
            },
            other => other,
        }
    }
}

/// ```text
/// RowNotFound                         → NotFound
/// Database(kind = UniqueViolation)    → UniqueViolation { field: "table.column" }
/// Database(kind = ForeignKeyViolation)→ ForeignKeyViolation
/// Database(anything else)             → QueryFailed
/// PoolTimedOut                        → PoolExhausted
/// PoolClosed / Io                     → ConnectionFailed
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => {
                        // "UNIQUE constraint failed: clients.email"
                        let field = message
                            .rsplit_once(": ")
                            .map(|(_, column)| column.to_string())
                            .unwrap_or_else(|| "unknown".to_string());
                        DbError::duplicate(field, "unknown")
                    }
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
                    _ => DbError::QueryFailed(message),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            sqlx::Error::Io(io) => DbError::ConnectionFailed(io.to_string()),

            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[test]
    fn test_with_duplicate_value() {
        let err = DbError::duplicate("products.name", "unknown").with_duplicate_value("Mouse");
        assert_eq!(err.to_string(), "Duplicate products.name: 'Mouse' already exists");

        let err = DbError::PoolExhausted.with_duplicate_value("x");
        assert!(matches!(err, DbError::PoolExhausted));
    }

    #[test]
    fn test_json_error_maps_to_serialization() {
        let json_err = serde_json::from_str::<Vec<i64>>("not json").unwrap_err();
        assert!(matches!(DbError::from(json_err), DbError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_sqlite_constraints_are_classified() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let err: DbError = sqlx::query("INSERT INTO stock_levels (product_id, quantity, updated_at) VALUES ('ghost', 1, '2026-01-01T00:00:00Z')")
            .execute(db.pool())
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }), "{err:?}");

        let err: DbError = sqlx::query("SELEC 1").execute(db.pool()).await.unwrap_err().into();
        assert!(matches!(err, DbError::QueryFailed(_)));
    }
}
