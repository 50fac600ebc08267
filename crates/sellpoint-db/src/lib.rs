//! # sellpoint-db: Database Layer for Sellpoint
//!
//! SQLite storage for the catalog, stock levels, sale records, clients and
//! the invoice outbox, using sqlx for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sellpoint Data Flow                              │
//! │                                                                         │
//! │  sellpoint-service (CheckoutService, StockAdjuster, Dashboard)         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   sellpoint-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ StockRepo     │    │ 001_initial_ │  │   │
//! │  │   │ Transactions  │    │ SaleRepo      │    │   schema.sql │  │   │
//! │  │   │               │    │ ClientRepo    │    │              │  │   │
//! │  │   │               │    │ Notification  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL) or :memory: for tests                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sellpoint_db::{Database, DbConfig};
//! use sellpoint_core::filter::{Page, ProductFilter};
//!
//! let db = Database::new(DbConfig::new("sellpoint.db")).await?;
//! let products = db.products().list(&ProductFilter::default().name("mouse"), Page::first(25)).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::client::ClientRepository;
pub use repository::notification::{NewNotification, NotificationRepository};
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
pub use repository::stock::{AddOutcome, StockRepository, SubtractOutcome};
