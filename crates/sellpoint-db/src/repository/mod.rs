//! # Repository Module
//!
//! Database repository implementations for Sellpoint.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Layout                                    │
//! │                                                                         │
//! │  Service code                                                          │
//! │       │                                                                 │
//! │       │  db.products().list(&filter, page)                             │
//! │       ▼                                                                 │
//! │  XxxRepository (holds a pool clone)                                    │
//! │  ├── pool-backed methods:  get_by_id, list, count, ...                 │
//! │  └── *_in(conn, ...):      same statement on a caller's transaction    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog CRUD and filtered listing
//! - [`StockRepository`](stock::StockRepository) - Quantities, conditional subtract, summaries
//! - [`SaleRepository`](sale::SaleRepository) - Immutable sale records and aggregates
//! - [`ClientRepository`](client::ClientRepository) - Invoice recipients
//! - [`NotificationRepository`](notification::NotificationRepository) - Invoice outbox

pub mod client;
pub mod notification;
pub mod product;
pub mod sale;
pub mod stock;
