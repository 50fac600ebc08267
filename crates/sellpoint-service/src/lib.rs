//! # sellpoint-service: Checkout Orchestration for Sellpoint
//!
//! The operations a register or back office calls. Each service holds a
//! cloned [`Database`](sellpoint_db::Database) and the settings it needs.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    sellpoint-service (THIS CRATE)                       │
//! │                                                                         │
//! │  CheckoutService ──► cart + totals + stock + sale + outbox (one tx)    │
//! │  SaleRecorder    ──► sale records without stock movement               │
//! │  StockAdjuster   ──► add / subtract / set, alerts, restock             │
//! │  DashboardService──► KPIs, daily sales, best sellers                   │
//! │  NotificationDispatcher ──► background invoice e-mails                 │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  sellpoint-db (repositories)      sellpoint-core (pure rules)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`checkout`] - Cart to committed sale
//! - [`recorder`] - Sale recording and lookup
//! - [`stock`] - Manual stock changes and inventory reports
//! - [`dashboard`] - Back-office metrics
//! - [`notifier`] - Invoice rendering, outbox dispatch, mail seam
//! - [`config`] - `sellpoint.toml` and `SELLPOINT_*` overrides
//! - [`error`] - The service error type

pub mod checkout;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod notifier;
pub mod recorder;
pub mod stock;

pub use checkout::{CheckoutReceipt, CheckoutRequest, CheckoutService, LowStockLine};
pub use config::AppConfig;
pub use dashboard::DashboardService;
pub use error::{ErrorCode, ServiceError, ServiceResult};
pub use recorder::SaleRecorder;
pub use stock::StockAdjuster;
