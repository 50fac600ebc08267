//! # Invoice Notifier
//!
//! Everything between a committed sale and the customer's inbox.
//!
//! ```text
//! checkout tx ──► notification_outbox ──► NotificationDispatcher ──► Mailer
//!   (enqueue_in)        (SQLite)              (tokio task)         (LogMailer)
//! ```
//!
//! - `invoice` - renders the plain-text invoice body
//! - `dispatcher` - background task draining the outbox
//! - `mailer` - the delivery seam

pub mod dispatcher;
pub mod invoice;
pub mod mailer;

pub use dispatcher::{DispatchReport, DispatcherHandle, NotificationDispatcher};
pub use invoice::InvoiceRenderer;
pub use mailer::{Email, LogMailer, Mailer};
