//! Outgoing mail seam.

use async_trait::async_trait;
use tracing::info;

use crate::error::ServiceResult;

/// A message ready to hand to a mail transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivers e-mail. Returning `Err` marks the outbox entry as failed and
/// leaves it for a later retry.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> ServiceResult<()>;
}

/// Writes each message to the log instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> ServiceResult<()> {
        info!(
            from = %email.from,
            to = %email.to,
            subject = %email.subject,
            bytes = email.body.len(),
            "Invoice e-mail"
        );
        info!(target: "sellpoint::mail", "\n{}", email.body);
        Ok(())
    }
}
