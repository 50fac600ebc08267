//! # Notification Dispatcher
//!
//! Background task that drains the notification outbox.
//!
//! ## Dispatch Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Dispatcher Loop                                      │
//! │                                                                         │
//! │   interval tick ──┐                                                    │
//! │   wake() ─────────┼──► process_batch()                                 │
//! │                   │      1. get_pending(batch_size, max_attempts)      │
//! │                   │      2. for each entry: Mailer::send               │
//! │                   │           Ok  → mark_sent                          │
//! │                   │           Err → mark_failed (attempts += 1)        │
//! │                   │      outbox write errors are logged, never fatal   │
//! │   shutdown() ─────┴──► break                                           │
//! │                                                                         │
//! │  Entries at max_attempts are no longer selected. They stay in the     │
//! │  table (count_pending) for someone to look at.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failure here never touches the sale. The sale committed before the
//! entry became visible.
//!
//! When an e-mail goes out but `mark_sent` fails, the entry id is kept in
//! memory and later passes only retry the bookkeeping, so the customer
//! gets one invoice.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use sellpoint_db::{Database, NotificationRepository};

use super::mailer::{Email, Mailer};
use crate::config::NotifierSettings;
use crate::error::{ServiceError, ServiceResult};

/// Counts from one pass over the outbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: usize,
}

/// Drains the notification outbox through a [`Mailer`].
pub struct NotificationDispatcher {
    db: Database,
    mailer: Arc<dyn Mailer>,
    settings: NotifierSettings,
    /// Delivered, but `mark_sent` failed.
    unconfirmed: Mutex<HashSet<String>>,
    wake_rx: mpsc::Receiver<()>,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for waking or stopping a running dispatcher.
#[derive(Clone)]
pub struct DispatcherHandle {
    wake_tx: mpsc::Sender<()>,
    shutdown_tx: mpsc::Sender<()>,
}

impl DispatcherHandle {
    /// Asks for an immediate pass. Wakes that arrive while one is already
    /// queued are merged.
    pub fn wake(&self) {
        match self.wake_tx.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => {}
            Err(mpsc::error::TrySendError::Closed(())) => {
                debug!("Dispatcher is not running, wake ignored");
            }
        }
    }

    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) -> ServiceResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| ServiceError::Notification("Dispatcher already stopped".into()))
    }
}

impl NotificationDispatcher {
    pub fn new(
        db: Database,
        mailer: Arc<dyn Mailer>,
        settings: NotifierSettings,
    ) -> (Self, DispatcherHandle) {
        let (wake_tx, wake_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let dispatcher = NotificationDispatcher {
            db,
            mailer,
            settings,
            unconfirmed: Mutex::new(HashSet::new()),
            wake_rx,
            shutdown_rx,
        };

        (dispatcher, DispatcherHandle { wake_tx, shutdown_tx })
    }

    /// Runs until [`DispatcherHandle::shutdown`] is called or every handle
    /// is dropped. Spawn this as a background task.
    pub async fn run(mut self) {
        info!(
            poll_interval_secs = self.settings.poll_interval_secs,
            batch_size = self.settings.batch_size,
            "Notification dispatcher starting"
        );

        let mut interval =
            tokio::time::interval(Duration::from_secs(self.settings.poll_interval_secs.max(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => self.process_logged().await,

                woke = self.wake_rx.recv() => match woke {
                    Some(()) => self.process_logged().await,
                    None => break,
                },

                _ = self.shutdown_rx.recv() => {
                    info!("Notification dispatcher shutting down");
                    break;
                }
            }
        }

        info!("Notification dispatcher stopped");
    }

    async fn process_logged(&self) {
        if let Err(e) = self.process_batch().await {
            error!(error = %e, "Failed to process notification batch");
        }
    }

    /// Sends one batch of pending notifications.
    pub async fn process_batch(&self) -> ServiceResult<DispatchReport> {
        let outbox = self.db.notifications();
        let entries = outbox
            .get_pending(self.settings.batch_size, self.settings.max_attempts)
            .await?;

        if entries.is_empty() {
            debug!("No pending notifications");
            return Ok(DispatchReport::default());
        }

        debug!(count = entries.len(), "Processing notification batch");
        let mut report = DispatchReport::default();

        for entry in entries {
            let delivered = self.unconfirmed.lock().await.contains(&entry.id);
            if delivered {
                debug!(id = %entry.id, "Already delivered, retrying mark_sent");
                self.record_sent(&outbox, &entry.id).await;
                continue;
            }

            let email = Email {
                from: self.settings.sender.clone(),
                to: entry.recipient.clone(),
                subject: entry.subject.clone(),
                body: entry.body.clone(),
            };

            match self.mailer.send(&email).await {
                Ok(()) => {
                    report.sent += 1;
                    info!(id = %entry.id, sale_id = %entry.sale_id, to = %entry.recipient, "Invoice sent");
                    self.record_sent(&outbox, &entry.id).await;
                }
                Err(e) => {
                    report.failed += 1;
                    if let Err(db_err) = outbox.mark_failed(&entry.id, &e.to_string()).await {
                        error!(id = %entry.id, error = %db_err, "Could not record failed attempt");
                    }

                    let attempts = entry.attempts + 1;
                    if attempts >= i64::from(self.settings.max_attempts) {
                        error!(
                            id = %entry.id,
                            sale_id = %entry.sale_id,
                            attempts,
                            error = %e,
                            "Giving up on invoice e-mail"
                        );
                    } else {
                        warn!(id = %entry.id, attempts, error = %e, "Invoice e-mail failed, will retry");
                    }
                }
            }
        }

        Ok(report)
    }

    async fn record_sent(&self, outbox: &NotificationRepository, id: &str) {
        match outbox.mark_sent(id).await {
            Ok(()) => {
                self.unconfirmed.lock().await.remove(id);
            }
            Err(e) => {
                error!(id = %id, error = %e, "Invoice delivered but not marked sent");
                self.unconfirmed.lock().await.insert(id.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sellpoint_core::{Money, PaymentMethod, SaleDraft, SaleStatus};
    use sellpoint_db::{DbConfig, NewNotification};
    use std::sync::Mutex;

    /// Records messages, failing the first `fail_first` sends.
    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<Email>>,
        fail_first: Mutex<usize>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: &Email) -> ServiceResult<()> {
            let mut fail = self.fail_first.lock().unwrap();
            if *fail > 0 {
                *fail -= 1;
                return Err(ServiceError::Notification("smtp unavailable".into()));
            }
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }
    }

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sale = db
            .sales()
            .insert(&SaleDraft {
                employee_id: "emp-1".into(),
                lines: Vec::new(),
                payment_method: PaymentMethod::Cash,
                status: SaleStatus::Paid,
                notes: None,
                amount_tendered: None,
                change: None,
                subtotal: Money::zero(),
                tax: Money::zero(),
                grand_total: Money::zero(),
                client_id: None,
            })
            .await
            .unwrap();
        db.notifications()
            .enqueue(&NewNotification {
                sale_id: sale.id,
                recipient: "ana@example.com".into(),
                subject: "Invoice".into(),
                body: "body".into(),
            })
            .await
            .unwrap();
        db
    }

    fn settings(max_attempts: u32) -> NotifierSettings {
        NotifierSettings {
            max_attempts,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_sends_and_marks() {
        let db = setup().await;
        let mailer = Arc::new(RecordingMailer::default());
        let (dispatcher, _handle) = NotificationDispatcher::new(db.clone(), mailer.clone(), settings(3));

        let report = dispatcher.process_batch().await.unwrap();
        assert_eq!(report, DispatchReport { sent: 1, failed: 0 });
        assert_eq!(mailer.sent.lock().unwrap()[0].to, "ana@example.com");
        assert_eq!(db.notifications().count_pending().await.unwrap(), 0);

        // Nothing left to send.
        assert_eq!(dispatcher.process_batch().await.unwrap(), DispatchReport::default());
    }

    #[tokio::test]
    async fn test_failure_is_retried_then_abandoned() {
        let db = setup().await;
        let mailer = Arc::new(RecordingMailer {
            fail_first: Mutex::new(10),
            ..Default::default()
        });
        let (dispatcher, _handle) = NotificationDispatcher::new(db.clone(), mailer, settings(2));

        assert_eq!(dispatcher.process_batch().await.unwrap().failed, 1);
        assert_eq!(dispatcher.process_batch().await.unwrap().failed, 1);
        // Out of attempts: no longer selected, still pending.
        assert_eq!(dispatcher.process_batch().await.unwrap(), DispatchReport::default());
        assert_eq!(db.notifications().count_pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_sent_failure_neither_aborts_nor_resends() {
        let db = setup().await;
        let sale_id = db.notifications().get_pending(10, 3).await.unwrap()[0].sale_id.clone();
        db.notifications()
            .enqueue(&NewNotification {
                sale_id,
                recipient: "luis@example.com".into(),
                subject: "Invoice".into(),
                body: "body".into(),
            })
            .await
            .unwrap();

        sqlx::query(
            r#"
            CREATE TRIGGER outbox_mark_sent_fails BEFORE UPDATE OF sent_at ON notification_outbox
            WHEN NEW.sent_at IS NOT NULL
            BEGIN SELECT RAISE(ABORT, 'disk I/O error'); END
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap();

        let mailer = Arc::new(RecordingMailer::default());
        let (dispatcher, _handle) = NotificationDispatcher::new(db.clone(), mailer.clone(), settings(3));

        // Both e-mails go out even though neither can be marked.
        let report = dispatcher.process_batch().await.unwrap();
        assert_eq!(report, DispatchReport { sent: 2, failed: 0 });
        assert_eq!(db.notifications().count_pending().await.unwrap(), 2);

        sqlx::query("DROP TRIGGER outbox_mark_sent_fails")
            .execute(db.pool())
            .await
            .unwrap();

        // The next pass only catches up on the bookkeeping.
        assert_eq!(dispatcher.process_batch().await.unwrap(), DispatchReport::default());
        assert_eq!(mailer.sent.lock().unwrap().len(), 2);
        assert_eq!(db.notifications().count_pending().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let db = setup().await;
        let mailer = Arc::new(RecordingMailer::default());
        let (dispatcher, handle) = NotificationDispatcher::new(db.clone(), mailer.clone(), settings(3));

        let task = tokio::spawn(dispatcher.run());
        handle.wake();

        for _ in 0..50 {
            if !mailer.sent.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }
}
