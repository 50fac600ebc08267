//! # Checkout
//!
//! Turns a session's cart into a committed sale.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CheckoutService::checkout                            │
//! │                                                                         │
//! │  1. carts.list(session)            empty         → EmptyCart            │
//! │  2. compute_totals(tendered)       short         → InsufficientPayment  │
//! │  3. PaymentMethod::from_str        unknown       → InvalidPaymentMethod │
//! │  4. resolve client / recipient     unknown id    → NotFound             │
//! │                                                                         │
//! │  ┌──────────────── one SQLite transaction ───────────────────────────┐ │
//! │  │ 5. load products              missing/inactive → ProductNotFound   │ │
//! │  │ 6. pre-check every product    any shortfall    → InsufficientStock │ │
//! │  │ 7. conditional decrement each                                      │ │
//! │  │ 8. insert sale (receipt number)                                    │ │
//! │  │ 9. enqueue invoice e-mail     (only with a recipient)              │ │
//! │  └──────────────────────────── commit ─────────────────────────────────┘ │
//! │                                                                         │
//! │ 10. clear cart, warn on low stock, wake the notifier                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error before the commit drops the transaction, so stock, the sale and
//! the outbox entry are written together or not at all.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use sellpoint_core::cart::validate_cart;
use sellpoint_core::stock::{aggregate_demand, Availability};
use sellpoint_core::validation::{validate_email, validate_tendered};
use sellpoint_core::{
    compute_totals, CartSession, CartStore, Client, CoreError, Money, PaymentMethod, SaleRecord,
    TaxRate,
};
use sellpoint_db::{
    Database, DbError, NewNotification, NotificationRepository, ProductRepository, SaleRepository,
    StockRepository, SubtractOutcome,
};

use crate::config::AppConfig;
use crate::error::ServiceResult;
use crate::notifier::{DispatcherHandle, InvoiceRenderer};
use crate::recorder::build_draft;

// =============================================================================
// Request / Receipt
// =============================================================================

/// What the register sends when the cashier presses "pay".
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub session: CartSession,
    pub employee_id: String,
    /// Free text, parsed into a [`PaymentMethod`].
    pub payment_method: String,
    /// Cash handed over. `None` for card and transfer payments.
    pub amount_tendered: Option<Money>,
    pub notes: Option<String>,
    /// Registered customer the sale belongs to.
    pub client_id: Option<String>,
    /// Where to send the invoice. Defaults to the client's e-mail.
    pub email: Option<String>,
}

impl CheckoutRequest {
    pub fn new(session: CartSession, employee_id: impl Into<String>, payment_method: impl Into<String>) -> Self {
        CheckoutRequest {
            session,
            employee_id: employee_id.into(),
            payment_method: payment_method.into(),
            amount_tendered: None,
            notes: None,
            client_id: None,
            email: None,
        }
    }

    pub fn tendered(mut self, amount: Money) -> Self {
        self.amount_tendered = Some(amount);
        self
    }

    pub fn for_client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn email_to(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// A product left under the low-stock threshold by this sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LowStockLine {
    pub product_id: String,
    pub name: String,
    pub remaining: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub sale: SaleRecord,
    pub low_stock: Vec<LowStockLine>,
    /// Outbox entry for the invoice e-mail, if one was queued.
    pub notification_id: Option<String>,
    /// Non-blocking cart findings, such as prices that moved since scanning.
    pub warnings: Vec<String>,
}

// =============================================================================
// Service
// =============================================================================

pub struct CheckoutService {
    db: Database,
    carts: Arc<dyn CartStore>,
    tax_rate: TaxRate,
    low_stock_threshold: i64,
    renderer: InvoiceRenderer,
    notifier: Option<DispatcherHandle>,
}

impl CheckoutService {
    pub fn new(db: Database, carts: Arc<dyn CartStore>, config: &AppConfig) -> Self {
        CheckoutService {
            db,
            carts,
            tax_rate: config.tax_rate(),
            low_stock_threshold: config.low_stock_threshold(),
            renderer: InvoiceRenderer::new(config.store.name.clone(), config.tax_rate()),
            notifier: None,
        }
    }

    /// Wakes this dispatcher after every sale that queued an invoice.
    pub fn with_notifier(mut self, handle: DispatcherHandle) -> Self {
        self.notifier = Some(handle);
        self
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    pub async fn checkout(&self, request: CheckoutRequest) -> ServiceResult<CheckoutReceipt> {
        debug!(session = %request.session, employee = %request.employee_id, "Checkout started");

        // 1. Cart
        let items = self.carts.list(&request.session);
        if items.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        // 2. Totals
        if let Some(tendered) = request.amount_tendered {
            validate_tendered(tendered)?;
        }
        let totals = match compute_totals(&items, request.amount_tendered, self.tax_rate) {
            Ok(totals) => totals,
            Err(err @ CoreError::InsufficientPayment { .. }) => {
                warn!(session = %request.session, error = %err, "Checkout refused");
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        };

        // 3. Payment method
        let method = PaymentMethod::from_str(&request.payment_method)?;

        // 4. Client and invoice recipient, read before the transaction
        // takes the connection.
        let client = self.resolve_client(request.client_id.as_deref()).await?;
        let recipient = match request.email.as_deref().map(str::trim) {
            Some(email) if !email.is_empty() => {
                validate_email(email)?;
                Some(email.to_string())
            }
            _ => client.as_ref().map(|c| c.email.clone()),
        };

        let draft = build_draft(
            &request.employee_id,
            &totals,
            method,
            request.notes.as_deref(),
            request.amount_tendered,
            client.as_ref().map(|c| c.id.clone()),
        )?;

        let demand = aggregate_demand(&totals.line_items);
        let ids: Vec<String> = demand.iter().map(|d| d.product_id.clone()).collect();

        let mut tx = self.db.begin().await?;

        // 5. Products as they are now
        let products = ProductRepository::get_many_in(&mut *tx, &ids).await?;
        let by_id: HashMap<&str, _> = products.iter().map(|p| (p.id.as_str(), p)).collect();
        for line in &demand {
            match by_id.get(line.product_id.as_str()) {
                Some(product) if product.is_active => {}
                _ => return Err(CoreError::ProductNotFound(line.product_id.clone()).into()),
            }
        }

        let validation = validate_cart(&items, &products);
        for warning in &validation.warnings {
            warn!(session = %request.session, "{}", warning);
        }

        // 6. Pre-check everything before the first write
        for line in &demand {
            let current = StockRepository::quantity_in(&mut *tx, &line.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

            let availability = Availability::evaluate(current, line.quantity);
            if !availability.available {
                return Err(CoreError::insufficient_stock(&line.name, current, line.quantity).into());
            }
        }

        // 7. Decrement
        let mut low_stock = Vec::new();
        for line in &demand {
            let remaining = match StockRepository::subtract_in(&mut *tx, &line.product_id, line.quantity).await? {
                SubtractOutcome::Applied(level) => level.quantity,
                SubtractOutcome::Insufficient { available } => {
                    return Err(CoreError::insufficient_stock(&line.name, available, line.quantity).into());
                }
                SubtractOutcome::Missing => {
                    return Err(CoreError::ProductNotFound(line.product_id.clone()).into());
                }
            };

            if remaining < self.low_stock_threshold {
                low_stock.push(LowStockLine {
                    product_id: line.product_id.clone(),
                    name: line.name.clone(),
                    remaining,
                });
            }
        }

        // 8. Sale
        let sale = SaleRepository::insert_in(&mut *tx, &draft).await?;

        // 9. Invoice e-mail
        let notification_id = match &recipient {
            Some(to) => {
                let entry = NotificationRepository::enqueue_in(
                    &mut *tx,
                    &NewNotification {
                        sale_id: sale.id.clone(),
                        recipient: to.clone(),
                        subject: self.renderer.subject(&sale),
                        body: self.renderer.render(&sale, client.as_ref()),
                    },
                )
                .await?;
                Some(entry.id)
            }
            None => None,
        };

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        // 10. After commit
        self.carts.clear(&request.session);

        for line in &low_stock {
            warn!(
                product = %line.name,
                remaining = line.remaining,
                threshold = self.low_stock_threshold,
                "Low stock after sale"
            );
        }

        if notification_id.is_some() {
            if let Some(notifier) = &self.notifier {
                notifier.wake();
            }
        }

        info!(
            receipt = %sale.receipt_number,
            items = totals.quantity_total,
            total = %sale.grand_total,
            method = %method,
            invoice_queued = notification_id.is_some(),
            "Checkout complete"
        );

        Ok(CheckoutReceipt {
            sale,
            low_stock,
            notification_id,
            warnings: validation.warnings,
        })
    }

    async fn resolve_client(&self, client_id: Option<&str>) -> ServiceResult<Option<Client>> {
        let Some(id) = client_id else {
            return Ok(None);
        };

        let client = self
            .db
            .clients()
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Client", id))?;

        Ok(Some(client))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
