//! # Sale Recorder
//!
//! Turns computed [`Totals`] into a persisted [`SaleRecord`].
//!
//! The recorder does not touch stock. Checkout uses the same draft builder
//! and writes the sale inside its own transaction; `record_sale` is for
//! callers that already handled inventory (or sell services).

use std::str::FromStr;

use sellpoint_core::filter::{Page, SaleFilter};
use sellpoint_core::validation::validate_text;
use sellpoint_core::{
    Money, PaymentMethod, SaleDraft, SaleRecord, SnapshotLine, Totals, ValidationError,
};
use sellpoint_db::Database;
use tracing::info;

use crate::error::ServiceResult;

#[derive(Debug, Clone)]
pub struct SaleRecorder {
    db: Database,
}

impl SaleRecorder {
    pub fn new(db: Database) -> Self {
        SaleRecorder { db }
    }

    /// Records a sale in one transactional write.
    ///
    /// `payment_method` is the text the cashier picked (`cash`,
    /// `credit_card`, `debit_card`, `transfer`). Transfers start as pending.
    pub async fn record_sale(
        &self,
        employee_id: &str,
        totals: &Totals,
        payment_method: &str,
        notes: Option<&str>,
        amount_tendered: Option<Money>,
    ) -> ServiceResult<SaleRecord> {
        let method = PaymentMethod::from_str(payment_method)?;
        let draft = build_draft(employee_id, totals, method, notes, amount_tendered, None)?;

        let record = self.db.sales().insert(&draft).await?;
        info!(
            receipt = %record.receipt_number,
            employee = %record.employee_id,
            total = %record.grand_total,
            "Sale recorded without stock movement"
        );

        Ok(record)
    }

    pub async fn get_by_id(&self, id: &str) -> ServiceResult<Option<SaleRecord>> {
        Ok(self.db.sales().get_by_id(id).await?)
    }

    /// Newest first.
    pub async fn list(&self, filter: &SaleFilter, page: Page) -> ServiceResult<Vec<SaleRecord>> {
        Ok(self.db.sales().list(filter, page).await?)
    }

    pub async fn count(&self, filter: &SaleFilter) -> ServiceResult<i64> {
        Ok(self.db.sales().count(filter).await?)
    }
}

/// Builds the row to insert, snapshotting every line as it is now.
pub(crate) fn build_draft(
    employee_id: &str,
    totals: &Totals,
    method: PaymentMethod,
    notes: Option<&str>,
    amount_tendered: Option<Money>,
    client_id: Option<String>,
) -> ServiceResult<SaleDraft> {
    let employee_id = employee_id.trim();
    if employee_id.is_empty() {
        return Err(ValidationError::Required {
            field: "employee_id".into(),
        }
        .into());
    }

    let notes = notes.map(str::trim).filter(|n| !n.is_empty());
    if let Some(notes) = notes {
        validate_text("notes", notes)?;
    }

    let lines = totals
        .line_items
        .iter()
        .map(|item| SnapshotLine {
            name: item.name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total: item.line_total(),
        })
        .collect();

    Ok(SaleDraft {
        employee_id: employee_id.to_string(),
        lines,
        payment_method: method,
        status: method.initial_status(),
        notes: notes.map(str::to_string),
        amount_tendered,
        change: totals.change,
        subtotal: totals.subtotal,
        tax: totals.tax,
        grand_total: totals.grand_total,
        client_id,
    })
}
