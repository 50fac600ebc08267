//! # Invoice Rendering
//!
//! Plain-text invoice bodies for the notification outbox.
//!
//! ```text
//! INVOICE
//! Downtown Electronics
//! Invoice No: 20261016-0001
//! Date:       2026-10-16 14:03 UTC
//!
//! Bill to: Ana Torres
//!          Rua das Flores 12
//!
//! Item                          Qty   Unit Price        Total
//! ------------------------------------------------------------
//! Mouse                           2       $29.99       $59.98
//! ------------------------------------------------------------
//!                                       Subtotal:       $59.98
//!                                       Tax (19%):      $11.40
//!                                       Total:          $71.38
//! ```

use std::fmt::Write;

use sellpoint_core::{Client, SaleRecord, TaxRate};

const RULE_WIDTH: usize = 60;

/// Renders invoices for one store.
#[derive(Debug, Clone)]
pub struct InvoiceRenderer {
    store_name: String,
    tax_rate: TaxRate,
}

impl InvoiceRenderer {
    pub fn new(store_name: impl Into<String>, tax_rate: TaxRate) -> Self {
        InvoiceRenderer {
            store_name: store_name.into(),
            tax_rate,
        }
    }

    pub fn subject(&self, sale: &SaleRecord) -> String {
        format!("{}: invoice {}", self.store_name, sale.receipt_number)
    }

    /// Invoice body. `client` adds the bill-to block when known.
    pub fn render(&self, sale: &SaleRecord, client: Option<&Client>) -> String {
        let mut out = String::new();
        let rule = "-".repeat(RULE_WIDTH);

        // Writing into a String cannot fail.
        let _ = writeln!(out, "INVOICE");
        let _ = writeln!(out, "{}", self.store_name);
        let _ = writeln!(out, "Invoice No: {}", sale.receipt_number);
        let _ = writeln!(out, "Date:       {}", sale.created_at.format("%Y-%m-%d %H:%M UTC"));
        let _ = writeln!(out, "Payment:    {} ({})", sale.payment_method, sale.status.as_str());

        if let Some(client) = client {
            let _ = writeln!(out);
            let _ = writeln!(out, "Bill to: {}", client.name);
            if let Some(address) = &client.address {
                let _ = writeln!(out, "         {}", address);
            }
            if let Some(tax_id) = &client.tax_id {
                let _ = writeln!(out, "         Tax ID {}", tax_id);
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "{:<28} {:>5} {:>12} {:>12}", "Item", "Qty", "Unit Price", "Total");
        let _ = writeln!(out, "{}", rule);
        for line in &sale.lines {
            let _ = writeln!(
                out,
                "{:<28} {:>5} {:>12} {:>12}",
                truncate(&line.name, 28),
                line.quantity,
                line.unit_price.to_string(),
                line.line_total.to_string()
            );
        }
        let _ = writeln!(out, "{}", rule);

        let tax_label = format!("Tax ({}%):", self.tax_rate.percentage());
        let _ = writeln!(out, "{:>46} {:>12}", "Subtotal:", sale.subtotal.to_string());
        let _ = writeln!(out, "{:>46} {:>12}", tax_label, sale.tax.to_string());
        let _ = writeln!(out, "{:>46} {:>12}", "Total:", sale.grand_total.to_string());

        if let (Some(tendered), Some(change)) = (sale.amount_tendered, sale.change) {
            let _ = writeln!(out, "{:>46} {:>12}", "Paid:", tendered.to_string());
            let _ = writeln!(out, "{:>46} {:>12}", "Change:", change.to_string());
        }

        if let Some(notes) = &sale.notes {
            let _ = writeln!(out);
            let _ = writeln!(out, "Notes: {}", notes);
        }

        out
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut cut: String = s.chars().take(max - 1).collect();
        cut.push('…');
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sellpoint_core::{Money, PaymentMethod, SaleStatus, SnapshotLine};

    fn mouse_sale() -> SaleRecord {
        SaleRecord {
            id: "sale-1".into(),
            receipt_number: "20261016-0001".into(),
            employee_id: "emp-1".into(),
            lines: vec![SnapshotLine {
                name: "Mouse".into(),
                quantity: 2,
                unit_price: Money::from_cents(2999),
                line_total: Money::from_cents(5998),
            }],
            payment_method: PaymentMethod::Cash,
            status: SaleStatus::Paid,
            notes: None,
            amount_tendered: Some(Money::from_cents(7500)),
            change: Some(Money::from_cents(362)),
            subtotal: Money::from_cents(5998),
            tax: Money::from_cents(1140),
            grand_total: Money::from_cents(7138),
            client_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_render_contains_totals() {
        let renderer = InvoiceRenderer::new("Downtown Electronics", TaxRate::from_bps(1900));
        let body = renderer.render(&mouse_sale(), None);

        assert!(body.starts_with("INVOICE\nDowntown Electronics\n"));
        assert!(body.contains("20261016-0001"));
        assert!(body.contains("Mouse"));
        assert!(body.contains("$59.98"));
        assert!(body.contains("Tax (19%):"));
        assert!(body.contains("$11.40"));
        assert!(body.contains("$71.38"));
        assert!(body.contains("$3.62"));
        assert!(!body.contains("Bill to"));
    }

    #[test]
    fn test_render_with_client() {
        let client = Client {
            id: "c-1".into(),
            name: "Ana Torres".into(),
            email: "ana@example.com".into(),
            address: Some("Rua das Flores 12".into()),
            phone: None,
            tax_id: None,
            country: None,
            region: None,
            city: None,
            created_at: Utc::now(),
        };
        let renderer = InvoiceRenderer::new("Shop", TaxRate::default());
        let body = renderer.render(&mouse_sale(), Some(&client));

        assert!(body.contains("Bill to: Ana Torres"));
        assert!(body.contains("Rua das Flores 12"));
        assert_eq!(renderer.subject(&mouse_sale()), "Shop: invoice 20261016-0001");
    }

    #[test]
    fn test_truncate_long_names() {
        assert_eq!(truncate("Mouse", 10), "Mouse");
        assert_eq!(truncate("Ultra Wide Curved Monitor", 10).chars().count(), 10);
    }
}
