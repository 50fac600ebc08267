//! # Checkout Demo
//!
//! Runs one sale end to end: catalog, cart, checkout, invoice e-mail.
//!
//! ## Usage
//! ```bash
//! # In-memory database, default settings
//! cargo run -p sellpoint-service --bin checkout-demo
//!
//! # Explicit config file, cash tendered, invoice recipient
//! cargo run -p sellpoint-service --bin checkout-demo -- \
//!     --config ./sellpoint.toml --tendered 75.00 --email ana@example.com
//!
//! # Use the database from the config instead of memory
//! cargo run -p sellpoint-service --bin checkout-demo -- --persistent
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sellpoint_core::{CartSession, Money, NewProduct, SessionCarts, StockMode};
use sellpoint_db::{Database, DbConfig};
use sellpoint_service::notifier::{LogMailer, NotificationDispatcher};
use sellpoint_service::{AppConfig, CheckoutRequest, CheckoutService, DashboardService, StockAdjuster};

struct Args {
    config: Option<PathBuf>,
    tendered: Option<Money>,
    email: Option<String>,
    persistent: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        config: None,
        tendered: None,
        email: None,
        persistent: false,
    };

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                args.config = Some(iter.next().context("--config needs a path")?.into());
            }
            "--tendered" => {
                let raw = iter.next().context("--tendered needs an amount")?;
                args.tendered = Some(raw.parse().with_context(|| format!("bad amount {raw:?}"))?);
            }
            "--email" => {
                args.email = Some(iter.next().context("--email needs an address")?);
            }
            "--persistent" => args.persistent = true,
            "--help" | "-h" => {
                println!("Usage: checkout-demo [--config PATH] [--tendered AMOUNT] [--email ADDRESS] [--persistent]");
                std::process::exit(0);
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
    }

    Ok(args)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = parse_args()?;
    let config = AppConfig::load(args.config).context("loading configuration")?;

    let db_config = if args.persistent {
        config.db_config()
    } else {
        DbConfig::in_memory()
    };
    let db = Database::new(db_config).await.context("opening database")?;

    // Catalog
    let mouse = match db.products().get_by_name("Mouse").await? {
        Some(existing) => existing,
        None => {
            db.products()
                .insert(&NewProduct {
                    name: "Mouse".into(),
                    description: Some("Wireless optical mouse".into()),
                    price: Money::from_cents(2999),
                })
                .await?
        }
    };

    let adjuster = StockAdjuster::new(db.clone(), config.low_stock_threshold());
    adjuster.adjust(&mouse.id, 12, StockMode::Set).await?;

    // Notifier
    let (dispatcher, handle) =
        NotificationDispatcher::new(db.clone(), Arc::new(LogMailer), config.notifier.clone());
    let dispatcher_task = config.notifier.enabled.then(|| tokio::spawn(dispatcher.run()));

    // Checkout
    let carts = Arc::new(SessionCarts::new());
    let mut checkout = CheckoutService::new(db.clone(), carts.clone(), &config);
    if dispatcher_task.is_some() {
        checkout = checkout.with_notifier(handle.clone());
    }

    let session = CartSession::new();
    let mouse = db.products().get_by_id(&mouse.id).await?.context("Mouse vanished")?;
    carts.add(&session, &mouse, 2)?;

    let mut request = CheckoutRequest::new(session, "demo-cashier", "cash");
    request.amount_tendered = Some(args.tendered.unwrap_or(Money::from_cents(7500)));
    request.email = args.email;

    let receipt = match checkout.checkout(request).await {
        Ok(receipt) => receipt,
        Err(err) => {
            warn!(code = ?err.code(), "{}", err.user_message());
            return Err(err.into());
        }
    };

    info!(
        receipt = %receipt.sale.receipt_number,
        subtotal = %receipt.sale.subtotal,
        tax = %receipt.sale.tax,
        total = %receipt.sale.grand_total,
        change = ?receipt.sale.change.map(|c| c.to_string()),
        "Sale complete"
    );

    // Reports
    let kpis = DashboardService::new(db.clone(), config.low_stock_threshold())
        .main_kpis(30)
        .await?;
    info!(sales = kpis.total_sales, revenue = %kpis.total_revenue, stock = kpis.total_stock, "Dashboard");

    for alert in adjuster.stock_alerts().await? {
        warn!(level = ?alert.level, "{}", alert.message);
    }

    if let Some(task) = dispatcher_task {
        // Give the woken dispatcher a moment to drain the outbox.
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.shutdown().await?;
        task.await?;
    }

    db.close().await;
    Ok(())
}
