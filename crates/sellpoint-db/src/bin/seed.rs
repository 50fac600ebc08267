//! # Seed Data Generator
//!
//! Populates a database with a demo catalog and a few clients.
//!
//! ## Usage
//! ```bash
//! # Seed ./sellpoint_dev.db with the default catalog
//! cargo run -p sellpoint-db --bin seed
//!
//! # Limit the number of products
//! cargo run -p sellpoint-db --bin seed -- --count 20
//!
//! # Specify database path
//! cargo run -p sellpoint-db --bin seed -- --db ./data/sellpoint.db
//! ```
//!
//! Each product gets a price derived from its base price and variant, and a
//! stock level between 0 and 60 so every stock bucket (out, low, in stock)
//! shows up in listings.

use sellpoint_core::filter::ProductFilter;
use sellpoint_core::{Money, NewClient, NewProduct};
use sellpoint_db::{Database, DbConfig};
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Base catalog: name and price in cents.
const CATALOG: &[(&str, i64)] = &[
    ("Mouse", 2999),
    ("Keyboard", 4999),
    ("Monitor", 19999),
    ("USB Cable", 799),
    ("HDMI Cable", 1299),
    ("Webcam", 5999),
    ("Headset", 7999),
    ("Mouse Pad", 999),
    ("Laptop Stand", 3499),
    ("USB Hub", 2499),
    ("External SSD", 8999),
    ("Power Bank", 3999),
];

/// Variants appended to each name, with a price addon in cents.
const VARIANTS: &[(&str, i64)] = &[("", 0), ("Pro", 1500), ("Mini", -300)];

const CLIENTS: &[(&str, &str)] = &[
    ("Ana Torres", "ana@example.com"),
    ("Bruno Silva", "bruno@example.com"),
    ("Carla Mendes", "carla@example.com"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = CATALOG.len() * VARIANTS.len();
    let mut db_path = String::from("./sellpoint_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(count);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Sellpoint Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: all {})", count);
                println!("  -d, --db <PATH>    Database file path (default: ./sellpoint_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(db = %db_path, count, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let mut everything = ProductFilter::default();
    everything.include_inactive = true;
    let existing = db.products().count(&everything).await?;
    if existing > 0 {
        warn!(existing, "Database already has products, skipping seed");
        println!("Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;

    'catalog: for (product_idx, (name, base_price)) in CATALOG.iter().enumerate() {
        for (variant_idx, (variant, addon)) in VARIANTS.iter().enumerate() {
            if generated >= count {
                break 'catalog;
            }

            let seed = product_idx * VARIANTS.len() + variant_idx;
            let product = generate_product(name, variant, base_price + addon);

            let created = match db.products().insert(&product).await {
                Ok(created) => created,
                Err(e) => {
                    warn!(name = %product.name, error = %e, "Failed to insert product");
                    continue;
                }
            };

            // Spread quantities over 0..=60 so some land in each bucket.
            let quantity = ((seed * 23) % 61) as i64;
            db.stock().set(&created.id, quantity).await?;

            generated += 1;
        }
    }

    for (name, email) in CLIENTS {
        let client = NewClient {
            name: name.to_string(),
            email: email.to_string(),
            country: Some("PT".to_string()),
            ..Default::default()
        };
        db.clients().insert(&client).await?;
    }

    let summary = db.stock().summary(sellpoint_core::LOW_STOCK_THRESHOLD).await?;

    info!(
        products = generated,
        clients = CLIENTS.len(),
        elapsed = ?start.elapsed(),
        total_units = summary.total_units,
        low_stock = summary.low_stock_count,
        out_of_stock = summary.out_of_stock_count,
        "Seed complete"
    );

    Ok(())
}

fn generate_product(name: &str, variant: &str, price_cents: i64) -> NewProduct {
    let full_name = if variant.is_empty() {
        name.to_string()
    } else {
        format!("{} {}", name, variant)
    };

    NewProduct {
        name: full_name,
        description: Some(format!("Demo {} for development", name.to_lowercase())),
        price: Money::from_cents(price_cents.max(0)),
    }
}
