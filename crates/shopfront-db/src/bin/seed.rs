//! # Seed Data Generator
//!
//! Populates a database with demo products, stock, and promotions for
//! development.
//!
//! ## Usage
//! ```bash
//! # Default database path (./shopfront.db)
//! cargo run -p shopfront-db --bin seed
//!
//! # Custom path
//! cargo run -p shopfront-db --bin seed -- --db ./data/shopfront.db
//! ```

use std::env;

use chrono::Utc;
use shopfront_core::{Promotion, PromotionKind};
use shopfront_db::{Database, DbConfig};
use uuid::Uuid;

/// Demo catalog: (sku, name, price_cents, initial_stock)
const PRODUCTS: &[(&str, &str, i64, i64)] = &[
    ("TEE-BLK-M", "Black T-Shirt (M)", 1999, 120),
    ("TEE-BLK-L", "Black T-Shirt (L)", 1999, 80),
    ("HOOD-GRY-M", "Grey Hoodie (M)", 4999, 40),
    ("CAP-NVY", "Navy Cap", 1499, 200),
    ("SOCK-3PK", "Socks 3-Pack", 899, 300),
    ("MUG-LOGO", "Logo Mug", 1250, 60),
    ("TOTE-CVS", "Canvas Tote", 1799, 90),
    ("STKR-SET", "Sticker Set", 499, 500),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let db_path = parse_db_path().unwrap_or_else(|| "./shopfront.db".to_string());

    println!("Seeding database at {db_path}");
    let db = Database::new(DbConfig::new(&db_path)).await?;

    let mut product_ids = Vec::new();
    for (sku, name, price_cents, stock) in PRODUCTS {
        let product = db.products().insert(sku, name, *price_cents).await?;
        db.inventory().increase(&product.id, *stock).await?;
        println!("  {} {} ({} in stock)", product.sku, product.name, stock);
        product_ids.push(product.id);
    }

    let now = Utc::now();

    // 10% off orders of $15.00 or more
    db.promotions()
        .insert(&Promotion {
            id: Uuid::new_v4().to_string(),
            code: Some("SAVE10".to_string()),
            kind: PromotionKind::Percentage,
            percent_bps: Some(1000),
            amount_cents: None,
            buy_quantity: None,
            get_quantity: None,
            starts_at: None,
            ends_at: None,
            active: true,
            max_usage: None,
            max_usage_per_user: Some(3),
            min_purchase_cents: Some(1500),
            product_scope: Vec::new(),
            created_at: now,
            updated_at: now,
        })
        .await?;
    println!("  promotion SAVE10 (10% off, min $15.00)");

    // Buy 2 get 1 free on sticker sets
    db.promotions()
        .insert(&Promotion {
            id: Uuid::new_v4().to_string(),
            code: Some("STICKERS3FOR2".to_string()),
            kind: PromotionKind::BuyXGetY,
            percent_bps: None,
            amount_cents: None,
            buy_quantity: Some(2),
            get_quantity: Some(1),
            starts_at: None,
            ends_at: None,
            active: true,
            max_usage: None,
            max_usage_per_user: None,
            min_purchase_cents: None,
            product_scope: vec![product_ids[7].clone()],
            created_at: now,
            updated_at: now,
        })
        .await?;
    println!("  promotion STICKERS3FOR2 (buy 2 get 1)");

    // Free shipping over $50.00, first 100 redemptions
    db.promotions()
        .insert(&Promotion {
            id: Uuid::new_v4().to_string(),
            code: Some("FREESHIP".to_string()),
            kind: PromotionKind::FreeShipping,
            percent_bps: None,
            amount_cents: None,
            buy_quantity: None,
            get_quantity: None,
            starts_at: None,
            ends_at: None,
            active: true,
            max_usage: Some(100),
            max_usage_per_user: None,
            min_purchase_cents: Some(5000),
            product_scope: Vec::new(),
            created_at: now,
            updated_at: now,
        })
        .await?;
    println!("  promotion FREESHIP (free shipping, min $50.00)");

    println!("Done.");
    Ok(())
}

fn parse_db_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    args.iter()
        .position(|a| a == "--db")
        .and_then(|i| args.get(i + 1))
        .cloned()
}
