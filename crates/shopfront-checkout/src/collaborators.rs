//! # External Collaborators
//!
//! Interfaces the checkout core consumes but does not own: the product
//! catalog and order-created notifications. Both are dyn-compatible async
//! traits so hosts can plug in their own implementations; the defaults
//! here are backed by shopfront-db and tracing respectively.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::CheckoutError;
use shopfront_db::Database;
use shopfront_core::Order;

// =============================================================================
// Product Catalog
// =============================================================================

/// What checkout needs to know about a product.
#[derive(Debug, Clone)]
pub struct CatalogProduct {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub sellable: bool,
}

/// Read-only product lookup consumed during checkout validation.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Resolves a product by id; None when the product does not exist.
    async fn get_product(&self, product_id: &str) -> Result<Option<CatalogProduct>, CheckoutError>;
}

/// Product catalog backed by the local products table.
#[derive(Debug, Clone)]
pub struct SqlProductCatalog {
    db: Database,
}

impl SqlProductCatalog {
    /// Creates a catalog over the given database.
    pub fn new(db: Database) -> Self {
        SqlProductCatalog { db }
    }
}

#[async_trait]
impl ProductCatalog for SqlProductCatalog {
    async fn get_product(&self, product_id: &str) -> Result<Option<CatalogProduct>, CheckoutError> {
        let product = self.db.products().get_by_id(product_id).await?;

        Ok(product.map(|p| CatalogProduct {
            id: p.id,
            name: p.name,
            price_cents: p.price_cents,
            sellable: p.sellable,
        }))
    }
}

// =============================================================================
// Order Notifications
// =============================================================================

/// Fire-and-forget order notifications.
///
/// The checkout core never waits on or depends on delivery success; a
/// failing notifier cannot fail a checkout.
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    /// Called after an order is durably created and committed.
    async fn on_order_created(&self, order: Order);
}

/// Notifier that records order creation in the log and nothing else.
///
/// The default for tests and single-node deployments without a
/// notification pipeline.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl OrderNotifier for LogNotifier {
    async fn on_order_created(&self, order: Order) {
        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            customer_id = %order.customer_id,
            total_cents = order.total_cents,
            "Order created notification"
        );
        debug!(order_status = ?order.order_status, "Notification payload");
    }
}
