//! # Stock Administration Surface
//!
//! The entry points for the stock-import collaborator and manual admin
//! corrections. Both delegate to the inventory ledger, which owns the
//! actual atomicity guarantees.

use tracing::info;

use crate::error::CheckoutError;
use shopfront_core::validation::validate_receipt_quantity;
use shopfront_db::Database;

/// Service for stock administration.
#[derive(Debug, Clone)]
pub struct StockService {
    db: Database,
}

impl StockService {
    /// Creates a stock service over the given database.
    pub fn new(db: Database) -> Self {
        StockService { db }
    }

    /// Receives stock from an import workflow. Additive; always succeeds
    /// for non-negative quantities.
    pub async fn receive_stock(&self, product_id: &str, quantity: i64) -> Result<(), CheckoutError> {
        validate_receipt_quantity(quantity)?;

        self.db.inventory().increase(product_id, quantity).await?;

        info!(product_id = %product_id, quantity, "Stock received");
        Ok(())
    }

    /// Applies a manual correction of `delta` units (either sign).
    ///
    /// Fails with a NEGATIVE_STOCK error if the result would dip below
    /// zero; the level is untouched in that case.
    pub async fn adjust_stock(&self, product_id: &str, delta: i64) -> Result<(), CheckoutError> {
        self.db.inventory().adjust(product_id, delta).await?;

        info!(product_id = %product_id, delta, "Stock adjusted");
        Ok(())
    }

    /// Current available quantity for a product, if stocked.
    pub async fn available(&self, product_id: &str) -> Result<Option<i64>, CheckoutError> {
        let available = self.db.inventory().available(product_id).await?;
        Ok(available)
    }
}
