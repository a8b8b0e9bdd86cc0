//! # Order Lifecycle Surface
//!
//! Administrative operations on existing orders: status transitions and
//! the audit history. Transition legality is decided by the core
//! lifecycle table; this layer validates input and converts outcomes to
//! the caller-facing error union.

use tracing::{debug, info};

use crate::error::CheckoutError;
use shopfront_core::validation::validate_actor;
use shopfront_core::{OrderStatus, OrderStatusEntry};
use shopfront_db::Database;

/// Service for order status management.
#[derive(Debug, Clone)]
pub struct OrderService {
    db: Database,
}

impl OrderService {
    /// Creates an order service over the given database.
    pub fn new(db: Database) -> Self {
        OrderService { db }
    }

    /// Transitions an order to a new status on behalf of `actor`.
    ///
    /// Appends one history row on success. A rejected transition (e.g.
    /// anything out of Completed) leaves the order and its history
    /// untouched.
    pub async fn update_order_status(
        &self,
        order_id: &str,
        new_status: OrderStatus,
        actor: &str,
    ) -> Result<(), CheckoutError> {
        validate_actor(actor)?;

        debug!(order_id = %order_id, new_status = ?new_status, actor = %actor, "Status update requested");

        self.db.orders().transition(order_id, new_status, actor).await?;

        info!(order_id = %order_id, new_status = ?new_status, actor = %actor, "Order status updated");
        Ok(())
    }

    /// Returns the order's status history in ascending timestamp order,
    /// for audit display.
    pub async fn order_history(&self, order_id: &str) -> Result<Vec<OrderStatusEntry>, CheckoutError> {
        let history = self.db.orders().history(order_id).await?;
        Ok(history)
    }
}
