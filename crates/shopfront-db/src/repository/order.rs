//! # Order Repository
//!
//! Database operations for orders, order items, and the status audit
//! trail.
//!
//! ## The Cart → Order Boundary
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   create() — SINGLE TRANSACTION                         │
//! │                                                                         │
//! │  1. INSERT INTO orders (...)                                           │
//! │  2. INSERT INTO order_items (...)   one row per cart line              │
//! │  3. UPDATE carts SET status = 'checked_out'                            │
//! │     WHERE id = ? AND status = 'active'     ← affected-rows checked     │
//! │                                                                         │
//! │  COMMIT ← all three or none. An order without items, or items          │
//! │  without the cart flip, is never an observable state.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Status transitions go through `shopfront_core::lifecycle`; the check
//! and the history append run in one transaction so a failed transition
//! leaves both the order row and the trail untouched.

use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use shopfront_core::lifecycle::{check_transition, TransitionError};
use shopfront_core::{Order, OrderItem, OrderStatus, OrderStatusEntry, PaymentStatus};

// =============================================================================
// Errors
// =============================================================================

/// Outcomes of order-store operations beyond plain infrastructure failure.
#[derive(Debug, Error)]
pub enum OrderError {
    /// No order with this id.
    #[error("order not found: {order_id}")]
    NotFound { order_id: String },

    /// The lifecycle table rejected the transition. The order and its
    /// history are unchanged.
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    /// Underlying database failure.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        OrderError::Db(DbError::from(err))
    }
}

/// Result type for order-store operations.
pub type OrderResult<T> = Result<T, OrderError>;

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Persists an order with its items and flips the source cart to
    /// CHECKED_OUT, atomically.
    ///
    /// Fails without side effects if the cart is no longer active (e.g. a
    /// concurrent checkout of the same cart won the race).
    pub async fn create(&self, order: &Order, items: &[OrderItem]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, customer_id, cart_id,
                order_status, payment_status, payment_method, shipping_method,
                promotion_id, subtotal_cents, discount_cents,
                shipping_cents, shipping_discount_cents, total_cents,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
        )
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(&order.customer_id)
        .bind(&order.cart_id)
        .bind(order.order_status)
        .bind(order.payment_status)
        .bind(order.payment_method)
        .bind(order.shipping_method)
        .bind(&order.promotion_id)
        .bind(order.subtotal_cents)
        .bind(order.discount_cents)
        .bind(order.shipping_cents)
        .bind(order.shipping_discount_cents)
        .bind(order.total_cents)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, name_snapshot,
                    quantity, unit_price_cents, discount_cents, line_total_cents,
                    position, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(&item.id)
            .bind(&item.order_id)
            .bind(&item.product_id)
            .bind(&item.name_snapshot)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.discount_cents)
            .bind(item.line_total_cents)
            .bind(item.position)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;
        }

        let flipped = sqlx::query(
            r#"
            UPDATE carts SET status = 'checked_out', updated_at = ?2
            WHERE id = ?1 AND status = 'active'
            "#,
        )
        .bind(&order.cart_id)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        if flipped.rows_affected() == 0 {
            // Dropping the transaction rolls back the order and items
            return Err(DbError::not_found("Active cart", &order.cart_id));
        }

        tx.commit().await?;

        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total_cents = order.total_cents,
            items = items.len(),
            "Order created"
        );

        Ok(())
    }

    /// Gets an order by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT
                id, order_number, customer_id, cart_id,
                order_status, payment_status, payment_method, shipping_method,
                promotion_id, subtotal_cents, discount_cents,
                shipping_cents, shipping_discount_cents, total_cents,
                created_at, updated_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Gets an order's items, in position order.
    pub async fn items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT
                id, order_id, product_id, name_snapshot,
                quantity, unit_price_cents, discount_cents, line_total_cents,
                position, created_at
            FROM order_items
            WHERE order_id = ?1
            ORDER BY position
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Transitions an order to a new status and appends one history row.
    ///
    /// The lifecycle table is consulted inside the transaction; a rejected
    /// transition leaves the order row and the trail exactly as they were.
    /// Payment status tracks the matching fulfillment transitions (Paid,
    /// Refunded).
    pub async fn transition(
        &self,
        order_id: &str,
        new_status: OrderStatus,
        actor: &str,
    ) -> OrderResult<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let current: Option<OrderStatus> =
            sqlx::query_scalar("SELECT order_status FROM orders WHERE id = ?1")
                .bind(order_id)
                .fetch_optional(&mut *tx)
                .await?;

        let current = current.ok_or_else(|| OrderError::NotFound {
            order_id: order_id.to_string(),
        })?;

        check_transition(current, new_status)?;

        let payment_status = match new_status {
            OrderStatus::Paid => Some(PaymentStatus::Paid),
            OrderStatus::Refunded => Some(PaymentStatus::Refunded),
            _ => None,
        };

        match payment_status {
            Some(payment_status) => {
                sqlx::query(
                    "UPDATE orders SET order_status = ?2, payment_status = ?3, updated_at = ?4 WHERE id = ?1",
                )
                .bind(order_id)
                .bind(new_status)
                .bind(payment_status)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query("UPDATE orders SET order_status = ?2, updated_at = ?3 WHERE id = ?1")
                    .bind(order_id)
                    .bind(new_status)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        sqlx::query(
            r#"
            INSERT INTO order_status_history (id, order_id, status, actor, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(order_id)
        .bind(new_status)
        .bind(actor)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            order_id = %order_id,
            from = ?current,
            to = ?new_status,
            actor = %actor,
            "Order status transitioned"
        );

        Ok(())
    }

    /// Appends a history row without changing the order's status.
    ///
    /// Used for the initial PENDING entry right after order creation.
    pub async fn record_status(
        &self,
        order_id: &str,
        status: OrderStatus,
        actor: &str,
    ) -> DbResult<OrderStatusEntry> {
        let entry = OrderStatusEntry {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            status,
            actor: actor.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO order_status_history (id, order_id, status, actor, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.order_id)
        .bind(entry.status)
        .bind(&entry.actor)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Gets an order's status history in ascending timestamp order,
    /// for audit display.
    pub async fn history(&self, order_id: &str) -> DbResult<Vec<OrderStatusEntry>> {
        let entries = sqlx::query_as::<_, OrderStatusEntry>(
            r#"
            SELECT id, order_id, status, actor, created_at
            FROM order_status_history
            WHERE order_id = ?1
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use shopfront_core::{PaymentMethod, ShippingMethod, SYSTEM_ACTOR};

    async fn setup_order(db: &Database) -> Order {
        let product = db.products().insert("WIDGET-1", "Widget", 1000).await.unwrap();
        let cart = db.carts().get_or_create_active("cust-1").await.unwrap();
        db.carts().add_line(&cart.id, &product, 2).await.unwrap();

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            order_number: "ORD-TEST-0001".to_string(),
            customer_id: "cust-1".to_string(),
            cart_id: cart.id.clone(),
            order_status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: PaymentMethod::Card,
            shipping_method: ShippingMethod::Standard,
            promotion_id: None,
            subtotal_cents: 2000,
            discount_cents: 0,
            shipping_cents: 500,
            shipping_discount_cents: 0,
            total_cents: 2500,
            created_at: now,
            updated_at: now,
        };

        let items = vec![OrderItem {
            id: Uuid::new_v4().to_string(),
            order_id: order.id.clone(),
            product_id: product.id.clone(),
            name_snapshot: product.name.clone(),
            quantity: 2,
            unit_price_cents: 1000,
            discount_cents: 0,
            line_total_cents: 2000,
            position: 0,
            created_at: now,
        }];

        db.orders().create(&order, &items).await.unwrap();
        order
    }

    #[tokio::test]
    async fn test_create_persists_order_items_and_flips_cart() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order = setup_order(&db).await;

        let fetched = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(fetched.total_cents, 2500);
        assert_eq!(fetched.order_status, OrderStatus::Pending);

        let items = db.orders().items(&order.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 2);

        let cart = db.carts().get_by_id(&order.cart_id).await.unwrap().unwrap();
        assert_eq!(cart.status, shopfront_core::CartStatus::CheckedOut);
    }

    #[tokio::test]
    async fn test_create_rolls_back_when_cart_not_active() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order = setup_order(&db).await;

        // Second order against the same (now checked-out) cart must fail
        // and leave nothing behind
        let mut dup = order.clone();
        dup.id = Uuid::new_v4().to_string();
        dup.order_number = "ORD-TEST-0002".to_string();

        assert!(db.orders().create(&dup, &[]).await.is_err());
        assert!(db.orders().get_by_id(&dup.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transition_appends_history() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order = setup_order(&db).await;
        let orders = db.orders();

        orders
            .record_status(&order.id, OrderStatus::Pending, SYSTEM_ACTOR)
            .await
            .unwrap();
        orders.transition(&order.id, OrderStatus::Paid, "admin:jane").await.unwrap();
        orders
            .transition(&order.id, OrderStatus::Processing, "admin:jane")
            .await
            .unwrap();

        let fetched = orders.get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(fetched.order_status, OrderStatus::Processing);
        // Paid transition synced the payment status
        assert_eq!(fetched.payment_status, PaymentStatus::Paid);

        let history = orders.history(&order.id).await.unwrap();
        let statuses: Vec<OrderStatus> = history.iter().map(|h| h.status).collect();
        assert_eq!(
            statuses,
            vec![OrderStatus::Pending, OrderStatus::Paid, OrderStatus::Processing]
        );
        assert_eq!(history[1].actor, "admin:jane");
    }

    #[tokio::test]
    async fn test_completed_order_rejects_transition_unchanged() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order = setup_order(&db).await;
        let orders = db.orders();

        orders.transition(&order.id, OrderStatus::Completed, "admin:jane").await.unwrap();
        let history_before = orders.history(&order.id).await.unwrap();

        let err = orders
            .transition(&order.id, OrderStatus::Refunded, "admin:jane")
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition(_)));

        // Status and history are untouched by the failed attempt
        let fetched = orders.get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(fetched.order_status, OrderStatus::Completed);
        assert_eq!(orders.history(&order.id).await.unwrap().len(), history_before.len());
    }

    #[tokio::test]
    async fn test_transition_unknown_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .orders()
            .transition("missing", OrderStatus::Paid, "admin:jane")
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::NotFound { .. }));
    }
}
