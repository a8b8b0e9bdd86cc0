//! # Cart Repository
//!
//! Database operations for carts and cart lines.
//!
//! ## Invariants
//! - At most one ACTIVE cart per customer (partial unique index)
//! - Lines are unique by product within a cart; adding the same product
//!   again increases its quantity
//! - Unit prices are snapshotted when a line is added
//! - Only ACTIVE carts can be mutated: every write carries a
//!   `status = 'active'` predicate, so a checked-out cart is immutable by
//!   construction, not by convention
//! - ACTIVE → CHECKED_OUT happens exactly once (affected-rows guard)

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use shopfront_core::{Cart, CartLine, CartStatus, Product};

/// Repository for cart database operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Gets the customer's ACTIVE cart, if any.
    pub async fn get_active(&self, customer_id: &str) -> DbResult<Option<Cart>> {
        let cart = sqlx::query_as::<_, Cart>(
            r#"
            SELECT id, customer_id, status, created_at, updated_at
            FROM carts
            WHERE customer_id = ?1 AND status = 'active'
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(cart)
    }

    /// Gets the customer's ACTIVE cart, creating one if none exists.
    ///
    /// The partial unique index makes the create race benign: the loser of
    /// a concurrent create re-reads the winner's cart.
    pub async fn get_or_create_active(&self, customer_id: &str) -> DbResult<Cart> {
        if let Some(cart) = self.get_active(customer_id).await? {
            return Ok(cart);
        }

        let now = Utc::now();
        let cart = Cart {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            status: CartStatus::Active,
            created_at: now,
            updated_at: now,
        };

        debug!(cart_id = %cart.id, customer_id = %customer_id, "Creating cart");

        let inserted = sqlx::query(
            r#"
            INSERT INTO carts (id, customer_id, status, created_at, updated_at)
            VALUES (?1, ?2, 'active', ?3, ?4)
            "#,
        )
        .bind(&cart.id)
        .bind(&cart.customer_id)
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(cart),
            Err(err) => {
                // Lost a concurrent create; the other cart is the active one
                let db_err = DbError::from(err);
                if matches!(db_err, DbError::UniqueViolation { .. }) {
                    self.get_active(customer_id)
                        .await?
                        .ok_or_else(|| DbError::not_found("Active cart", customer_id))
                } else {
                    Err(db_err)
                }
            }
        }
    }

    /// Gets a cart by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Cart>> {
        let cart = sqlx::query_as::<_, Cart>(
            r#"
            SELECT id, customer_id, status, created_at, updated_at
            FROM carts
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(cart)
    }

    /// Gets the lines of a cart, in position order.
    pub async fn lines(&self, cart_id: &str) -> DbResult<Vec<CartLine>> {
        let lines = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT id, cart_id, product_id, quantity, unit_price_cents, position, created_at
            FROM cart_lines
            WHERE cart_id = ?1
            ORDER BY position
            "#,
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Adds a product to an ACTIVE cart, merging into an existing line.
    ///
    /// The unit price is snapshotted from the product at add time; a later
    /// merge keeps the original snapshot.
    pub async fn add_line(&self, cart_id: &str, product: &Product, quantity: i64) -> DbResult<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Merge first: bump the quantity of an existing line. The cart
        // status predicate makes non-active carts untouchable.
        let merged = sqlx::query(
            r#"
            UPDATE cart_lines
            SET quantity = quantity + ?1
            WHERE cart_id = ?2 AND product_id = ?3
              AND cart_id IN (SELECT id FROM carts WHERE status = 'active')
            "#,
        )
        .bind(quantity)
        .bind(cart_id)
        .bind(&product.id)
        .execute(&mut *tx)
        .await?;

        if merged.rows_affected() == 0 {
            let active: Option<String> =
                sqlx::query_scalar("SELECT id FROM carts WHERE id = ?1 AND status = 'active'")
                    .bind(cart_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if active.is_none() {
                return Err(DbError::not_found("Active cart", cart_id));
            }

            let next_position: i64 = sqlx::query_scalar(
                "SELECT COALESCE(MAX(position), -1) + 1 FROM cart_lines WHERE cart_id = ?1",
            )
            .bind(cart_id)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO cart_lines
                    (id, cart_id, product_id, quantity, unit_price_cents, position, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(cart_id)
            .bind(&product.id)
            .bind(quantity)
            .bind(product.price_cents)
            .bind(next_position)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE carts SET updated_at = ?2 WHERE id = ?1")
            .bind(cart_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(cart_id = %cart_id, product_id = %product.id, quantity, "Cart line added");
        Ok(())
    }

    /// Sets a line's quantity on an ACTIVE cart. Zero removes the line.
    pub async fn set_line_quantity(
        &self,
        cart_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<()> {
        if quantity == 0 {
            return self.remove_line(cart_id, product_id).await;
        }

        let result = sqlx::query(
            r#"
            UPDATE cart_lines
            SET quantity = ?1
            WHERE cart_id = ?2 AND product_id = ?3
              AND cart_id IN (SELECT id FROM carts WHERE status = 'active')
            "#,
        )
        .bind(quantity)
        .bind(cart_id)
        .bind(product_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart line", product_id));
        }

        Ok(())
    }

    /// Decrements a line's quantity on an ACTIVE cart; removes the line
    /// when the quantity would reach zero.
    pub async fn decrement_line(&self, cart_id: &str, product_id: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE cart_lines
            SET quantity = quantity - 1
            WHERE cart_id = ?1 AND product_id = ?2 AND quantity > 1
              AND cart_id IN (SELECT id FROM carts WHERE status = 'active')
            "#,
        )
        .bind(cart_id)
        .bind(product_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Quantity was 1 (or the line is gone): remove it
            return self.remove_line(cart_id, product_id).await;
        }

        Ok(())
    }

    /// Removes a line from an ACTIVE cart.
    pub async fn remove_line(&self, cart_id: &str, product_id: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM cart_lines
            WHERE cart_id = ?1 AND product_id = ?2
              AND cart_id IN (SELECT id FROM carts WHERE status = 'active')
            "#,
        )
        .bind(cart_id)
        .bind(product_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart line", product_id));
        }

        Ok(())
    }

    /// Transitions a cart ACTIVE → CHECKED_OUT.
    ///
    /// Happens exactly once per cart: the status predicate plus the
    /// affected-rows check reject a second attempt. The checkout
    /// orchestrator performs this flip inside the order-creation
    /// transaction; this standalone form exists for administrative use.
    pub async fn mark_checked_out(&self, cart_id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE carts SET status = 'checked_out', updated_at = ?2
            WHERE id = ?1 AND status = 'active'
            "#,
        )
        .bind(cart_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Active cart", cart_id));
        }

        debug!(cart_id = %cart_id, "Cart checked out");
        Ok(())
    }

    /// Cancels an ACTIVE cart.
    pub async fn cancel(&self, cart_id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE carts SET status = 'canceled', updated_at = ?2
            WHERE id = ?1 AND status = 'active'
            "#,
        )
        .bind(cart_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Active cart", cart_id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
