//! # Inventory Ledger
//!
//! The sole arbiter of product availability. All mutation goes through the
//! operations here, and each one is atomic with respect to concurrent
//! callers on the same product.
//!
//! ## Reserve / Commit / Release
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Reservation Lifecycle                                │
//! │                                                                         │
//! │  reserve(product, qty)                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE inventory                                                      │
//! │     SET available_quantity = available_quantity - qty                  │
//! │   WHERE product_id = ? AND available_quantity >= qty   ← atomic        │
//! │       │                            compare-and-decrement               │
//! │       ├── 0 rows → InsufficientStock (no side effects)                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT reservation row (state = 'held')  ← same transaction           │
//! │       │                                                                 │
//! │       ├──► commit(token)  : held → committed  (quantity stays gone)    │
//! │       └──► release(token) : held → released   (quantity restored)      │
//! │                                                                         │
//! │  A reservation settles exactly once; the state column's guarded        │
//! │  UPDATE is what enforces it.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A read-then-write here would be an oversell bug, not a style choice:
//! two checkouts reading `available = 1` would both decrement. The
//! `WHERE available_quantity >= qty` predicate plus the affected-rows
//! check is the whole concurrency story.

use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use shopfront_core::InventoryLevel;

// =============================================================================
// Errors
// =============================================================================

/// Outcomes of ledger operations that are not infrastructure failures.
///
/// `InsufficientStock` is a normal, expected result of a busy store and is
/// reported per product so the orchestrator can name exactly what was
/// unavailable.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Not enough stock to satisfy a reservation. No side effects occurred.
    #[error("insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// An adjustment would drive the level negative. Nothing was changed.
    #[error("stock for {product_id} cannot go negative (available {available}, delta {delta})")]
    NegativeStock {
        product_id: String,
        available: i64,
        delta: i64,
    },

    /// The product has no inventory record.
    #[error("no inventory record for product {product_id}")]
    UnknownProduct { product_id: String },

    /// The reservation was already committed or released.
    #[error("reservation {reservation_id} was already settled")]
    AlreadySettled { reservation_id: String },

    /// Quantity inputs must be positive (reserve) or non-negative (receive).
    #[error("invalid quantity {quantity} for {operation}")]
    InvalidQuantity { operation: &'static str, quantity: i64 },

    /// Underlying database failure.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::Db(DbError::from(err))
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Reservation Token
// =============================================================================

/// A handle to a held reservation.
///
/// Scoped to a single checkout attempt: the holder must either commit or
/// release it, exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationToken {
    pub id: String,
    pub product_id: String,
    pub quantity: i64,
}

// =============================================================================
// Ledger
// =============================================================================

/// The inventory ledger.
#[derive(Debug, Clone)]
pub struct InventoryLedger {
    pool: SqlitePool,
}

impl InventoryLedger {
    /// Creates a new InventoryLedger.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryLedger { pool }
    }

    /// Atomically reserves `quantity` units of a product.
    ///
    /// The decrement only happens when enough stock exists — checked and
    /// applied in one UPDATE — so concurrent reservations can never
    /// oversell. On failure the error carries the availability observed
    /// after the attempt, for per-line reporting.
    pub async fn reserve(&self, product_id: &str, quantity: i64) -> LedgerResult<ReservationToken> {
        if quantity <= 0 {
            return Err(LedgerError::InvalidQuantity {
                operation: "reserve",
                quantity,
            });
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET available_quantity = available_quantity - ?1,
                version = version + 1,
                updated_at = ?2
            WHERE product_id = ?3 AND available_quantity >= ?1
            "#,
        )
        .bind(quantity)
        .bind(now)
        .bind(product_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish "not enough" from "never stocked".
            let available: Option<i64> = sqlx::query_scalar(
                "SELECT available_quantity FROM inventory WHERE product_id = ?1",
            )
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?;

            return Err(match available {
                Some(available) => LedgerError::InsufficientStock {
                    product_id: product_id.to_string(),
                    available,
                    requested: quantity,
                },
                None => LedgerError::UnknownProduct {
                    product_id: product_id.to_string(),
                },
            });
        }

        let token = ReservationToken {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            quantity,
        };

        sqlx::query(
            r#"
            INSERT INTO stock_reservations (id, product_id, quantity, state, created_at, updated_at)
            VALUES (?1, ?2, ?3, 'held', ?4, ?4)
            "#,
        )
        .bind(&token.id)
        .bind(&token.product_id)
        .bind(token.quantity)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            product_id = %token.product_id,
            quantity = token.quantity,
            reservation_id = %token.id,
            "Stock reserved"
        );

        Ok(token)
    }

    /// Releases a held reservation, restoring its quantity.
    ///
    /// Used on checkout failure to roll back a partial reservation set.
    /// Fails with `AlreadySettled` if the reservation was committed or
    /// released before.
    pub async fn release(&self, token: &ReservationToken) -> LedgerResult<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let settled = sqlx::query(
            r#"
            UPDATE stock_reservations
            SET state = 'released', updated_at = ?2
            WHERE id = ?1 AND state = 'held'
            "#,
        )
        .bind(&token.id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if settled.rows_affected() == 0 {
            return Err(LedgerError::AlreadySettled {
                reservation_id: token.id.clone(),
            });
        }

        sqlx::query(
            r#"
            UPDATE inventory
            SET available_quantity = available_quantity + ?1,
                version = version + 1,
                updated_at = ?2
            WHERE product_id = ?3
            "#,
        )
        .bind(token.quantity)
        .bind(now)
        .bind(&token.product_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            product_id = %token.product_id,
            quantity = token.quantity,
            reservation_id = %token.id,
            "Reservation released"
        );

        Ok(())
    }

    /// Finalizes a held reservation once the order is durable.
    ///
    /// No-op on quantity (the decrement already happened at reserve time);
    /// marks the hold non-revocable. Fails with `AlreadySettled` on a
    /// second settle attempt.
    pub async fn commit(&self, token: &ReservationToken) -> LedgerResult<()> {
        let now = Utc::now();

        let settled = sqlx::query(
            r#"
            UPDATE stock_reservations
            SET state = 'committed', updated_at = ?2
            WHERE id = ?1 AND state = 'held'
            "#,
        )
        .bind(&token.id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if settled.rows_affected() == 0 {
            return Err(LedgerError::AlreadySettled {
                reservation_id: token.id.clone(),
            });
        }

        debug!(reservation_id = %token.id, "Reservation committed");
        Ok(())
    }

    /// Adds stock for a product (stock-import workflow). Additive; always
    /// succeeds for non-negative input, creating the record if missing.
    pub async fn increase(&self, product_id: &str, quantity: i64) -> LedgerResult<()> {
        if quantity < 0 {
            return Err(LedgerError::InvalidQuantity {
                operation: "increase",
                quantity,
            });
        }

        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO inventory (product_id, available_quantity, version, updated_at)
            VALUES (?1, ?2, 0, ?3)
            ON CONFLICT (product_id) DO UPDATE SET
                available_quantity = available_quantity + excluded.available_quantity,
                version = version + 1,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(product_id = %product_id, quantity, "Stock received");
        Ok(())
    }

    /// Applies an admin correction of `delta` units (either sign).
    ///
    /// Fails with `NegativeStock` if the result would dip below zero;
    /// the level is untouched in that case.
    pub async fn adjust(&self, product_id: &str, delta: i64) -> LedgerResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET available_quantity = available_quantity + ?1,
                version = version + 1,
                updated_at = ?2
            WHERE product_id = ?3 AND available_quantity + ?1 >= 0
            "#,
        )
        .bind(delta)
        .bind(now)
        .bind(product_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let available: Option<i64> = sqlx::query_scalar(
                "SELECT available_quantity FROM inventory WHERE product_id = ?1",
            )
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;

            return Err(match available {
                Some(available) => {
                    warn!(product_id = %product_id, available, delta, "Rejected negative-stock adjustment");
                    LedgerError::NegativeStock {
                        product_id: product_id.to_string(),
                        available,
                        delta,
                    }
                }
                None => LedgerError::UnknownProduct {
                    product_id: product_id.to_string(),
                },
            });
        }

        debug!(product_id = %product_id, delta, "Stock adjusted");
        Ok(())
    }

    /// Returns the current level for a product, if stocked.
    pub async fn level(&self, product_id: &str) -> DbResult<Option<InventoryLevel>> {
        let level = sqlx::query_as::<_, InventoryLevel>(
            r#"
            SELECT product_id, available_quantity, version, updated_at
            FROM inventory
            WHERE product_id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(level)
    }

    /// Returns the available quantity for a product, if stocked.
    pub async fn available(&self, product_id: &str) -> DbResult<Option<i64>> {
        let available: Option<i64> =
            sqlx::query_scalar("SELECT available_quantity FROM inventory WHERE product_id = ?1")
                .bind(product_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(available)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
