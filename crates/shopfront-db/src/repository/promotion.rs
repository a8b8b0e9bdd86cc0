//! # Promotion Repository
//!
//! The promotion catalog store: definitions, applicable-product scope, and
//! the append-only redemption log that usage caps are counted from.
//!
//! Code lookup is exact-match and case-sensitive (`=` on a TEXT column with
//! the default BINARY collation). Eligibility itself is pure — this
//! repository loads the usage counts and delegates the decision to
//! `shopfront_core::eligibility`.
//!
//! Usage-count checks are read-then-decide by design: under heavily
//! concurrent redemption a promotion can exceed its cap by the width of
//! the race window. That inherited weakness is documented rather than
//! hidden behind a lock.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use shopfront_core::eligibility::{check_eligibility, EligibilityContext, IneligibleReason};
use shopfront_core::{Money, Promotion, PromotionKind, PromotionUsage};

/// Base promotion row; the product scope lives in its own table and is
/// attached after the row loads.
#[derive(Debug, sqlx::FromRow)]
struct PromotionRow {
    id: String,
    code: Option<String>,
    kind: PromotionKind,
    percent_bps: Option<i64>,
    amount_cents: Option<i64>,
    buy_quantity: Option<i64>,
    get_quantity: Option<i64>,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    active: bool,
    max_usage: Option<i64>,
    max_usage_per_user: Option<i64>,
    min_purchase_cents: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PromotionRow {
    fn into_promotion(self, product_scope: Vec<String>) -> Promotion {
        Promotion {
            id: self.id,
            code: self.code,
            kind: self.kind,
            percent_bps: self.percent_bps,
            amount_cents: self.amount_cents,
            buy_quantity: self.buy_quantity,
            get_quantity: self.get_quantity,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            active: self.active,
            max_usage: self.max_usage,
            max_usage_per_user: self.max_usage_per_user,
            min_purchase_cents: self.min_purchase_cents,
            product_scope,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const PROMOTION_COLUMNS: &str = r#"
    id, code, kind, percent_bps, amount_cents, buy_quantity, get_quantity,
    starts_at, ends_at, active, max_usage, max_usage_per_user,
    min_purchase_cents, created_at, updated_at
"#;

/// Repository for promotion catalog operations.
#[derive(Debug, Clone)]
pub struct PromotionRepository {
    pool: SqlitePool,
}

impl PromotionRepository {
    /// Creates a new PromotionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PromotionRepository { pool }
    }

    /// Inserts a promotion definition together with its product scope.
    pub async fn insert(&self, promotion: &Promotion) -> DbResult<()> {
        debug!(id = %promotion.id, code = ?promotion.code, "Inserting promotion");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO promotions (
                id, code, kind, percent_bps, amount_cents, buy_quantity, get_quantity,
                starts_at, ends_at, active, max_usage, max_usage_per_user,
                min_purchase_cents, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&promotion.id)
        .bind(&promotion.code)
        .bind(promotion.kind)
        .bind(promotion.percent_bps)
        .bind(promotion.amount_cents)
        .bind(promotion.buy_quantity)
        .bind(promotion.get_quantity)
        .bind(promotion.starts_at)
        .bind(promotion.ends_at)
        .bind(promotion.active)
        .bind(promotion.max_usage)
        .bind(promotion.max_usage_per_user)
        .bind(promotion.min_purchase_cents)
        .bind(promotion.created_at)
        .bind(promotion.updated_at)
        .execute(&mut *tx)
        .await?;

        for product_id in &promotion.product_scope {
            sqlx::query(
                "INSERT INTO promotion_products (promotion_id, product_id) VALUES (?1, ?2)",
            )
            .bind(&promotion.id)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Exact-match, case-sensitive lookup by redemption code.
    pub async fn find_by_code(&self, code: &str) -> DbResult<Option<Promotion>> {
        let row = sqlx::query_as::<_, PromotionRow>(&format!(
            "SELECT {PROMOTION_COLUMNS} FROM promotions WHERE code = ?1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let scope = self.product_scope(&row.id).await?;
                Ok(Some(row.into_promotion(scope)))
            }
            None => Ok(None),
        }
    }

    /// Gets a promotion by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Promotion>> {
        let row = sqlx::query_as::<_, PromotionRow>(&format!(
            "SELECT {PROMOTION_COLUMNS} FROM promotions WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let scope = self.product_scope(&row.id).await?;
                Ok(Some(row.into_promotion(scope)))
            }
            None => Ok(None),
        }
    }

    async fn product_scope(&self, promotion_id: &str) -> DbResult<Vec<String>> {
        let scope: Vec<String> = sqlx::query_scalar(
            "SELECT product_id FROM promotion_products WHERE promotion_id = ?1 ORDER BY product_id",
        )
        .bind(promotion_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(scope)
    }

    /// Committed global redemption count for a promotion.
    pub async fn usage_count(&self, promotion_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM promotion_usages WHERE promotion_id = ?1")
                .bind(promotion_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Committed redemption count for a promotion by one user.
    pub async fn user_usage_count(&self, promotion_id: &str, user_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM promotion_usages WHERE promotion_id = ?1 AND user_id = ?2",
        )
        .bind(promotion_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Appends a redemption record. Written exactly once per successful
    /// checkout that applied a promotion; never updated or deleted.
    pub async fn record_usage(
        &self,
        promotion_id: &str,
        order_id: &str,
        user_id: &str,
    ) -> DbResult<PromotionUsage> {
        let usage = PromotionUsage {
            id: Uuid::new_v4().to_string(),
            promotion_id: promotion_id.to_string(),
            order_id: order_id.to_string(),
            user_id: user_id.to_string(),
            created_at: Utc::now(),
        };

        debug!(promotion_id = %promotion_id, order_id = %order_id, "Recording promotion usage");

        sqlx::query(
            r#"
            INSERT INTO promotion_usages (id, promotion_id, order_id, user_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&usage.id)
        .bind(&usage.promotion_id)
        .bind(&usage.order_id)
        .bind(&usage.user_id)
        .bind(usage.created_at)
        .execute(&self.pool)
        .await?;

        Ok(usage)
    }

    /// Runs the fixed-order eligibility checks for a loaded promotion.
    ///
    /// Loads the committed usage counts and hands the decision to the pure
    /// checker. The inner `Result` is the business outcome; the outer one
    /// is infrastructure.
    pub async fn eligibility(
        &self,
        promotion: &Promotion,
        now: DateTime<Utc>,
        cart_subtotal: Money,
        user_id: Option<&str>,
        cart_product_ids: &[String],
    ) -> DbResult<Result<(), IneligibleReason>> {
        let global_usage = self.usage_count(&promotion.id).await?;

        let user_usage = match user_id {
            Some(user_id) => Some(self.user_usage_count(&promotion.id, user_id).await?),
            None => None,
        };

        let ctx = EligibilityContext {
            now,
            cart_subtotal,
            global_usage,
            user_usage,
            cart_product_ids,
        };

        Ok(check_eligibility(promotion, &ctx))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
