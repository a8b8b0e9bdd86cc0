//! # Checkout Orchestrator
//!
//! Drives a single checkout attempt through its stages and converts a
//! customer's active cart into a durable order.
//!
//! ## Attempt State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     One Checkout Attempt                                │
//! │                                                                         │
//! │  STARTED ──► VALIDATED ──► RESERVED ──► PRICED ──► ORDER_CREATED       │
//! │     │            │             │           │             │              │
//! │     │            │             │           │             ▼              │
//! │     │            │             │           │         COMMITTED          │
//! │     ▼            ▼             ▼           ▼        (terminal success)  │
//! │  FAILED ◄────────┴─────────────┴───────────┘                            │
//! │  (terminal, with reason)                                               │
//! │                                                                         │
//! │  Reservations taken in RESERVED are scoped to the attempt: any         │
//! │  failure before COMMITTED releases every token taken so far            │
//! │  (best-effort compensating rollback).                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Checkout is NOT idempotent: re-submitting with a fresh cart creates a
//! second order. Re-submitting the SAME cart cannot — the exactly-once
//! ACTIVE → CHECKED_OUT flip inside order creation rejects it — but there
//! is no request-level idempotency key. Retries are the caller's decision.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::collaborators::{
    CatalogProduct, LogNotifier, OrderNotifier, ProductCatalog, SqlProductCatalog,
};
use crate::error::{CheckoutError, CheckoutErrorCode};
use shopfront_core::discount::{compute_discount, DiscountBreakdown, PricedLine};
use shopfront_core::eligibility::IneligibleReason;
use shopfront_core::validation::validate_promotion_code;
use shopfront_core::{
    cart_subtotal, CoreError, Money, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus,
    Promotion, ShippingMethod, SYSTEM_ACTOR,
};
use shopfront_db::{Database, LedgerError, ReservationToken};

// =============================================================================
// Stages
// =============================================================================

/// Where a checkout attempt is; used for structured logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckoutStage {
    Started,
    Validated,
    Reserved,
    Priced,
    OrderCreated,
    Committed,
}

// =============================================================================
// Request / Response DTOs
// =============================================================================

/// A checkout request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub customer_id: String,
    /// The cart the client believes it is checking out; must be the
    /// customer's active cart.
    pub cart_id: String,
    pub payment_method: PaymentMethod,
    pub shipping_method: ShippingMethod,
    /// Optional promotion code. A supplied code that is invalid or
    /// ineligible fails the checkout — it is never silently ignored.
    pub promotion_code: Option<String>,
}

/// The caller-facing result of a successful checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub order_id: String,
    pub order_number: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub shipping_cents: i64,
    pub shipping_discount_cents: i64,
    pub total_cents: i64,
    pub item_count: usize,
}

/// Read-only promotion preview (no side effects).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionPreview {
    pub valid: bool,
    pub discount_cents: i64,
    pub final_cents: i64,
    pub shipping_waived: bool,
    /// Displayable outcome: the ineligibility reason, or a confirmation.
    pub message: String,
}

impl PromotionPreview {
    fn invalid(cart_total: Money, message: String) -> Self {
        PromotionPreview {
            valid: false,
            discount_cents: 0,
            final_cents: cart_total.clamp_non_negative().cents(),
            shipping_waived: false,
            message,
        }
    }
}

// =============================================================================
// Service
// =============================================================================

/// The checkout service.
///
/// Composes the cart and order stores, the inventory ledger, the
/// promotion catalog, and the discount calculator. Clone-cheap; safe to
/// share across request workers.
#[derive(Clone)]
pub struct CheckoutService {
    db: Database,
    catalog: Arc<dyn ProductCatalog>,
    notifier: Arc<dyn OrderNotifier>,
}

impl CheckoutService {
    /// Creates a checkout service with the default collaborators: the
    /// local product table as catalog and log-only notifications.
    pub fn new(db: Database) -> Self {
        let catalog = Arc::new(SqlProductCatalog::new(db.clone()));
        CheckoutService {
            db,
            catalog,
            notifier: Arc::new(LogNotifier),
        }
    }

    /// Creates a checkout service with custom collaborators.
    pub fn with_collaborators(
        db: Database,
        catalog: Arc<dyn ProductCatalog>,
        notifier: Arc<dyn OrderNotifier>,
    ) -> Self {
        CheckoutService { db, catalog, notifier }
    }

    /// Runs one checkout attempt end to end.
    ///
    /// On success the cart is CHECKED_OUT, the order and its items are
    /// durable, reservations are committed, promotion usage is recorded,
    /// and the initial PENDING history row exists. On failure every
    /// reservation taken by this attempt has been released and no order
    /// is visible.
    pub async fn checkout(&self, req: CheckoutRequest) -> Result<OrderSummary, CheckoutError> {
        debug!(stage = ?CheckoutStage::Started, customer_id = %req.customer_id, "Checkout started");

        // ---- STARTED: load the active cart -----------------------------------
        let cart = self
            .db
            .carts()
            .get_active(&req.customer_id)
            .await?
            .ok_or_else(|| CheckoutError::not_found("Active cart", &req.customer_id))?;

        if cart.id != req.cart_id {
            return Err(CheckoutError::validation(format!(
                "cart {} is not the active cart for this customer",
                req.cart_id
            )));
        }

        let lines = self.db.carts().lines(&cart.id).await?;
        if lines.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        // ---- VALIDATED: products sellable, promotion eligible ----------------
        let mut products: Vec<CatalogProduct> = Vec::with_capacity(lines.len());
        for line in &lines {
            let product = self
                .catalog
                .get_product(&line.product_id)
                .await?
                .ok_or_else(|| CheckoutError::from(CoreError::ProductNotFound(line.product_id.clone())))?;

            if !product.sellable {
                return Err(CoreError::ProductNotSellable(line.product_id.clone()).into());
            }
            products.push(product);
        }

        let subtotal = cart_subtotal(&lines);
        let promotion = self
            .resolve_promotion(req.promotion_code.as_deref(), &req.customer_id, subtotal, &lines)
            .await?;

        debug!(
            stage = ?CheckoutStage::Validated,
            cart_id = %cart.id,
            lines = lines.len(),
            subtotal_cents = subtotal.cents(),
            promotion = ?promotion.as_ref().and_then(|p| p.code.clone()),
            "Checkout validated"
        );

        // ---- RESERVED: compare-and-decrement per line ------------------------
        let ledger = self.db.inventory();
        let mut tokens: Vec<ReservationToken> = Vec::with_capacity(lines.len());
        let mut shortages: Vec<String> = Vec::new();

        for line in &lines {
            match ledger.reserve(&line.product_id, line.quantity).await {
                Ok(token) => tokens.push(token),
                Err(LedgerError::InsufficientStock { product_id, available, requested }) => {
                    shortages.push(format!(
                        "{} (available {}, requested {})",
                        product_id, available, requested
                    ));
                }
                Err(LedgerError::UnknownProduct { product_id }) => {
                    shortages.push(format!("{} (not stocked)", product_id));
                }
                Err(other) => {
                    self.release_all(&tokens).await;
                    return Err(other.into());
                }
            }
        }

        // Every line was attempted so the error can name ALL unavailable
        // products, not just the first.
        if !shortages.is_empty() {
            self.release_all(&tokens).await;
            return Err(CheckoutError::new(
                CheckoutErrorCode::InsufficientStock,
                format!("insufficient stock for: {}", shortages.join(", ")),
            ));
        }

        debug!(stage = ?CheckoutStage::Reserved, reservations = tokens.len(), "Stock reserved");

        // ---- PRICED: discount, shipping, total -------------------------------
        let priced: Vec<PricedLine> = lines.iter().map(PricedLine::from).collect();
        let breakdown = match &promotion {
            Some(promo) => compute_discount(promo, &priced, subtotal),
            None => DiscountBreakdown::none(lines.len(), subtotal),
        };

        let shipping = req.shipping_method.fee();
        let shipping_discount = if breakdown.shipping_waived {
            shipping
        } else {
            Money::zero()
        };
        let total = (subtotal - Money::from_cents(breakdown.discount_cents) + shipping
            - shipping_discount)
            .clamp_non_negative();

        debug!(
            stage = ?CheckoutStage::Priced,
            discount_cents = breakdown.discount_cents,
            shipping_cents = shipping.cents(),
            total_cents = total.cents(),
            "Checkout priced"
        );

        // ---- ORDER_CREATED: one durable transaction --------------------------
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            order_number: generate_order_number(),
            customer_id: req.customer_id.clone(),
            cart_id: cart.id.clone(),
            order_status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: req.payment_method,
            shipping_method: req.shipping_method,
            promotion_id: promotion.as_ref().map(|p| p.id.clone()),
            subtotal_cents: subtotal.cents(),
            discount_cents: breakdown.discount_cents,
            shipping_cents: shipping.cents(),
            shipping_discount_cents: shipping_discount.cents(),
            total_cents: total.cents(),
            created_at: now,
            updated_at: now,
        };

        let items: Vec<OrderItem> = lines
            .iter()
            .zip(products.iter())
            .enumerate()
            .map(|(position, (line, product))| {
                let line_discount = breakdown.per_line_cents.get(position).copied().unwrap_or(0);
                OrderItem {
                    id: Uuid::new_v4().to_string(),
                    order_id: order.id.clone(),
                    product_id: line.product_id.clone(),
                    name_snapshot: product.name.clone(),
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price_cents,
                    discount_cents: line_discount,
                    line_total_cents: line.line_total().cents() - line_discount,
                    position: position as i64,
                    created_at: now,
                }
            })
            .collect();

        if let Err(err) = self.db.orders().create(&order, &items).await {
            // Reservation lifetime is scoped to the attempt
            self.release_all(&tokens).await;
            return Err(err.into());
        }

        debug!(stage = ?CheckoutStage::OrderCreated, order_id = %order.id, "Order persisted");

        // ---- COMMITTED: finalize reservations, record usage, audit trail -----
        // The order is durable from here on; bookkeeping failures are
        // logged, not propagated.
        for token in &tokens {
            if let Err(err) = ledger.commit(token).await {
                warn!(reservation_id = %token.id, error = %err, "Failed to commit reservation");
            }
        }

        if let Some(promo) = &promotion {
            if let Err(err) = self
                .db
                .promotions()
                .record_usage(&promo.id, &order.id, &req.customer_id)
                .await
            {
                warn!(promotion_id = %promo.id, order_id = %order.id, error = %err, "Failed to record promotion usage");
            }
        }

        if let Err(err) = self
            .db
            .orders()
            .record_status(&order.id, OrderStatus::Pending, SYSTEM_ACTOR)
            .await
        {
            warn!(order_id = %order.id, error = %err, "Failed to record initial status history");
        }

        let notifier = Arc::clone(&self.notifier);
        let notified = order.clone();
        tokio::spawn(async move {
            notifier.on_order_created(notified).await;
        });

        info!(
            stage = ?CheckoutStage::Committed,
            order_id = %order.id,
            order_number = %order.order_number,
            total_cents = order.total_cents,
            "Checkout committed"
        );

        Ok(OrderSummary {
            order_id: order.id,
            order_number: order.order_number,
            subtotal_cents: order.subtotal_cents,
            discount_cents: order.discount_cents,
            shipping_cents: order.shipping_cents,
            shipping_discount_cents: order.shipping_discount_cents,
            total_cents: order.total_cents,
            item_count: items.len(),
        })
    }

    /// Resolves and validates the optional promotion code for a checkout.
    ///
    /// A bad code is rejected BEFORE any reservation is taken; checkout
    /// never silently drops a supplied code.
    async fn resolve_promotion(
        &self,
        code: Option<&str>,
        customer_id: &str,
        subtotal: Money,
        lines: &[shopfront_core::CartLine],
    ) -> Result<Option<Promotion>, CheckoutError> {
        let Some(code) = code else {
            return Ok(None);
        };

        validate_promotion_code(code)?;

        let promotion = self
            .db
            .promotions()
            .find_by_code(code)
            .await?
            .ok_or_else(|| {
                CheckoutError::new(
                    CheckoutErrorCode::PromotionNotFound,
                    IneligibleReason::NotFound.to_string(),
                )
            })?;

        let product_ids: Vec<String> = lines.iter().map(|l| l.product_id.clone()).collect();
        let outcome = self
            .db
            .promotions()
            .eligibility(&promotion, Utc::now(), subtotal, Some(customer_id), &product_ids)
            .await?;

        match outcome {
            Ok(()) => Ok(Some(promotion)),
            Err(reason) => Err(CheckoutError::new(
                CheckoutErrorCode::PromotionIneligible,
                reason.to_string(),
            )),
        }
    }

    /// Best-effort release of every reservation taken by this attempt.
    async fn release_all(&self, tokens: &[ReservationToken]) {
        let ledger = self.db.inventory();
        for token in tokens {
            if let Err(err) = ledger.release(token).await {
                warn!(
                    reservation_id = %token.id,
                    product_id = %token.product_id,
                    error = %err,
                    "Failed to release reservation during rollback"
                );
            }
        }
    }

    /// Side-effect-free promotion preview, used by clients before they
    /// commit to checkout.
    ///
    /// Line-dependent math (scoping, buy-X-get-Y) uses the user's active
    /// cart when one exists; eligibility is judged against the supplied
    /// cart total.
    pub async fn validate_promotion(
        &self,
        code: &str,
        user_id: Option<&str>,
        cart_total: Money,
    ) -> Result<PromotionPreview, CheckoutError> {
        if let Err(err) = validate_promotion_code(code) {
            return Ok(PromotionPreview::invalid(cart_total, err.to_string()));
        }

        let Some(promotion) = self.db.promotions().find_by_code(code).await? else {
            return Ok(PromotionPreview::invalid(
                cart_total,
                IneligibleReason::NotFound.to_string(),
            ));
        };

        let lines = match user_id {
            Some(user_id) => match self.db.carts().get_active(user_id).await? {
                Some(cart) => self.db.carts().lines(&cart.id).await?,
                None => Vec::new(),
            },
            None => Vec::new(),
        };
        let product_ids: Vec<String> = lines.iter().map(|l| l.product_id.clone()).collect();

        let outcome = self
            .db
            .promotions()
            .eligibility(&promotion, Utc::now(), cart_total, user_id, &product_ids)
            .await?;

        match outcome {
            Err(reason) => Ok(PromotionPreview::invalid(cart_total, reason.to_string())),
            Ok(()) => {
                let priced: Vec<PricedLine> = lines.iter().map(PricedLine::from).collect();
                let breakdown = compute_discount(&promotion, &priced, cart_total);
                Ok(PromotionPreview {
                    valid: true,
                    discount_cents: breakdown.discount_cents,
                    final_cents: breakdown.final_cents,
                    shipping_waived: breakdown.shipping_waived,
                    message: "promotion applied".to_string(),
                })
            }
        }
    }

    /// Access to the underlying database, for hosts composing additional
    /// surfaces around the service.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

/// Generates an order number: `ORD-YYYYMMDD-XXXXXXXX`.
///
/// Dual-key identity: the UUID stays the relational key, this is the
/// customer-visible business id. The suffix reuses UUID entropy so two
/// workers can never mint the same number.
fn generate_order_number() -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix: String = Uuid::new_v4().simple().to_string()[..8].to_string();
    format!("ORD-{}-{}", date, suffix)
}

// =============================================================================
// Unit Tests
// =============================================================================
