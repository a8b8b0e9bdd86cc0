//! End-to-end checkout flows against a real (SQLite) database.
//!
//! Covers discount math on a live cart, eligibility rejections,
//! compensating rollback on partial reservation failure, the no-oversell
//! property under concurrency, and the order lifecycle guards.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

use shopfront_checkout::{
    CheckoutError, CheckoutErrorCode, CheckoutRequest, CheckoutService, OrderNotifier,
    OrderService, SqlProductCatalog, StockService,
};
use shopfront_core::{
    Money, OrderStatus, PaymentMethod, Product, Promotion, PromotionKind, ShippingMethod,
};
use shopfront_db::{Database, DbConfig};

// =============================================================================
// Helpers
// =============================================================================

async fn in_memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// Opt-in log output for debugging: `RUST_LOG=debug cargo test`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

async fn stocked_product(db: &Database, sku: &str, price_cents: i64, stock: i64) -> Product {
    let product = db.products().insert(sku, sku, price_cents).await.unwrap();
    db.inventory().increase(&product.id, stock).await.unwrap();
    product
}

async fn cart_with(db: &Database, customer_id: &str, contents: &[(&Product, i64)]) -> String {
    let cart = db.carts().get_or_create_active(customer_id).await.unwrap();
    for (product, quantity) in contents {
        db.carts().add_line(&cart.id, product, *quantity).await.unwrap();
    }
    cart.id
}

fn request(customer_id: &str, cart_id: &str, code: Option<&str>) -> CheckoutRequest {
    CheckoutRequest {
        customer_id: customer_id.to_string(),
        cart_id: cart_id.to_string(),
        payment_method: PaymentMethod::Card,
        shipping_method: ShippingMethod::Standard,
        promotion_code: code.map(|c| c.to_string()),
    }
}

fn promotion(code: &str, kind: PromotionKind) -> Promotion {
    let now = Utc::now();
    Promotion {
        id: Uuid::new_v4().to_string(),
        code: Some(code.to_string()),
        kind,
        percent_bps: None,
        amount_cents: None,
        buy_quantity: None,
        get_quantity: None,
        starts_at: None,
        ends_at: None,
        active: true,
        max_usage: None,
        max_usage_per_user: None,
        min_purchase_cents: None,
        product_scope: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

fn save10(min_purchase_cents: i64) -> Promotion {
    let mut promo = promotion("SAVE10", PromotionKind::Percentage);
    promo.percent_bps = Some(1000);
    promo.min_purchase_cents = Some(min_purchase_cents);
    promo
}

// =============================================================================
// Happy Path
// =============================================================================

#[tokio::test]
async fn checkout_applies_percentage_promotion() {
    let db = in_memory_db().await;
    let service = CheckoutService::new(db.clone());

    // Cart: 2 × $10.00; SAVE10 = 10%, min purchase $15.00
    let product = stocked_product(&db, "TEE-1", 1000, 10).await;
    let cart_id = cart_with(&db, "cust-1", &[(&product, 2)]).await;
    db.promotions().insert(&save10(1500)).await.unwrap();

    let summary = service
        .checkout(request("cust-1", &cart_id, Some("SAVE10")))
        .await
        .unwrap();

    // $20.00 subtotal, $2.00 off, $5.00 standard shipping → $23.00
    assert_eq!(summary.subtotal_cents, 2000);
    assert_eq!(summary.discount_cents, 200);
    assert_eq!(summary.shipping_cents, 500);
    assert_eq!(summary.shipping_discount_cents, 0);
    assert_eq!(summary.total_cents, 2300);
    assert_eq!(summary.item_count, 1);

    // Reservation became permanent
    assert_eq!(db.inventory().available(&product.id).await.unwrap(), Some(8));

    // Order is durable with the snapshot and initial history
    let order = db.orders().get_by_id(&summary.order_id).await.unwrap().unwrap();
    assert_eq!(order.order_status, OrderStatus::Pending);
    assert_eq!(order.total_cents, 2300);

    let history = db.orders().history(&summary.order_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, OrderStatus::Pending);

    // Cart is frozen
    let cart = db.carts().get_by_id(&cart_id).await.unwrap().unwrap();
    assert_eq!(cart.status, shopfront_core::CartStatus::CheckedOut);

    // Usage was recorded exactly once
    let promo = db.promotions().find_by_code("SAVE10").await.unwrap().unwrap();
    assert_eq!(db.promotions().usage_count(&promo.id).await.unwrap(), 1);
}

#[tokio::test]
async fn checkout_without_promotion() {
    let db = in_memory_db().await;
    let service = CheckoutService::new(db.clone());

    let product = stocked_product(&db, "TEE-1", 1250, 5).await;
    let cart_id = cart_with(&db, "cust-1", &[(&product, 3)]).await;

    let summary = service.checkout(request("cust-1", &cart_id, None)).await.unwrap();

    assert_eq!(summary.subtotal_cents, 3750);
    assert_eq!(summary.discount_cents, 0);
    assert_eq!(summary.total_cents, 4250);
}

#[tokio::test]
async fn free_shipping_promotion_waives_shipping() {
    let db = in_memory_db().await;
    let service = CheckoutService::new(db.clone());

    let product = stocked_product(&db, "TEE-1", 2000, 5).await;
    let cart_id = cart_with(&db, "cust-1", &[(&product, 3)]).await;
    db.promotions()
        .insert(&promotion("FREESHIP", PromotionKind::FreeShipping))
        .await
        .unwrap();

    let summary = service
        .checkout(request("cust-1", &cart_id, Some("FREESHIP")))
        .await
        .unwrap();

    assert_eq!(summary.discount_cents, 0);
    assert_eq!(summary.shipping_cents, 500);
    assert_eq!(summary.shipping_discount_cents, 500);
    assert_eq!(summary.total_cents, 6000);
}

#[tokio::test]
async fn buy_x_get_y_discounts_matching_lines() {
    let db = in_memory_db().await;
    let service = CheckoutService::new(db.clone());

    let stickers = stocked_product(&db, "STKR-1", 500, 50).await;
    let mug = stocked_product(&db, "MUG-1", 1200, 50).await;
    let cart_id = cart_with(&db, "cust-1", &[(&stickers, 3), (&mug, 1)]).await;

    let mut promo = promotion("3FOR2", PromotionKind::BuyXGetY);
    promo.buy_quantity = Some(2);
    promo.get_quantity = Some(1);
    promo.product_scope = vec![stickers.id.clone()];
    db.promotions().insert(&promo).await.unwrap();

    let summary = service
        .checkout(request("cust-1", &cart_id, Some("3FOR2")))
        .await
        .unwrap();

    // One free sticker ($5.00); the mug line is out of scope
    assert_eq!(summary.discount_cents, 500);

    let items = db.orders().items(&summary.order_id).await.unwrap();
    assert_eq!(items[0].product_id, stickers.id);
    assert_eq!(items[0].discount_cents, 500);
    assert_eq!(items[0].line_total_cents, 1000);
    assert_eq!(items[1].discount_cents, 0);
}

// =============================================================================
// Rejections Before Reservation
// =============================================================================

#[tokio::test]
async fn empty_cart_fails_with_zero_reservations() {
    let db = in_memory_db().await;
    let service = CheckoutService::new(db.clone());

    let product = stocked_product(&db, "TEE-1", 1000, 5).await;
    let cart_id = cart_with(&db, "cust-1", &[]).await;

    let err = service.checkout(request("cust-1", &cart_id, None)).await.unwrap_err();
    assert_eq!(err.code, CheckoutErrorCode::EmptyCart);

    // Nothing was reserved
    assert_eq!(db.inventory().available(&product.id).await.unwrap(), Some(5));
}

#[tokio::test]
async fn ineligible_promotion_rejects_before_reservation() {
    let db = in_memory_db().await;
    let service = CheckoutService::new(db.clone());

    // Cart subtotal $20.00 against a $25.00 minimum
    let product = stocked_product(&db, "TEE-1", 1000, 5).await;
    let cart_id = cart_with(&db, "cust-1", &[(&product, 2)]).await;
    db.promotions().insert(&save10(2500)).await.unwrap();

    let err = service
        .checkout(request("cust-1", &cart_id, Some("SAVE10")))
        .await
        .unwrap_err();

    assert_eq!(err.code, CheckoutErrorCode::PromotionIneligible);
    assert!(err.message.contains("minimum purchase is $25.00"));

    // A bad code is never silently ignored, and nothing was reserved
    assert_eq!(db.inventory().available(&product.id).await.unwrap(), Some(5));
    assert!(db.orders().get_by_id("any").await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_promotion_code_fails_checkout() {
    let db = in_memory_db().await;
    let service = CheckoutService::new(db.clone());

    let product = stocked_product(&db, "TEE-1", 1000, 5).await;
    let cart_id = cart_with(&db, "cust-1", &[(&product, 1)]).await;

    let err = service
        .checkout(request("cust-1", &cart_id, Some("NOPE")))
        .await
        .unwrap_err();

    assert_eq!(err.code, CheckoutErrorCode::PromotionNotFound);
}

#[tokio::test]
async fn unsellable_product_fails_validation() {
    let db = in_memory_db().await;
    let service = CheckoutService::new(db.clone());

    let product = stocked_product(&db, "TEE-1", 1000, 5).await;
    let cart_id = cart_with(&db, "cust-1", &[(&product, 1)]).await;
    db.products().set_sellable(&product.id, false).await.unwrap();

    let err = service.checkout(request("cust-1", &cart_id, None)).await.unwrap_err();
    assert_eq!(err.code, CheckoutErrorCode::ProductUnavailable);
    assert_eq!(db.inventory().available(&product.id).await.unwrap(), Some(5));
}

// =============================================================================
// Compensating Rollback
// =============================================================================

#[tokio::test]
async fn partial_reservation_failure_releases_everything() {
    let db = in_memory_db().await;
    let service = CheckoutService::new(db.clone());

    let plenty = stocked_product(&db, "TEE-1", 1000, 10).await;
    let scarce = stocked_product(&db, "HOOD-1", 4000, 1).await;
    let cart_id = cart_with(&db, "cust-1", &[(&plenty, 2), (&scarce, 3)]).await;

    let err = service.checkout(request("cust-1", &cart_id, None)).await.unwrap_err();

    assert_eq!(err.code, CheckoutErrorCode::InsufficientStock);
    // The error names the offending product with its availability
    assert!(err.message.contains(&scarce.id));
    assert!(err.message.contains("available 1, requested 3"));

    // The successful reservation on the first line was rolled back
    assert_eq!(db.inventory().available(&plenty.id).await.unwrap(), Some(10));
    assert_eq!(db.inventory().available(&scarce.id).await.unwrap(), Some(1));

    // The cart is still active; the customer can retry
    let cart = db.carts().get_by_id(&cart_id).await.unwrap().unwrap();
    assert_eq!(cart.status, shopfront_core::CartStatus::Active);
}

#[tokio::test]
async fn resubmitting_the_same_cart_cannot_create_a_second_order() {
    let db = in_memory_db().await;
    let service = CheckoutService::new(db.clone());

    let product = stocked_product(&db, "TEE-1", 1000, 10).await;
    let cart_id = cart_with(&db, "cust-1", &[(&product, 1)]).await;

    service.checkout(request("cust-1", &cart_id, None)).await.unwrap();

    // The cart is checked out; the retry finds no active cart and the
    // reservation it never took stays untaken
    let err = service.checkout(request("cust-1", &cart_id, None)).await.unwrap_err();
    assert_eq!(err.code, CheckoutErrorCode::NotFound);
    assert_eq!(db.inventory().available(&product.id).await.unwrap(), Some(9));
}

// =============================================================================
// Usage Caps
// =============================================================================

#[tokio::test]
async fn max_usage_cap_blocks_the_next_checkout() {
    let db = in_memory_db().await;
    let service = CheckoutService::new(db.clone());

    let product = stocked_product(&db, "TEE-1", 2000, 10).await;
    let mut promo = save10(0);
    promo.max_usage = Some(1);
    db.promotions().insert(&promo).await.unwrap();

    let cart_a = cart_with(&db, "cust-a", &[(&product, 1)]).await;
    service.checkout(request("cust-a", &cart_a, Some("SAVE10"))).await.unwrap();

    let cart_b = cart_with(&db, "cust-b", &[(&product, 1)]).await;
    let err = service
        .checkout(request("cust-b", &cart_b, Some("SAVE10")))
        .await
        .unwrap_err();

    assert_eq!(err.code, CheckoutErrorCode::PromotionIneligible);
    assert!(err.message.contains("usage limit reached"));
}

#[tokio::test]
async fn per_user_cap_is_per_user() {
    let db = in_memory_db().await;
    let service = CheckoutService::new(db.clone());

    let product = stocked_product(&db, "TEE-1", 2000, 10).await;
    let mut promo = save10(0);
    promo.max_usage_per_user = Some(1);
    db.promotions().insert(&promo).await.unwrap();

    let cart_a = cart_with(&db, "cust-a", &[(&product, 1)]).await;
    service.checkout(request("cust-a", &cart_a, Some("SAVE10"))).await.unwrap();

    // Same user again: blocked
    let cart_a2 = cart_with(&db, "cust-a", &[(&product, 1)]).await;
    let err = service
        .checkout(request("cust-a", &cart_a2, Some("SAVE10")))
        .await
        .unwrap_err();
    assert_eq!(err.code, CheckoutErrorCode::PromotionIneligible);

    // A different user is unaffected
    let cart_b = cart_with(&db, "cust-b", &[(&product, 1)]).await;
    service.checkout(request("cust-b", &cart_b, Some("SAVE10"))).await.unwrap();
}

// =============================================================================
// Promotion Preview
// =============================================================================

#[tokio::test]
async fn validate_promotion_is_side_effect_free() {
    let db = in_memory_db().await;
    let service = CheckoutService::new(db.clone());

    db.promotions().insert(&save10(1500)).await.unwrap();
    let promo = db.promotions().find_by_code("SAVE10").await.unwrap().unwrap();

    let preview = service
        .validate_promotion("SAVE10", Some("cust-1"), Money::from_cents(2000))
        .await
        .unwrap();
    assert!(preview.valid);
    assert_eq!(preview.discount_cents, 200);
    assert_eq!(preview.final_cents, 1800);

    // Below the minimum: invalid with the displayable reason
    let preview = service
        .validate_promotion("SAVE10", Some("cust-1"), Money::from_cents(1000))
        .await
        .unwrap();
    assert!(!preview.valid);
    assert_eq!(preview.discount_cents, 0);
    assert_eq!(preview.final_cents, 1000);
    assert!(preview.message.contains("minimum purchase"));

    // Unknown code: invalid, not an error
    let preview = service
        .validate_promotion("NOPE", None, Money::from_cents(1000))
        .await
        .unwrap();
    assert!(!preview.valid);

    // Previews never consume usage
    assert_eq!(db.promotions().usage_count(&promo.id).await.unwrap(), 0);
}

// =============================================================================
// Order Lifecycle
// =============================================================================

#[tokio::test]
async fn completed_orders_reject_all_transitions() {
    let db = in_memory_db().await;
    let service = CheckoutService::new(db.clone());
    let orders = OrderService::new(db.clone());

    let product = stocked_product(&db, "TEE-1", 1000, 5).await;
    let cart_id = cart_with(&db, "cust-1", &[(&product, 1)]).await;
    let summary = service.checkout(request("cust-1", &cart_id, None)).await.unwrap();

    orders
        .update_order_status(&summary.order_id, OrderStatus::Paid, "admin:jane")
        .await
        .unwrap();
    orders
        .update_order_status(&summary.order_id, OrderStatus::Completed, "admin:jane")
        .await
        .unwrap();

    let history_before = orders.order_history(&summary.order_id).await.unwrap();

    let err = orders
        .update_order_status(&summary.order_id, OrderStatus::Cancelled, "admin:jane")
        .await
        .unwrap_err();
    assert_eq!(err.code, CheckoutErrorCode::InvalidTransition);

    // Status and history unchanged after the failed attempt
    let order = db.orders().get_by_id(&summary.order_id).await.unwrap().unwrap();
    assert_eq!(order.order_status, OrderStatus::Completed);
    let history_after = orders.order_history(&summary.order_id).await.unwrap();
    assert_eq!(history_before.len(), history_after.len());
}

#[tokio::test]
async fn history_is_ascending_and_complete() {
    let db = in_memory_db().await;
    let service = CheckoutService::new(db.clone());
    let orders = OrderService::new(db.clone());

    let product = stocked_product(&db, "TEE-1", 1000, 5).await;
    let cart_id = cart_with(&db, "cust-1", &[(&product, 1)]).await;
    let summary = service.checkout(request("cust-1", &cart_id, None)).await.unwrap();

    orders
        .update_order_status(&summary.order_id, OrderStatus::Paid, "admin:jane")
        .await
        .unwrap();
    orders
        .update_order_status(&summary.order_id, OrderStatus::Shipped, "admin:kim")
        .await
        .unwrap();

    let history = orders.order_history(&summary.order_id).await.unwrap();
    let statuses: Vec<OrderStatus> = history.iter().map(|h| h.status).collect();
    assert_eq!(
        statuses,
        vec![OrderStatus::Pending, OrderStatus::Paid, OrderStatus::Shipped]
    );
    for pair in history.windows(2) {
        assert!(pair[0].created_at <= pair[1].created_at);
    }
}

// =============================================================================
// Stock Administration
// =============================================================================

#[tokio::test]
async fn adjust_stock_rejects_negative_results() {
    let db = in_memory_db().await;
    let stock = StockService::new(db.clone());

    let product = stocked_product(&db, "TEE-1", 1000, 3).await;

    stock.adjust_stock(&product.id, -2).await.unwrap();
    assert_eq!(stock.available(&product.id).await.unwrap(), Some(1));

    let err = stock.adjust_stock(&product.id, -5).await.unwrap_err();
    assert_eq!(err.code, CheckoutErrorCode::NegativeStock);
    assert_eq!(stock.available(&product.id).await.unwrap(), Some(1));

    stock.receive_stock(&product.id, 10).await.unwrap();
    assert_eq!(stock.available(&product.id).await.unwrap(), Some(11));

    let err = stock.receive_stock(&product.id, -1).await.unwrap_err();
    assert_eq!(err.code, CheckoutErrorCode::Validation);
}

// =============================================================================
// Collaborators
// =============================================================================

/// Notifier that forwards order ids over a channel so the test can observe
/// the fire-and-forget delivery.
struct ChannelNotifier {
    tx: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl OrderNotifier for ChannelNotifier {
    async fn on_order_created(&self, order: shopfront_core::Order) {
        let _ = self.tx.send(order.id);
    }
}

#[tokio::test]
async fn order_created_notification_is_fire_and_forget() {
    let db = in_memory_db().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let service = CheckoutService::with_collaborators(
        db.clone(),
        Arc::new(SqlProductCatalog::new(db.clone())),
        Arc::new(ChannelNotifier { tx }),
    );

    let product = stocked_product(&db, "TEE-1", 1000, 5).await;
    let cart_id = cart_with(&db, "cust-1", &[(&product, 1)]).await;

    let summary = service.checkout(request("cust-1", &cart_id, None)).await.unwrap();

    // Checkout returned without waiting on delivery; the notification
    // arrives asynchronously
    let notified = tokio::time::timeout(std::time::Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(notified, summary.order_id);
}

// =============================================================================
// Concurrency
// =============================================================================

/// Two concurrent checkouts race for the last unit: exactly one wins and
/// availability ends at zero.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn last_unit_goes_to_exactly_one_customer() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(
        DbConfig::new(dir.path().join("race.db")).max_connections(5),
    )
    .await
    .unwrap();

    let product = stocked_product(&db, "LAST-1", 1000, 1).await;

    let mut carts = Vec::new();
    for customer in ["cust-a", "cust-b"] {
        carts.push((customer, cart_with(&db, customer, &[(&product, 1)]).await));
    }

    let mut handles = Vec::new();
    for (customer, cart_id) in carts {
        let service = CheckoutService::new(db.clone());
        let req = request(customer, &cart_id, None);
        handles.push(tokio::spawn(async move { service.checkout(req).await }));
    }

    let mut outcomes: Vec<Result<_, CheckoutError>> = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }

    let successes = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(successes, 1);

    let loser = outcomes.iter().find(|o| o.is_err()).unwrap();
    assert_eq!(
        loser.as_ref().unwrap_err().code,
        CheckoutErrorCode::InsufficientStock
    );

    assert_eq!(db.inventory().available(&product.id).await.unwrap(), Some(0));
}

/// The no-oversell property: with N units available and many concurrent
/// single-unit checkouts, exactly N succeed and availability never goes
/// negative.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_checkouts_never_oversell() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(
        DbConfig::new(dir.path().join("oversell.db")).max_connections(5),
    )
    .await
    .unwrap();

    const STOCK: i64 = 5;
    const ATTEMPTS: usize = 12;

    let product = stocked_product(&db, "HOT-1", 1500, STOCK).await;

    let mut carts = Vec::new();
    for i in 0..ATTEMPTS {
        let customer = format!("cust-{}", i);
        let cart_id = cart_with(&db, &customer, &[(&product, 1)]).await;
        carts.push((customer, cart_id));
    }

    let mut handles = Vec::new();
    for (customer, cart_id) in carts {
        let service = CheckoutService::new(db.clone());
        let req = request(&customer, &cart_id, None);
        handles.push(tokio::spawn(async move { service.checkout(req).await }));
    }

    let mut successes = 0;
    let mut shortages = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(err) => {
                assert_eq!(err.code, CheckoutErrorCode::InsufficientStock);
                shortages += 1;
            }
        }
    }

    assert_eq!(successes, STOCK as usize);
    assert_eq!(shortages, ATTEMPTS - STOCK as usize);
    assert_eq!(db.inventory().available(&product.id).await.unwrap(), Some(0));
}
