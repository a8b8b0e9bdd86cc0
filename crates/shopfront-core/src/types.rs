//! # Domain Types
//!
//! Core domain types for the Shopfront checkout engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Cart        │   │     Order       │   │   Promotion     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  customer_id    │   │  order_number   │   │  code           │       │
//! │  │  status         │──►│  order_status   │   │  kind + value   │       │
//! │  │  CartLine[]     │   │  OrderItem[]    │   │  validity/caps  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  A Cart transitions to CHECKED_OUT exactly once and becomes the        │
//! │  immutable source of one Order's item snapshot. InventoryLevel is      │
//! │  the sole arbiter of availability and only the ledger mutates it.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Orders carry two identifiers:
//! - `id`: UUID v4 - immutable, used for database relations
//! - `order_number`: human-readable business id shown to customers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::{Money, Rate};

// =============================================================================
// Product
// =============================================================================

/// A product as the checkout engine sees it.
///
/// Catalog management (names, descriptions, categories) is an external
/// concern; checkout only needs identity, price, and sellability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name, snapshotted onto order items at purchase time.
    pub name: String,

    /// Price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Whether the product may currently be sold.
    pub sellable: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The status of a customer's cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    /// Cart is being built (lines may be added/changed).
    Active,
    /// Cart was converted into an order; frozen for audit.
    CheckedOut,
    /// Cart was abandoned or explicitly canceled.
    Canceled,
    /// The order produced from this cart reached a terminal success state.
    Completed,
}

impl Default for CartStatus {
    fn default() -> Self {
        CartStatus::Active
    }
}

/// A customer's shopping cart.
///
/// Invariant: at most one Active cart per customer (enforced by the cart
/// store with a partial unique index).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Cart {
    pub id: String,
    pub customer_id: String,
    pub status: CartStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line in a cart.
///
/// Uses the snapshot pattern: `unit_price_cents` is frozen at the moment
/// the product is added, so later catalog price changes never reprice a
/// cart behind the customer's back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CartLine {
    pub id: String,
    pub cart_id: String,
    pub product_id: String,
    /// Quantity in cart (always > 0; zero removes the line).
    pub quantity: i64,
    /// Unit price in cents at time of adding (frozen).
    pub unit_price_cents: i64,
    /// Position within the cart; lines form an ordered set.
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

impl CartLine {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Line total (unit price × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

/// Sums cart line totals into a subtotal.
pub fn cart_subtotal(lines: &[CartLine]) -> Money {
    lines
        .iter()
        .fold(Money::zero(), |acc, line| acc + line.line_total())
}

// =============================================================================
// Promotion
// =============================================================================

/// The kind of discount a promotion grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PromotionKind {
    /// Percentage off the cart subtotal.
    Percentage,
    /// Fixed amount off the cart subtotal.
    FixedAmount,
    /// Buy X units, get Y units free, per matching line.
    BuyXGetY,
    /// Waives the shipping fee; no subtotal discount.
    FreeShipping,
}

/// A promotion definition.
///
/// Created and updated by administrators; checkout never mutates one.
/// Usage-count side effects are recorded separately as [`PromotionUsage`]
/// rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Promotion {
    pub id: String,

    /// Redemption code, unique when present. None means an automatic
    /// promotion that needs no code.
    pub code: Option<String>,

    pub kind: PromotionKind,

    /// Percentage value in basis points (Percentage promotions).
    pub percent_bps: Option<i64>,

    /// Discount amount in cents (FixedAmount promotions).
    pub amount_cents: Option<i64>,

    /// Units the customer must buy (BuyXGetY promotions).
    pub buy_quantity: Option<i64>,

    /// Units granted free (BuyXGetY promotions).
    pub get_quantity: Option<i64>,

    /// Validity window start; None = unbounded on that side.
    pub starts_at: Option<DateTime<Utc>>,

    /// Validity window end; None = unbounded on that side.
    pub ends_at: Option<DateTime<Utc>>,

    /// Kill switch; inactive promotions are never eligible.
    pub active: bool,

    /// Global redemption cap; None = unlimited.
    pub max_usage: Option<i64>,

    /// Per-customer redemption cap; None = unlimited.
    pub max_usage_per_user: Option<i64>,

    /// Minimum cart subtotal in cents; None = no minimum.
    pub min_purchase_cents: Option<i64>,

    /// Product ids this promotion is restricted to.
    /// Empty set ⇒ applies to all products.
    pub product_scope: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Promotion {
    /// Whether this promotion is restricted to a product subset.
    #[inline]
    pub fn is_scoped(&self) -> bool {
        !self.product_scope.is_empty()
    }

    /// Whether this promotion applies to the given product.
    pub fn applies_to(&self, product_id: &str) -> bool {
        !self.is_scoped() || self.product_scope.iter().any(|p| p == product_id)
    }

    /// Builds the tagged discount value for the calculator.
    ///
    /// Missing value columns degrade to a zero-valued discount rather than
    /// panicking; a malformed promotion then simply discounts nothing.
    pub fn discount(&self) -> Discount {
        match self.kind {
            PromotionKind::Percentage => Discount::Percentage {
                rate: Rate::from_bps(self.percent_bps.unwrap_or(0).clamp(0, u32::MAX as i64) as u32),
            },
            PromotionKind::FixedAmount => Discount::FixedAmount {
                amount: Money::from_cents(self.amount_cents.unwrap_or(0).max(0)),
            },
            PromotionKind::BuyXGetY => Discount::BuyXGetY {
                buy_quantity: self.buy_quantity.unwrap_or(0).max(0),
                get_quantity: self.get_quantity.unwrap_or(0).max(0),
            },
            PromotionKind::FreeShipping => Discount::FreeShipping,
        }
    }
}

/// A discount value, tagged by type.
///
/// One calculator rule exists per variant; see [`crate::discount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discount {
    Percentage { rate: Rate },
    FixedAmount { amount: Money },
    BuyXGetY { buy_quantity: i64, get_quantity: i64 },
    FreeShipping,
}

/// An append-only redemption record.
///
/// Written exactly once per successful checkout that applied a promotion;
/// never updated or deleted. Usage caps are counted from these rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PromotionUsage {
    pub id: String,
    pub promotion_id: String,
    pub order_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Inventory
// =============================================================================

/// Per-product stock level.
///
/// Invariant: `available_quantity >= 0` at all times, including under
/// concurrent checkouts. Only the inventory ledger mutates these rows, and
/// every mutation bumps `version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryLevel {
    pub product_id: String,
    pub available_quantity: i64,
    /// Monotonically increasing revision counter.
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Order
// =============================================================================

/// The fulfillment status of an order.
///
/// Transition legality lives in [`crate::lifecycle`]; the one hard rule is
/// that Completed is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// All statuses, in lifecycle order. Used by the transition tests.
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ];
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

/// Payment state, tracked independently of fulfillment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    CashOnDelivery,
    BankTransfer,
}

/// How the order ships. Fees are flat per method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ShippingMethod {
    Standard,
    Express,
    Pickup,
}

impl ShippingMethod {
    /// Flat shipping fee in cents for this method.
    pub const fn fee_cents(&self) -> i64 {
        match self {
            ShippingMethod::Standard => 500,
            ShippingMethod::Express => 1500,
            ShippingMethod::Pickup => 0,
        }
    }

    /// Flat shipping fee as Money.
    #[inline]
    pub fn fee(&self) -> Money {
        Money::from_cents(self.fee_cents())
    }
}

/// A durable order, created once from exactly one checked-out cart.
///
/// Financial figures and items are immutable after creation; only
/// `order_status` and `payment_status` change over the order's life.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    /// Human-readable business id (e.g. `ORD-20260806-0421`).
    pub order_number: String,
    pub customer_id: String,
    /// The cart this order was created from; unique per order.
    pub cart_id: String,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub shipping_method: ShippingMethod,
    /// Promotion applied at checkout, if any.
    pub promotion_id: Option<String>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub shipping_cents: i64,
    pub shipping_discount_cents: i64,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns the grand total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line item on an order.
///
/// Snapshot pattern: product name and unit price are frozen at purchase
/// time so the order renders identically forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Product name at time of purchase (frozen).
    pub name_snapshot: String,
    pub quantity: i64,
    /// Unit price in cents at time of purchase (frozen).
    pub unit_price_cents: i64,
    /// Discount allocated to this line.
    pub discount_cents: i64,
    /// quantity × unit price − line discount.
    pub line_total_cents: i64,
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

/// One row of the append-only order status audit trail.
///
/// Written on every transition (including the initial Pending entry);
/// never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderStatusEntry {
    pub id: String,
    pub order_id: String,
    pub status: OrderStatus,
    /// Who performed the transition (customer id, admin id, or "system").
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
