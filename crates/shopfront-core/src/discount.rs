//! # Discount Calculator
//!
//! Pure discount calculation: (promotion, cart lines, subtotal) → breakdown.
//! No I/O, deterministic given inputs.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Discount Calculation                               │
//! │                                                                         │
//! │  Promotion ──► discount() ──► Discount (tagged union)                  │
//! │                                   │                                     │
//! │          ┌────────────────┬───────┴────────┬──────────────────┐        │
//! │          ▼                ▼                ▼                  ▼        │
//! │   PercentageRule    FixedAmountRule   BuyXGetYRule    FreeShippingRule │
//! │   subtotal × rate   min(amount,       per-line free   shipping_waived  │
//! │   capped at         subtotal)         units           flag only        │
//! │   subtotal                                                             │
//! │          │                │                │                  │        │
//! │          └────────────────┴────────┬───────┴──────────────────┘        │
//! │                                    ▼                                    │
//! │                          DiscountBreakdown                              │
//! │        { discount, final = max(0, subtotal − discount),                │
//! │          per-line discounts, shipping_waived }                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each rule is its own type implementing [`DiscountRule`], so every
//! discount kind is independently testable.

use serde::{Deserialize, Serialize};

use crate::money::{Money, Rate};
use crate::types::{CartLine, Discount, Promotion};

// =============================================================================
// Inputs & Outputs
// =============================================================================

/// The slice of a cart line the calculator needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl PricedLine {
    /// Line total (unit price × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

impl From<&CartLine> for PricedLine {
    fn from(line: &CartLine) -> Self {
        PricedLine {
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            unit_price_cents: line.unit_price_cents,
        }
    }
}

/// The result of applying a promotion to a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountBreakdown {
    /// Total discount off the subtotal, in cents. Never exceeds the
    /// subtotal.
    pub discount_cents: i64,

    /// `max(0, subtotal − discount)`, in cents. Never negative.
    pub final_cents: i64,

    /// Discount allocated per input line, same order as the input.
    /// Order-level discounts (percentage, fixed) allocate nothing per
    /// line; only line-scoped promotions fill these in.
    pub per_line_cents: Vec<i64>,

    /// Set by free-shipping promotions; consumed when pricing shipping.
    pub shipping_waived: bool,
}

impl DiscountBreakdown {
    /// A breakdown that discounts nothing.
    pub fn none(lines: usize, subtotal: Money) -> Self {
        DiscountBreakdown {
            discount_cents: 0,
            final_cents: subtotal.clamp_non_negative().cents(),
            per_line_cents: vec![0; lines],
            shipping_waived: false,
        }
    }

    fn from_total(discount: Money, subtotal: Money, per_line_cents: Vec<i64>) -> Self {
        let discount = discount.min(subtotal).clamp_non_negative();
        DiscountBreakdown {
            discount_cents: discount.cents(),
            final_cents: (subtotal - discount).clamp_non_negative().cents(),
            per_line_cents,
            shipping_waived: false,
        }
    }
}

// =============================================================================
// Rules
// =============================================================================

/// One discount rule per promotion kind.
pub trait DiscountRule {
    /// Applies the rule to the given lines and subtotal.
    fn apply(&self, lines: &[PricedLine], subtotal: Money) -> DiscountBreakdown;
}

/// Percentage off the subtotal, half-up rounded, capped at the subtotal.
#[derive(Debug, Clone, Copy)]
pub struct PercentageRule {
    pub rate: Rate,
}

impl DiscountRule for PercentageRule {
    fn apply(&self, lines: &[PricedLine], subtotal: Money) -> DiscountBreakdown {
        let discount = self.rate.of(subtotal);
        DiscountBreakdown::from_total(discount, subtotal, vec![0; lines.len()])
    }
}

/// Fixed amount off the subtotal.
///
/// The discount can never exceed what is being discounted:
/// `min(amount, subtotal)` keeps totals non-negative.
#[derive(Debug, Clone, Copy)]
pub struct FixedAmountRule {
    pub amount: Money,
}

impl DiscountRule for FixedAmountRule {
    fn apply(&self, lines: &[PricedLine], subtotal: Money) -> DiscountBreakdown {
        let discount = self.amount.min(subtotal);
        DiscountBreakdown::from_total(discount, subtotal, vec![0; lines.len()])
    }
}

/// Buy X get Y free, applied per matching line.
///
/// For a line with quantity `q`:
/// free units = `(q / (buy + get)) * get`, discount = free units × unit
/// price. Lines outside the promotion's product scope get zero.
#[derive(Debug, Clone)]
pub struct BuyXGetYRule<'a> {
    pub buy_quantity: i64,
    pub get_quantity: i64,
    /// Product ids the promotion is restricted to; empty = all lines.
    pub scope: &'a [String],
}

impl BuyXGetYRule<'_> {
    fn line_matches(&self, line: &PricedLine) -> bool {
        self.scope.is_empty() || self.scope.iter().any(|p| *p == line.product_id)
    }

    /// Free units for a single line quantity.
    fn free_units(&self, quantity: i64) -> i64 {
        let bundle = self.buy_quantity + self.get_quantity;
        if bundle <= 0 || self.get_quantity <= 0 {
            return 0;
        }
        (quantity / bundle) * self.get_quantity
    }
}

impl DiscountRule for BuyXGetYRule<'_> {
    fn apply(&self, lines: &[PricedLine], subtotal: Money) -> DiscountBreakdown {
        let mut per_line_cents = Vec::with_capacity(lines.len());
        let mut total = Money::zero();

        for line in lines {
            let line_discount = if self.line_matches(line) {
                Money::from_cents(line.unit_price_cents)
                    .multiply_quantity(self.free_units(line.quantity))
            } else {
                Money::zero()
            };
            per_line_cents.push(line_discount.cents());
            total += line_discount;
        }

        DiscountBreakdown::from_total(total, subtotal, per_line_cents)
    }
}

/// Free shipping: zero subtotal discount, waived shipping fee.
#[derive(Debug, Clone, Copy)]
pub struct FreeShippingRule;

impl DiscountRule for FreeShippingRule {
    fn apply(&self, lines: &[PricedLine], subtotal: Money) -> DiscountBreakdown {
        let mut breakdown = DiscountBreakdown::none(lines.len(), subtotal);
        breakdown.shipping_waived = true;
        breakdown
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Computes the discount breakdown for a promotion against cart lines.
///
/// ## Example
/// ```rust
/// use shopfront_core::discount::{compute_discount, PricedLine};
/// # use shopfront_core::money::Money;
/// # use shopfront_core::types::{Promotion, PromotionKind};
/// # use chrono::Utc;
/// # let now = Utc::now();
/// # let promotion = Promotion {
/// #     id: "p".into(), code: Some("SAVE10".into()),
/// #     kind: PromotionKind::Percentage, percent_bps: Some(1000),
/// #     amount_cents: None, buy_quantity: None, get_quantity: None,
/// #     starts_at: None, ends_at: None, active: true,
/// #     max_usage: None, max_usage_per_user: None, min_purchase_cents: None,
/// #     product_scope: vec![], created_at: now, updated_at: now,
/// # };
/// let lines = vec![PricedLine {
///     product_id: "a".into(),
///     quantity: 2,
///     unit_price_cents: 1000,
/// }];
///
/// // $20.00 cart, 10% promotion → $2.00 off, $18.00 final
/// let breakdown = compute_discount(&promotion, &lines, Money::from_cents(2000));
/// assert_eq!(breakdown.discount_cents, 200);
/// assert_eq!(breakdown.final_cents, 1800);
/// ```
pub fn compute_discount(
    promotion: &Promotion,
    lines: &[PricedLine],
    subtotal: Money,
) -> DiscountBreakdown {
    match promotion.discount() {
        Discount::Percentage { rate } => PercentageRule { rate }.apply(lines, subtotal),
        Discount::FixedAmount { amount } => FixedAmountRule { amount }.apply(lines, subtotal),
        Discount::BuyXGetY { buy_quantity, get_quantity } => BuyXGetYRule {
            buy_quantity,
            get_quantity,
            scope: &promotion.product_scope,
        }
        .apply(lines, subtotal),
        Discount::FreeShipping => FreeShippingRule.apply(lines, subtotal),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
