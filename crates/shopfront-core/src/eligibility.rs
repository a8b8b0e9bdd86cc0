//! # Promotion Eligibility
//!
//! The pure half of the promotion catalog: given a promotion and a
//! snapshot of the facts about a purchase, decide whether the promotion
//! may be applied.
//!
//! ## Check Order
//! Checks run in a FIXED order and short-circuit on the first failure:
//!
//! 1. `active == true`
//! 2. now within `[starts_at, ends_at]` (missing bound = unbounded)
//! 3. subtotal ≥ minimum purchase (skipped if no minimum)
//! 4. global usage < max_usage (skipped if uncapped)
//! 5. per-user usage < max_usage_per_user (skipped if uncapped or no user)
//! 6. scoped promotions must match at least one cart line's product
//!
//! Every failure maps to a distinct, user-displayable reason. Usage counts
//! are facts supplied by the caller (the catalog store counts committed
//! usages); this module never does I/O.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::money::Money;
use crate::types::Promotion;

/// Why a promotion cannot be applied. Messages are user-displayable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IneligibleReason {
    /// The code does not resolve to any promotion. Produced by the
    /// catalog lookup, carried here so callers handle one reason type.
    #[error("promotion code is not valid")]
    NotFound,

    #[error("promotion is no longer active")]
    Inactive,

    #[error("promotion starts on {starts_at}")]
    NotStarted { starts_at: DateTime<Utc> },

    #[error("promotion ended on {ended_at}")]
    Expired { ended_at: DateTime<Utc> },

    #[error("minimum purchase is {minimum}")]
    BelowMinimum { minimum: Money },

    #[error("promotion usage limit reached")]
    UsageLimitReached,

    #[error("you have reached the usage limit for this promotion")]
    UserLimitReached,

    #[error("promotion does not apply to any item in this cart")]
    NotApplicable,
}

/// The facts about a purchase attempt that eligibility is judged against.
#[derive(Debug, Clone)]
pub struct EligibilityContext<'a> {
    /// Evaluation instant; passed in, never read from a clock here.
    pub now: DateTime<Utc>,

    /// Cart subtotal before any discount.
    pub cart_subtotal: Money,

    /// Committed global redemption count for this promotion.
    pub global_usage: i64,

    /// Committed redemption count for the requesting user, or None when
    /// no user is identified (the per-user cap is then skipped).
    pub user_usage: Option<i64>,

    /// Product ids present in the cart, for scope matching.
    pub cart_product_ids: &'a [String],
}

/// Runs the eligibility checks in their fixed order.
///
/// Returns `Ok(())` when the promotion may be applied, or the first
/// failing check's reason.
///
/// ## Example
/// ```rust
/// use chrono::Utc;
/// use shopfront_core::eligibility::{check_eligibility, EligibilityContext, IneligibleReason};
/// use shopfront_core::money::Money;
/// # use shopfront_core::types::{Promotion, PromotionKind};
/// # let now = Utc::now();
/// # let promotion = Promotion {
/// #     id: "p".into(), code: Some("SAVE10".into()),
/// #     kind: PromotionKind::Percentage, percent_bps: Some(1000),
/// #     amount_cents: None, buy_quantity: None, get_quantity: None,
/// #     starts_at: None, ends_at: None, active: true,
/// #     max_usage: None, max_usage_per_user: None,
/// #     min_purchase_cents: Some(2500),
/// #     product_scope: vec![], created_at: now, updated_at: now,
/// # };
/// let ctx = EligibilityContext {
///     now: Utc::now(),
///     cart_subtotal: Money::from_cents(2000),
///     global_usage: 0,
///     user_usage: Some(0),
///     cart_product_ids: &[],
/// };
///
/// // $20.00 cart against a $25.00 minimum
/// assert_eq!(
///     check_eligibility(&promotion, &ctx),
///     Err(IneligibleReason::BelowMinimum { minimum: Money::from_cents(2500) }),
/// );
/// ```
pub fn check_eligibility(
    promotion: &Promotion,
    ctx: &EligibilityContext<'_>,
) -> Result<(), IneligibleReason> {
    if !promotion.active {
        return Err(IneligibleReason::Inactive);
    }

    if let Some(starts_at) = promotion.starts_at {
        if ctx.now < starts_at {
            return Err(IneligibleReason::NotStarted { starts_at });
        }
    }
    if let Some(ends_at) = promotion.ends_at {
        if ctx.now > ends_at {
            return Err(IneligibleReason::Expired { ended_at: ends_at });
        }
    }

    if let Some(min_cents) = promotion.min_purchase_cents {
        let minimum = Money::from_cents(min_cents);
        if ctx.cart_subtotal < minimum {
            return Err(IneligibleReason::BelowMinimum { minimum });
        }
    }

    if let Some(max_usage) = promotion.max_usage {
        if ctx.global_usage >= max_usage {
            return Err(IneligibleReason::UsageLimitReached);
        }
    }

    if let (Some(max_per_user), Some(user_usage)) =
        (promotion.max_usage_per_user, ctx.user_usage)
    {
        if user_usage >= max_per_user {
            return Err(IneligibleReason::UserLimitReached);
        }
    }

    if promotion.is_scoped()
        && !ctx
            .cart_product_ids
            .iter()
            .any(|p| promotion.applies_to(p))
    {
        return Err(IneligibleReason::NotApplicable);
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PromotionKind;
    use chrono::Duration;

    fn promotion() -> Promotion {
        let now = Utc::now();
        Promotion {
            id: "promo-1".to_string(),
            code: Some("SAVE10".to_string()),
            kind: PromotionKind::Percentage,
            percent_bps: Some(1000),
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

    fn ctx(subtotal_cents: i64) -> EligibilityContext<'static> {
        EligibilityContext {
            now: Utc::now(),
            cart_subtotal: Money::from_cents(subtotal_cents),
            global_usage: 0,
            user_usage: Some(0),
            cart_product_ids: &[],
        }
    }

    #[test]
    fn test_unrestricted_promotion_is_eligible() {
        assert_eq!(check_eligibility(&promotion(), &ctx(2000)), Ok(()));
    }

    #[test]
    fn test_inactive_fails_first() {
        let mut promo = promotion();
        promo.active = false;
        // Also below minimum, but inactive wins: checks are ordered
        promo.min_purchase_cents = Some(99_999);
        assert_eq!(
            check_eligibility(&promo, &ctx(2000)),
            Err(IneligibleReason::Inactive)
        );
    }

    #[test]
    fn test_not_started() {
        let mut promo = promotion();
        let starts_at = Utc::now() + Duration::days(1);
        promo.starts_at = Some(starts_at);
        assert_eq!(
            check_eligibility(&promo, &ctx(2000)),
            Err(IneligibleReason::NotStarted { starts_at })
        );
    }

    #[test]
    fn test_expired() {
        let mut promo = promotion();
        let ended_at = Utc::now() - Duration::days(1);
        promo.ends_at = Some(ended_at);
        assert_eq!(
            check_eligibility(&promo, &ctx(2000)),
            Err(IneligibleReason::Expired { ended_at })
        );
    }

    #[test]
    fn test_window_unbounded_sides() {
        let mut promo = promotion();
        promo.starts_at = Some(Utc::now() - Duration::days(1));
        // No end: still valid
        assert_eq!(check_eligibility(&promo, &ctx(2000)), Ok(()));

        let mut promo = promotion();
        promo.ends_at = Some(Utc::now() + Duration::days(1));
        // No start: still valid
        assert_eq!(check_eligibility(&promo, &ctx(2000)), Ok(()));
    }

    #[test]
    fn test_minimum_purchase() {
        let mut promo = promotion();
        promo.min_purchase_cents = Some(2500);

        // $20.00 cart against a $25.00 minimum
        let reason = check_eligibility(&promo, &ctx(2000)).unwrap_err();
        assert_eq!(
            reason,
            IneligibleReason::BelowMinimum { minimum: Money::from_cents(2500) }
        );
        assert_eq!(reason.to_string(), "minimum purchase is $25.00");

        // Exactly at the minimum is eligible
        assert_eq!(check_eligibility(&promo, &ctx(2500)), Ok(()));
    }

    #[test]
    fn test_global_usage_cap() {
        let mut promo = promotion();
        promo.max_usage = Some(3);

        let mut c = ctx(2000);
        c.global_usage = 2;
        assert_eq!(check_eligibility(&promo, &c), Ok(()));

        c.global_usage = 3;
        assert_eq!(
            check_eligibility(&promo, &c),
            Err(IneligibleReason::UsageLimitReached)
        );
    }

    #[test]
    fn test_per_user_cap() {
        let mut promo = promotion();
        promo.max_usage_per_user = Some(1);

        let mut c = ctx(2000);
        c.user_usage = Some(1);
        assert_eq!(
            check_eligibility(&promo, &c),
            Err(IneligibleReason::UserLimitReached)
        );

        // Anonymous caller: per-user cap is skipped
        c.user_usage = None;
        assert_eq!(check_eligibility(&promo, &c), Ok(()));
    }

    #[test]
    fn test_scope_requires_matching_line() {
        let mut promo = promotion();
        promo.product_scope = vec!["prod-a".to_string()];

        let in_scope = ["prod-a".to_string(), "prod-z".to_string()];
        let out_of_scope = ["prod-z".to_string()];

        let mut c = ctx(2000);
        c.cart_product_ids = &in_scope;
        assert_eq!(check_eligibility(&promo, &c), Ok(()));

        c.cart_product_ids = &out_of_scope;
        assert_eq!(
            check_eligibility(&promo, &c),
            Err(IneligibleReason::NotApplicable)
        );
    }

    #[test]
    fn test_reasons_are_displayable() {
        assert_eq!(
            IneligibleReason::UsageLimitReached.to_string(),
            "promotion usage limit reached"
        );
        assert_eq!(
            IneligibleReason::NotFound.to_string(),
            "promotion code is not valid"
        );
    }
}
