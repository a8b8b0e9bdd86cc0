//! # Order Lifecycle
//!
//! The single authoritative transition table for order statuses.
//!
//! The one hard rule today: no transition is permitted OUT of
//! `Completed`. Every other pair is currently allowed, which matches the
//! behavior administrators rely on (e.g. jumping a prepaid order straight
//! to Processing, or refunding from any non-terminal state). New rules
//! belong here and nowhere else.

use thiserror::Error;

use crate::types::OrderStatus;

/// A rejected status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot transition order from {from:?} to {to:?}")]
pub struct TransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// Whether an order in `from` may move to `to`.
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    match (from, to) {
        // Completed is terminal.
        (OrderStatus::Completed, _) => false,
        // All other transitions are permitted.
        _ => true,
    }
}

/// Checks a transition, returning a typed error for the caller to surface.
pub fn check_transition(from: OrderStatus, to: OrderStatus) -> Result<(), TransitionError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(TransitionError { from, to })
    }
}

/// Whether a status permits no further transitions.
#[inline]
pub fn is_terminal(status: OrderStatus) -> bool {
    matches!(status, OrderStatus::Completed)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_is_terminal() {
        for to in OrderStatus::ALL {
            assert!(
                !can_transition(OrderStatus::Completed, to),
                "Completed → {:?} must be rejected",
                to
            );
        }
    }

    #[test]
    fn test_all_other_sources_may_transition() {
        for from in OrderStatus::ALL {
            if from == OrderStatus::Completed {
                continue;
            }
            for to in OrderStatus::ALL {
                assert!(
                    can_transition(from, to),
                    "{:?} → {:?} should currently be allowed",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_check_transition_error_carries_pair() {
        let err = check_transition(OrderStatus::Completed, OrderStatus::Refunded).unwrap_err();
        assert_eq!(err.from, OrderStatus::Completed);
        assert_eq!(err.to, OrderStatus::Refunded);
        assert_eq!(
            err.to_string(),
            "cannot transition order from Completed to Refunded"
        );
    }

    #[test]
    fn test_is_terminal() {
        assert!(is_terminal(OrderStatus::Completed));
        assert!(!is_terminal(OrderStatus::Cancelled));
        assert!(!is_terminal(OrderStatus::Pending));
    }
}
