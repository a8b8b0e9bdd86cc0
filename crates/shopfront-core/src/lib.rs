//! # shopfront-core: Pure Business Logic for the Shopfront Checkout Engine
//!
//! This crate is the heart of the checkout and fulfillment engine. It
//! contains all business logic as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Shopfront Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 shopfront-checkout (orchestration)              │   │
//! │  │    checkout, validate_promotion, update_order_status, stock     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ shopfront-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  discount  │  │eligibility│  │   │
//! │  │   │ Cart/Order│  │   Money   │  │ rules per  │  │fixed-order│  │   │
//! │  │   │ Promotion │  │   Rate    │  │ disc. type │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐                                 │   │
//! │  │   │ lifecycle │  │ validation│                                 │   │
//! │  │   └───────────┘  └───────────┘                                 │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  shopfront-db (persistence)                     │   │
//! │  │      inventory ledger, carts, orders, promotions (SQLite)       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Cart, Order, Promotion, statuses, ...)
//! - [`money`] - Money and Rate types with integer arithmetic
//! - [`discount`] - Discount calculator, one rule per discount type
//! - [`eligibility`] - Fixed-order promotion eligibility checks
//! - [`lifecycle`] - Order status transition table
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: deterministic - same input = same output; "now"
//!    is always a parameter, never a clock read
//! 2. **No I/O**: database, network, and file system access are FORBIDDEN
//! 3. **Integer Money**: all monetary values are cents (i64); rounding is
//!    half-up and happens in exactly one place
//! 4. **Explicit Errors**: all errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod discount;
pub mod eligibility;
pub mod error;
pub mod lifecycle;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, ValidationError};
pub use money::{Money, Rate};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
///
/// Keeps carts within reasonable transaction sizes; can become a
/// per-store setting later.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line.
///
/// Guards against fat-finger quantities (1000 typed instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Actor label recorded on system-initiated status history rows.
pub const SYSTEM_ACTOR: &str = "system";
