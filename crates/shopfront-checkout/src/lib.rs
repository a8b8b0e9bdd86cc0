//! # shopfront-checkout: Checkout Orchestration
//!
//! The service layer of the Shopfront engine. [`CheckoutService`] drives a
//! checkout attempt through validation, reservation, pricing, and durable
//! order creation; [`OrderService`] and [`StockService`] expose the order
//! lifecycle and stock administration surfaces.
//!
//! ## Surfaces
//!
//! - `checkout(request)` → [`OrderSummary`] | [`CheckoutError`]
//! - `validate_promotion(code, user, total)` → [`PromotionPreview`]
//!   (read-only, side-effect-free)
//! - `update_order_status(order, status, actor)` → () | [`CheckoutError`]
//! - `receive_stock` / `adjust_stock` → () | [`CheckoutError`]
//!
//! Every error leaving this crate is a [`CheckoutError`] with a
//! machine-readable code and a displayable message; persistence error
//! types never cross this boundary.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod collaborators;
pub mod error;
pub mod orders;
pub mod stock;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{CheckoutRequest, CheckoutService, OrderSummary, PromotionPreview};
pub use collaborators::{
    CatalogProduct, LogNotifier, OrderNotifier, ProductCatalog, SqlProductCatalog,
};
pub use error::{CheckoutError, CheckoutErrorCode};
pub use orders::OrderService;
pub use stock::StockService;
