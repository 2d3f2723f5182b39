//! # kasa-core: Pure Business Logic for Kasa POS
//!
//! This crate is the **heart** of the Kasa POS checkout. It contains the cart
//! ledger and all money/VAT arithmetic as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kasa POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    UI (catalog, cart, checkout)                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               kasa-checkout (sequencer + REST clients)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kasa-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │ validation│  │   │
//! │  │   │ LineItem  │  │   Money   │  │   Cart    │  │   rules   │  │   │
//! │  │   │  Order    │  │  VatRate  │  │ CartTotals│  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • PURE FUNCTIONS                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (CatalogItem, LineItem, Order, PaymentMethod)
//! - [`money`] - Money, VatRate and Quantity on exact decimals
//! - [`cart`] - The cart ledger and its totals
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use kasa_core::{Cart, CatalogItem, Money, VatRate};
//! use rust_decimal::Decimal;
//!
//! let mut cart = Cart::new();
//! let tea = CatalogItem::new("tea", "Green Tea", Money::from_cents(120))
//!     .with_vat_rate(VatRate::from_bps(900));
//! cart.add(&tea).unwrap();
//!
//! assert_eq!(cart.tax().amount(), Decimal::new(108, 3)); // 0.108
//! assert_eq!(cart.grand_total(), cart.subtotal() + cart.tax());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartTotals, QuantityChange};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Quantity, VatRate};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
///
/// ## Business Reason
/// Prevents runaway carts and keeps fiscal receipts within device limits.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Standard VAT rate in basis points (2000 = 20%), used for lines with no
/// explicit rate.
pub const DEFAULT_VAT_RATE_BPS: u32 = 2000;

/// Fractional digits kept on a quantity.
pub const QUANTITY_SCALE: u32 = 2;

/// Maximum unit price, in cents (1,000,000.00).
///
/// ## Business Reason
/// Catches mistyped prices before they reach a fiscal device. With the line
/// and quantity limits above it also bounds every cart total well inside
/// exact decimal range, so ledger arithmetic never overflows.
pub const MAX_UNIT_PRICE_CENTS: i64 = 100_000_000;
