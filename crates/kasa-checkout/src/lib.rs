//! # kasa-checkout: Checkout Orchestration for Kasa POS
//!
//! Turns a cart into a persisted, paid and fiscalised order.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        kasa-checkout Architecture                       │
//! │                                                                         │
//! │   UI shell                                                              │
//! │     │  CheckoutSession (cart, cashier, fiscal device)                   │
//! │     │  CheckoutRequest (customer, phone, payment method)                │
//! │     ▼                                                                   │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    CheckoutSequencer                            │   │
//! │  │                                                                 │   │
//! │  │   create order ──► [pay online] ──► fiscal receipt ──► receipt  │   │
//! │  │         │               │                                       │   │
//! │  │         │               └── fail/dismiss ──► delete order       │   │
//! │  └─────────┼───────────────┼───────────────────────────────────────┘   │
//! │            ▼               ▼                                            │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  OrderService • FiscalService • PaymentGateway • PaymentPrompt  │   │
//! │  │  (HttpBackend over reqwest, or any other implementation)       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Remote, checkout and config errors, UI notices
//! - [`remote`] - Collaborator traits and wire types
//! - [`http`] - REST implementation of the collaborators
//! - [`session`] - Per-register checkout session
//! - [`receipt`] - Receipt shown after a sale
//! - [`sequencer`] - The checkout state machine
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use kasa_checkout::{
//!     CheckoutRequest, CheckoutSequencer, CheckoutSession, Collaborators, GatewaySession,
//!     HttpBackend, KasaConfig, PaymentPrompt, PromptOutcome,
//! };
//! use kasa_core::{CatalogItem, Money, PaymentMethod};
//!
//! struct CounterTerminal;
//!
//! #[async_trait]
//! impl PaymentPrompt for CounterTerminal {
//!     async fn present(&self, _session: &GatewaySession) -> PromptOutcome {
//!         PromptOutcome::Dismissed
//!     }
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = KasaConfig::load_or_default(None);
//! let backend = Arc::new(HttpBackend::new(&config.api)?);
//! let mut sequencer = CheckoutSequencer::from_config(
//!     Collaborators::from_backend(backend, Arc::new(CounterTerminal)),
//!     &config,
//! );
//!
//! let mut session = CheckoutSession::new(&config.checkout);
//! session
//!     .cart_mut()
//!     .add(&CatalogItem::new("tea", "Green Tea", Money::from_cents(120)))?;
//!
//! let outcome = sequencer
//!     .checkout(&mut session, CheckoutRequest::new("Ana", "0501234567", PaymentMethod::Cash))
//!     .await?;
//! println!("{}", outcome.receipt.render(sequencer.store()));
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod http;
pub mod receipt;
pub mod remote;
pub mod sequencer;
pub mod session;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use config::{ApiSettings, CheckoutSettings, KasaConfig, StoreSettings};
pub use error::{
    CheckoutError, CheckoutResult, ConfigError, ConfigResult, ErrorCode, Notice, RemoteError,
    RemoteResult,
};
pub use http::HttpBackend;
pub use receipt::{FiscalStatus, Receipt, ReceiptLine};
pub use remote::{
    FiscalAck, FiscalDevice, FiscalReceiptRequest, FiscalService, GatewayOrder,
    GatewayOrderRequest, GatewaySession, NewOrder, OrderService, PaymentConfirmation,
    PaymentGateway, PaymentPrompt, PaymentVerification, PromptOutcome,
};
pub use sequencer::{
    CheckoutOutcome, CheckoutRequest, CheckoutSequencer, CheckoutState, Collaborators,
};
pub use session::CheckoutSession;
