//! # Checkout Session
//!
//! The mutable state of one register: its cart, its cashier and the fiscal
//! device receipts go to.
//!
//! A session is owned by the UI shell and lent to the sequencer as
//! `&mut CheckoutSession` for the duration of a checkout, so nothing else
//! can touch the cart while a sale is in flight.

use tracing::debug;

use kasa_core::{Cart, CartTotals};

use crate::config::CheckoutSettings;

/// One register's working state.
#[derive(Debug, Clone, Default)]
pub struct CheckoutSession {
    cart: Cart,
    cashier: String,
    fiscal_device: Option<String>,
}

impl CheckoutSession {
    /// Starts a session with an empty cart.
    pub fn new(settings: &CheckoutSettings) -> Self {
        CheckoutSession {
            cart: Cart::with_default_vat_rate(settings.default_vat_rate),
            cashier: settings.cashier.clone(),
            fiscal_device: settings.fiscal_device.clone(),
        }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn cart_mut(&mut self) -> &mut Cart {
        &mut self.cart
    }

    pub fn totals(&self) -> CartTotals {
        self.cart.totals()
    }

    pub fn cashier(&self) -> &str {
        &self.cashier
    }

    pub fn set_cashier(&mut self, cashier: impl Into<String>) {
        self.cashier = cashier.into();
    }

    /// The fiscal device the next receipt goes to, if any.
    pub fn fiscal_device(&self) -> Option<&str> {
        self.fiscal_device.as_deref()
    }

    /// Selects the fiscal device; `None` skips fiscal receipts.
    pub fn select_fiscal_device(&mut self, device_id: Option<String>) {
        debug!(device_id = ?device_id, "Fiscal device selected");
        self.fiscal_device = device_id.filter(|d| !d.trim().is_empty());
    }

    /// Clears the cart after a completed sale.
    pub(crate) fn finish_sale(&mut self) {
        self.cart.clear();
    }
}
