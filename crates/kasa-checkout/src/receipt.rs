//! # Receipt
//!
//! What the register shows (and prints) once a sale completes.

use chrono::{DateTime, Utc};
use serde::Serialize;

use kasa_core::{Money, Order, PaymentMethod, Quantity, VatRate};

use crate::config::StoreSettings;

// =============================================================================
// Fiscal Status
// =============================================================================

/// Outcome of the fiscal step of a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FiscalStatus {
    /// The device acknowledged the receipt.
    #[serde(rename_all = "camelCase")]
    Sent {
        device_id: String,
        receipt_number: Option<String>,
    },
    /// The device (or the fiscal service) rejected it.
    #[serde(rename_all = "camelCase")]
    Failed { device_id: String, reason: String },
    /// No fiscal device was selected.
    Skipped,
}

impl FiscalStatus {
    pub fn is_sent(&self) -> bool {
        matches!(self, FiscalStatus::Sent { .. })
    }

    /// The warning shown to the cashier when the receipt did not go out.
    pub fn warning(&self) -> Option<String> {
        match self {
            FiscalStatus::Sent { .. } => None,
            FiscalStatus::Failed { device_id, reason } => Some(format!(
                "Order saved, but the fiscal receipt was not sent to {}: {}",
                device_id, reason
            )),
            FiscalStatus::Skipped => {
                Some("Order saved, but no fiscal device is selected".to_string())
            }
        }
    }
}

// =============================================================================
// Receipt
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLine {
    pub name: String,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub vat_rate: VatRate,
    /// Net of VAT.
    pub line_total: Money,
}

/// A completed sale, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub order_id: String,
    pub store_name: String,
    pub customer_name: String,
    pub phone: String,
    pub issued_at: DateTime<Utc>,
    pub items: Vec<ReceiptLine>,
    pub subtotal: Money,
    pub tax: Money,
    pub grand_total: Money,
    pub payment_method: PaymentMethod,
    pub fiscal: FiscalStatus,
    pub warning: Option<String>,
}

impl Receipt {
    /// Builds the receipt for a persisted order.
    ///
    /// Falls back to the current time if the backend did not stamp the order.
    pub fn new(
        order: &Order,
        fiscal: FiscalStatus,
        store: &StoreSettings,
        default_vat_rate: VatRate,
    ) -> Self {
        let items = order
            .items
            .iter()
            .map(|line| ReceiptLine {
                name: line.name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                vat_rate: line.effective_vat_rate(default_vat_rate),
                line_total: line.net_total(),
            })
            .collect();

        Receipt {
            order_id: order.id.clone(),
            store_name: store.name.clone(),
            customer_name: order.customer_name.clone(),
            phone: order.phone.clone(),
            issued_at: order.created_at.unwrap_or_else(Utc::now),
            items,
            subtotal: order.subtotal,
            tax: order.tax,
            grand_total: order.grand_total,
            payment_method: order.payment_method,
            warning: fiscal.warning(),
            fiscal,
        }
    }

    /// Plain-text rendering for the receipt preview.
    pub fn render(&self, store: &StoreSettings) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n", self.store_name));
        out.push_str(&format!("Order {}\n", self.order_id));
        out.push_str(&format!("{}\n", self.issued_at.format("%Y-%m-%d %H:%M")));
        out.push_str(&format!("Customer: {} ({})\n\n", self.customer_name, self.phone));

        for item in &self.items {
            out.push_str(&format!(
                "{} x{} @ {}  {}  (VAT {}%)\n",
                item.name,
                item.quantity,
                store.format_money(item.unit_price),
                store.format_money(item.line_total),
                item.vat_rate.percentage(),
            ));
        }

        out.push_str(&format!("\nSubtotal: {}\n", store.format_money(self.subtotal)));
        out.push_str(&format!("VAT: {}\n", store.format_money(self.tax)));
        out.push_str(&format!("Total: {}\n", store.format_money(self.grand_total)));
        out.push_str(&format!("Paid by: {}\n", self.payment_method));

        if let FiscalStatus::Sent {
            receipt_number: Some(number),
            ..
        } = &self.fiscal
        {
            out.push_str(&format!("Fiscal receipt: {}\n", number));
        }
        if let Some(warning) = &self.warning {
            out.push_str(&format!("\n! {}\n", warning));
        }

        out
    }
}
