//! # Remote Collaborators
//!
//! The services a checkout talks to, and the payloads that cross the wire.
//!
//! ## Collaborators
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   CheckoutSequencer                                                     │
//! │        │                                                                │
//! │        ├──► OrderService     create_order / delete_order                │
//! │        ├──► FiscalService    send_receipt / list_devices                │
//! │        ├──► PaymentGateway   create_gateway_order / verify_payment      │
//! │        └──► PaymentPrompt    present (hosted payment window)            │
//! │                                                                         │
//! │   HttpBackend implements the first three over REST.                     │
//! │   PaymentPrompt is provided by the UI shell.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use kasa_core::{Cart, LineItem, Money, Order, PaymentMethod, Quantity, VatRate};

use crate::error::RemoteResult;

// =============================================================================
// Order Service
// =============================================================================

/// Body of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    /// Tags one checkout attempt so the backend can spot duplicates.
    pub client_reference: String,
    pub customer_name: String,
    pub phone: String,
    /// Lines with their VAT rate resolved.
    pub items: Vec<LineItem>,
    pub subtotal: Money,
    pub tax: Money,
    pub grand_total: Money,
    pub payment_method: PaymentMethod,
}

impl NewOrder {
    /// Snapshots the cart into an order request.
    pub fn from_cart(
        cart: &Cart,
        client_reference: impl Into<String>,
        customer_name: impl Into<String>,
        phone: impl Into<String>,
        payment_method: PaymentMethod,
    ) -> Self {
        let totals = cart.totals();
        NewOrder {
            client_reference: client_reference.into(),
            customer_name: customer_name.into(),
            phone: phone.into(),
            items: cart.resolved_lines(),
            subtotal: totals.subtotal,
            tax: totals.tax,
            grand_total: totals.grand_total,
            payment_method,
        }
    }
}

/// Persists and removes orders.
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Creates an order and returns the persisted snapshot.
    async fn create_order(&self, order: &NewOrder) -> RemoteResult<Order>;

    /// Deletes an order. Used only to compensate a failed payment.
    async fn delete_order(&self, order_id: &str) -> RemoteResult<()>;
}

// =============================================================================
// Fiscal Service
// =============================================================================

/// A fiscal printer/device registered with the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiscalDevice {
    pub id: String,
    pub name: String,
}

/// One line of a fiscal receipt, with its VAT broken out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiscalLine {
    pub name: String,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub vat_rate: VatRate,
    pub net_total: Money,
    pub vat_amount: Money,
}

/// Body of `POST /fiscal/receipts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiscalReceiptRequest {
    pub order_id: String,
    pub device_id: String,
    pub cashier: String,
    pub items: Vec<FiscalLine>,
    pub subtotal: Money,
    pub tax: Money,
    pub grand_total: Money,
}

impl FiscalReceiptRequest {
    /// Builds the receipt for a persisted order.
    ///
    /// Lines the backend returned without a rate get `default_vat_rate`.
    pub fn for_order(
        order: &Order,
        device_id: impl Into<String>,
        cashier: impl Into<String>,
        default_vat_rate: VatRate,
    ) -> Self {
        let items = order
            .items
            .iter()
            .map(|line| FiscalLine {
                name: line.name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                vat_rate: line.effective_vat_rate(default_vat_rate),
                net_total: line.net_total(),
                vat_amount: line.vat_amount(default_vat_rate),
            })
            .collect();

        FiscalReceiptRequest {
            order_id: order.id.clone(),
            device_id: device_id.into(),
            cashier: cashier.into(),
            items,
            subtotal: order.subtotal,
            tax: order.tax,
            grand_total: order.grand_total,
        }
    }
}

/// The device's acknowledgment of a fiscal receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiscalAck {
    /// Receipt number assigned by the device, when it reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_number: Option<String>,
}

/// Transmits receipts to fiscal devices.
#[async_trait]
pub trait FiscalService: Send + Sync {
    async fn list_devices(&self) -> RemoteResult<Vec<FiscalDevice>>;

    async fn send_receipt(&self, receipt: &FiscalReceiptRequest) -> RemoteResult<FiscalAck>;
}

// =============================================================================
// Payment Gateway
// =============================================================================

/// Body of `POST /payments/orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayOrderRequest {
    /// Amount in minor currency units (cents).
    pub amount: i64,
    /// ISO 4217 currency code.
    pub currency: String,
}

/// A payment session opened with the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayOrder {
    /// Gateway-side reference for this payment.
    pub id: String,
    pub amount: i64,
    pub currency: String,
    /// Publishable key the hosted payment window needs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// Body of `POST /payments/verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerification {
    pub gateway_order_id: String,
    pub payment_id: String,
    pub signature: String,
    pub order_id: String,
}

/// The backend's verdict on a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    #[serde(default = "default_verified")]
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn default_verified() -> bool {
    true
}

/// Opens and verifies online payments.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_gateway_order(&self, request: &GatewayOrderRequest)
        -> RemoteResult<GatewayOrder>;

    async fn verify_payment(
        &self,
        verification: &PaymentVerification,
    ) -> RemoteResult<PaymentConfirmation>;
}

// =============================================================================
// Payment Prompt
// =============================================================================

/// Everything the hosted payment window shows the customer.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewaySession {
    pub gateway_order: GatewayOrder,
    pub order_id: String,
    pub store_name: String,
    pub customer_name: String,
    pub phone: String,
    pub amount: Money,
}

/// How the hosted payment window was closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    /// The gateway reports success; still needs verification.
    Authorized { payment_id: String, signature: String },
    /// The customer closed the window.
    Dismissed,
    /// The gateway reported a failure.
    Failed { reason: String },
}

/// The hosted payment UI.
#[async_trait]
pub trait PaymentPrompt: Send + Sync {
    /// Shows the payment window and waits for it to close.
    async fn present(&self, session: &GatewaySession) -> PromptOutcome;
}

// =============================================================================
// Unit Tests
// =============================================================================
