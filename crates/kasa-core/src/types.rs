//! # Domain Types
//!
//! Core domain types used throughout Kasa POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  CatalogItem    │   │    LineItem     │   │     Order       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │──►│  id, name       │──►│  id (server)    │       │
//! │  │  name           │   │  unit_price     │   │  items snapshot │       │
//! │  │  unit_price     │   │  quantity       │   │  totals, status │       │
//! │  │  vat_rate?      │   │  vat_rate?      │   │  payment_method │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │  PaymentMethod  │   │   OrderStatus   │                             │
//! │  │  Cash           │   │  Pending, Paid  │                             │
//! │  │  CardOnline     │   │  Completed, ... │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A line freezes name, price and VAT rate when the item is added; the
//! order freezes the lines when it is submitted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::{Money, Quantity, VatRate};
use crate::validation::validate_unit_price;

// =============================================================================
// Catalog Item
// =============================================================================

/// A product as handed to the cart by the catalog screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    /// Product identifier.
    pub id: String,

    /// Display name shown to the cashier and on the receipt.
    pub name: String,

    /// Unit price.
    pub unit_price: Money,

    /// VAT rate; the cart default applies when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat_rate: Option<VatRate>,
}

impl CatalogItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, unit_price: Money) -> Self {
        CatalogItem {
            id: id.into(),
            name: name.into(),
            unit_price,
            vat_rate: None,
        }
    }

    /// Sets an explicit VAT rate.
    pub fn with_vat_rate(mut self, rate: VatRate) -> Self {
        self.vat_rate = Some(rate);
        self
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// One product entry in the cart.
///
/// A line read from the wire (a saved cart, an order echoed by the backend)
/// gets the same price, quantity and rate checks as one built by the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "LineItemRecord")]
pub struct LineItem {
    /// Line identifier (the product id).
    pub id: String,

    /// Name at time of adding (frozen).
    pub name: String,

    /// Unit price at time of adding (frozen).
    pub unit_price: Money,

    /// Quantity in cart.
    pub quantity: Quantity,

    /// VAT rate at time of adding; `None` means "use the cart default".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat_rate: Option<VatRate>,
}

impl LineItem {
    /// Creates a line with quantity 1 from a catalog item.
    pub fn from_catalog(item: &CatalogItem) -> Self {
        LineItem {
            id: item.id.clone(),
            name: item.name.clone(),
            unit_price: item.unit_price,
            quantity: Quantity::one(),
            vat_rate: item.vat_rate,
        }
    }

    /// The rate that applies to this line.
    #[inline]
    pub fn effective_vat_rate(&self, default: VatRate) -> VatRate {
        self.vat_rate.unwrap_or(default)
    }

    /// Net line total (unit price × quantity).
    pub fn net_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    /// VAT for this line (unit price × quantity × rate), unrounded.
    pub fn vat_amount(&self, default: VatRate) -> Money {
        self.net_total()
            .calculate_vat(self.effective_vat_rate(default))
    }

    /// Line total including VAT.
    pub fn gross_total(&self, default: VatRate) -> Money {
        self.net_total() + self.vat_amount(default)
    }

    /// Copy of this line with the rate made explicit.
    ///
    /// Used when lines leave the cart (order snapshot, fiscal receipt) so
    /// downstream services never have to know the cart default.
    pub fn resolved(&self, default: VatRate) -> LineItem {
        LineItem {
            vat_rate: Some(self.effective_vat_rate(default)),
            ..self.clone()
        }
    }
}

/// Wire shape of a line before the price check.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineItemRecord {
    id: String,
    name: String,
    unit_price: Money,
    quantity: Quantity,
    #[serde(default)]
    vat_rate: Option<VatRate>,
}

impl TryFrom<LineItemRecord> for LineItem {
    type Error = ValidationError;

    fn try_from(record: LineItemRecord) -> Result<Self, Self::Error> {
        validate_unit_price(record.unit_price)?;
        Ok(LineItem {
            id: record.id,
            name: record.name,
            unit_price: record.unit_price,
            quantity: record.quantity,
            vat_rate: record.vat_rate,
        })
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer pays.
///
/// Closed set: every branch on payment method is an exhaustive `match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash over the counter; no gateway involved.
    Cash,
    /// Card or online transfer through the hosted payment gateway.
    #[serde(alias = "upi", alias = "card", alias = "online")]
    CardOnline,
}

impl PaymentMethod {
    /// Whether this method goes through the payment gateway.
    pub fn requires_gateway(&self) -> bool {
        match self {
            PaymentMethod::Cash => false,
            PaymentMethod::CardOnline => true,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::CardOnline => write!(f, "card_online"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card_online" | "card" | "online" | "upi" => Ok(PaymentMethod::CardOnline),
            other => Err(ValidationError::InvalidFormat {
                field: "payment_method".to_string(),
                reason: format!("unknown payment method '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Server-side status of an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, awaiting payment confirmation.
    #[default]
    Pending,
    /// Payment confirmed.
    Paid,
    /// Sale closed.
    Completed,
    /// Cancelled or voided.
    Cancelled,
}

// =============================================================================
// Order
// =============================================================================

/// A persisted order, as returned by the order service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Server-assigned identifier.
    pub id: String,
    pub customer_name: String,
    pub phone: String,
    /// Lines frozen at checkout time.
    pub items: Vec<LineItem>,
    pub subtotal: Money,
    pub tax: Money,
    pub grand_total: Money,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Number of lines on the order.
    pub fn line_count(&self) -> usize {
        self.items.len()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
