//! # Cart Ledger
//!
//! The in-memory list of line items for one active sale, and its totals.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Ledger Operations                               │
//! │                                                                         │
//! │  UI Action                Ledger Call             Effect                │
//! │  ─────────                ───────────             ──────                │
//! │                                                                         │
//! │  Click product ──────────► add(item) ───────────► qty += 1 or push     │
//! │                                                                         │
//! │  Edit quantity ──────────► update_quantity() ───► qty = round(n, 2)    │
//! │                                                   or line removed       │
//! │                                                                         │
//! │  Click remove ───────────► remove(id) ──────────► line dropped         │
//! │                                                                         │
//! │  Order placed ───────────► clear() ─────────────► lines emptied        │
//! │                                                                         │
//! │  Render totals ──────────► totals() ────────────► (read only)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Totals
//! ```text
//! subtotal    = Σ unit_price × qty
//! tax         = Σ unit_price × qty × vat_rate     (per line, mixed rates)
//! grand_total = subtotal + tax                     (exact, no rounding)
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Money, Quantity, VatRate};
use crate::types::{CatalogItem, LineItem};
use crate::validation::{
    validate_cart_size, validate_item_name, validate_line_id, validate_unit_price,
    ValidationResult,
};
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

// =============================================================================
// Quantity Change
// =============================================================================

/// What `update_quantity` did.
///
/// Bad input is reported through this value rather than an error, because
/// two of the outcomes still change the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuantityChange {
    /// The line now has this (normalized) quantity.
    Updated(Quantity),
    /// Quantity was zero, negative or not a number; the line was removed.
    Removed(ValidationError),
    /// Quantity was above the per-line maximum; the line is unchanged.
    Rejected(ValidationError),
    /// No line with that id; nothing changed.
    NotInCart,
}

impl QuantityChange {
    /// Whether the requested quantity was applied as-is (after rounding).
    pub fn is_updated(&self) -> bool {
        matches!(self, QuantityChange::Updated(_))
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart.
///
/// ## Invariants
/// - Lines are unique by name (adding the same name again bumps quantity)
///   and by id
/// - Every quantity is > 0 with at most two fractional digits
/// - At most `MAX_CART_LINES` lines, each at most `MAX_LINE_QUANTITY`
///
/// A deserialized cart is rebuilt through the same checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "CartRecord")]
pub struct Cart {
    lines: Vec<LineItem>,

    /// Rate for lines that carry no explicit VAT rate.
    default_vat_rate: VatRate,
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

impl Cart {
    /// Creates an empty cart with the standard default VAT rate (20%).
    pub fn new() -> Self {
        Self::with_default_vat_rate(VatRate::default())
    }

    /// Creates an empty cart with a store-specific default VAT rate.
    pub fn with_default_vat_rate(default_vat_rate: VatRate) -> Self {
        Cart {
            lines: Vec::new(),
            default_vat_rate,
        }
    }

    /// Adds one unit of a product.
    ///
    /// ## Behavior
    /// - A line with the same name exists: quantity += 1 (its id, name and
    ///   price are kept)
    /// - Otherwise: a new line with quantity 1 is appended
    ///
    /// ## Errors
    /// The cart is left unchanged if the item is malformed, its id already
    /// belongs to a line with another name, the cart is full, or the merged
    /// quantity would exceed `MAX_LINE_QUANTITY`.
    pub fn add(&mut self, item: &CatalogItem) -> CoreResult<&LineItem> {
        validate_line_id(&item.id)?;
        validate_item_name(&item.name)?;
        validate_unit_price(item.unit_price)?;

        let existing = self.lines.iter().position(|l| l.name == item.name);
        if existing.is_none() {
            if let Some(taken) = self.lines.iter().find(|l| l.id == item.id) {
                return Err(CoreError::LineConflict {
                    id: item.id.clone(),
                    name: taken.name.clone(),
                });
            }
        }

        let index = match existing {
            Some(index) => {
                let line = &mut self.lines[index];
                match line.quantity.incremented() {
                    Ok(qty) => line.quantity = qty,
                    Err(_) => {
                        return Err(CoreError::QuantityTooLarge {
                            name: line.name.clone(),
                            max: MAX_LINE_QUANTITY,
                        })
                    }
                }
                index
            }
            None => {
                validate_cart_size(self.lines.len())
                    .map_err(|_| CoreError::CartTooLarge { max: MAX_CART_LINES })?;
                self.lines.push(LineItem::from_catalog(item));
                self.lines.len() - 1
            }
        };

        Ok(&self.lines[index])
    }

    /// Sets the quantity of a line.
    ///
    /// ## Behavior
    /// - Rounded to two fractional digits (2.567 → 2.57)
    /// - Zero or negative after rounding: the line is removed
    /// - Above `MAX_LINE_QUANTITY`: rejected, line unchanged
    pub fn update_quantity(&mut self, id: &str, quantity: Decimal) -> QuantityChange {
        let Some(index) = self.index_of(id) else {
            return QuantityChange::NotInCart;
        };
        self.apply_quantity(index, Quantity::new(quantity))
    }

    /// Sets the quantity of a line from raw UI text (see [`Quantity::parse`]).
    ///
    /// Text that is not a number counts as an invalid quantity and removes
    /// the line, same as zero.
    pub fn update_quantity_text(&mut self, id: &str, text: &str) -> QuantityChange {
        let Some(index) = self.index_of(id) else {
            return QuantityChange::NotInCart;
        };
        self.apply_quantity(index, Quantity::parse(text))
    }

    /// Removes a line. Returns whether a line was present.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.id != id);
        self.lines.len() != before
    }

    /// Empties the cart (after the order is placed).
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Lines in insertion order.
    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    /// Looks up a line by id.
    pub fn line(&self, id: &str) -> Option<&LineItem> {
        self.lines.iter().find(|l| l.id == id)
    }

    /// Lines with the VAT rate filled in, for order and fiscal snapshots.
    pub fn resolved_lines(&self) -> Vec<LineItem> {
        self.lines
            .iter()
            .map(|l| l.resolved(self.default_vat_rate))
            .collect()
    }

    /// Returns the number of distinct lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of all quantities.
    pub fn total_quantity(&self) -> Decimal {
        self.lines.iter().map(|l| l.quantity.value()).sum()
    }

    /// Rate applied to lines without an explicit rate.
    pub fn default_vat_rate(&self) -> VatRate {
        self.default_vat_rate
    }

    /// Σ unit price × quantity.
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(LineItem::net_total).sum()
    }

    /// Σ unit price × quantity × VAT rate, computed per line.
    pub fn tax(&self) -> Money {
        self.lines
            .iter()
            .map(|l| l.vat_amount(self.default_vat_rate))
            .sum()
    }

    /// Subtotal plus tax.
    pub fn grand_total(&self) -> Money {
        self.subtotal() + self.tax()
    }

    /// Snapshot of all derived totals.
    pub fn totals(&self) -> CartTotals {
        CartTotals::from(self)
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.lines.iter().position(|l| l.id == id)
    }

    fn apply_quantity(
        &mut self,
        index: usize,
        quantity: ValidationResult<Quantity>,
    ) -> QuantityChange {
        match quantity {
            Ok(qty) => {
                self.lines[index].quantity = qty;
                QuantityChange::Updated(qty)
            }
            Err(err @ ValidationError::OutOfRange { .. }) => QuantityChange::Rejected(err),
            Err(err) => {
                self.lines.remove(index);
                QuantityChange::Removed(err)
            }
        }
    }
}

/// Wire shape of a cart before its lines are checked against each other.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartRecord {
    lines: Vec<LineItem>,
    default_vat_rate: VatRate,
}

impl TryFrom<CartRecord> for Cart {
    type Error = CoreError;

    fn try_from(record: CartRecord) -> CoreResult<Self> {
        if record.lines.len() > MAX_CART_LINES {
            return Err(CoreError::CartTooLarge { max: MAX_CART_LINES });
        }

        let mut cart = Cart::with_default_vat_rate(record.default_vat_rate);
        for line in record.lines {
            validate_line_id(&line.id)?;
            validate_item_name(&line.name)?;
            if let Some(taken) = cart
                .lines
                .iter()
                .find(|l| l.id == line.id || l.name == line.name)
            {
                return Err(CoreError::LineConflict {
                    id: line.id,
                    name: taken.name.clone(),
                });
            }
            cart.lines.push(line);
        }

        Ok(cart)
    }
}

/// Cart totals summary for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub line_count: usize,
    pub total_quantity: Decimal,
    pub subtotal: Money,
    pub tax: Money,
    pub grand_total: Money,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        let subtotal = cart.subtotal();
        let tax = cart.tax();
        CartTotals {
            line_count: cart.len(),
            total_quantity: cart.total_quantity(),
            subtotal,
            tax,
            grand_total: subtotal + tax,
        }
    }
}
