//! # Money Module
//!
//! Provides the `Money`, `VatRate` and `Quantity` value types.
//!
//! ## Why Exact Decimals?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In binary floating point (f64):                                        │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Mixed VAT carts need sub-cent precision:                               │
//! │    1.20 × 0.09 = 0.108   (rounding per line would drift the total)     │
//! │                                                                         │
//! │  OUR SOLUTION: base-10 Decimal                                          │
//! │    Every line is computed exactly, grand = subtotal + tax holds         │
//! │    exactly, and rounding to cents happens ONCE at the payment edge.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kasa_core::money::{Money, Quantity, VatRate};
//! use rust_decimal::Decimal;
//!
//! let price = Money::from_cents(250); // 2.50
//! let qty = Quantity::new(Decimal::from(2)).unwrap();
//!
//! let net = price.multiply_quantity(qty);          // 5.00
//! let vat = net.calculate_vat(VatRate::from_bps(2000)); // 1.00
//! assert_eq!(net + vat, Money::from_cents(600));
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::error::ValidationError;
use crate::validation::ValidationResult;
use crate::{MAX_LINE_QUANTITY, QUANTITY_SCALE};

/// Number of fractional digits in the minor currency unit.
pub const MINOR_UNIT_SCALE: u32 = 2;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in the store currency.
///
/// ## Design Decisions
/// - **Decimal (signed)**: exact base-10 arithmetic, negative for refunds
/// - **Unrounded**: VAT on a line keeps its sub-cent digits until the total
///   is handed to the payment gateway
/// - **String on the wire**: serialized as `"7.308"`, never a JSON float
///
/// ## Where Money is Used
/// ```text
/// CatalogItem.unit_price ──► LineItem.unit_price ──► LineItem.net_total
///                                                          │
///   Cart.subtotal ◄────────────────────────────────────────┘
///        │
///        ├──► Cart.tax ──► Cart.grand_total ──► gateway amount (minor units)
///        │
///        └──► Displayed as "6.20" on the receipt
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    /// Wraps an exact decimal amount.
    #[inline]
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use kasa_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // 10.99
    /// assert_eq!(price.to_string(), "10.99");
    /// ```
    #[inline]
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, MINOR_UNIT_SCALE))
    }

    /// Returns the exact amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns the absolute value.
    #[inline]
    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies a unit price by a (possibly fractional) quantity.
    ///
    /// ## Example
    /// ```rust
    /// use kasa_core::money::{Money, Quantity};
    /// use rust_decimal::Decimal;
    ///
    /// let per_kg = Money::from_cents(400);
    /// let weight = Quantity::new(Decimal::new(125, 2)).unwrap(); // 1.25 kg
    /// assert_eq!(per_kg.multiply_quantity(weight), Money::from_cents(500));
    /// ```
    #[inline]
    pub fn multiply_quantity(&self, qty: Quantity) -> Self {
        Money(self.0 * qty.value())
    }

    /// Calculates VAT on this amount, exactly.
    ///
    /// No rounding is applied: `1.20 × 0.09` is `0.108`. Totals are summed
    /// from these exact values so `grand = subtotal + tax` holds to the digit.
    pub fn calculate_vat(&self, rate: VatRate) -> Money {
        Money(self.0 * rate.fraction())
    }

    /// Rounds to whole cents using Bankers Rounding (round half to even).
    ///
    /// ```text
    /// 7.305 → 7.30   (half, 0 is even)
    /// 7.315 → 7.32   (half, 2 is even)
    /// 7.308 → 7.31
    /// ```
    pub fn round_to_cents(&self) -> Money {
        let mut rounded = self
            .0
            .round_dp_with_strategy(MINOR_UNIT_SCALE, RoundingStrategy::MidpointNearestEven);
        rounded.rescale(MINOR_UNIT_SCALE);
        Money(rounded)
    }

    /// Returns the amount in minor units (cents), rounded half to even.
    ///
    /// Payment gateways take integer minor units. Returns `None` when the
    /// amount does not fit in an `i64`.
    pub fn to_minor_units(&self) -> Option<i64> {
        self.round_to_cents()
            .0
            .checked_mul(Decimal::ONE_HUNDRED)?
            .to_i64()
    }
}

/// Display shows the amount rounded to cents, without a currency symbol.
///
/// ## Note
/// Symbols and locale belong to the store configuration, see
/// `kasa_checkout::config::StoreSettings::format_money`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.round_to_cents().0)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// VAT Rate
// =============================================================================

/// VAT rate as a fraction of the net amount (`0.20` = 20%).
///
/// ## Why a Fraction?
/// The backend and fiscal devices exchange rates as fractions. Basis points
/// are still accepted at construction for configuration convenience:
/// 2000 bps = 0.20.
///
/// Deserialization goes through [`VatRate::new`], so a rate read from a
/// config file or the backend is range-checked like any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal")]
pub struct VatRate(Decimal);

impl VatRate {
    /// Creates a rate from a fraction, rejecting anything outside `0..=1`.
    pub fn new(fraction: Decimal) -> ValidationResult<Self> {
        if fraction < Decimal::ZERO || fraction > Decimal::ONE {
            return Err(ValidationError::OutOfRange {
                field: "vat_rate".to_string(),
                min: "0".to_string(),
                max: "1".to_string(),
            });
        }
        Ok(VatRate(fraction))
    }

    /// Creates a rate from basis points (1 bps = 0.01%).
    #[inline]
    pub fn from_bps(bps: u32) -> Self {
        VatRate(Decimal::new(i64::from(bps), 4).normalize())
    }

    /// Returns the rate as a fraction.
    #[inline]
    pub const fn fraction(&self) -> Decimal {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> Decimal {
        (self.0 * Decimal::ONE_HUNDRED).normalize()
    }

    /// Zero rate.
    #[inline]
    pub const fn zero() -> Self {
        VatRate(Decimal::ZERO)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Default for VatRate {
    /// The standard rate applied to lines with no explicit rate.
    fn default() -> Self {
        VatRate::from_bps(crate::DEFAULT_VAT_RATE_BPS)
    }
}

impl TryFrom<Decimal> for VatRate {
    type Error = ValidationError;

    fn try_from(fraction: Decimal) -> Result<Self, Self::Error> {
        VatRate::new(fraction)
    }
}

impl FromStr for VatRate {
    type Err = ValidationError;

    /// Parses `"0.20"` or `"20%"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ValidationError::InvalidFormat {
            field: "vat_rate".to_string(),
            reason: format!("'{}' is not a rate", s),
        };

        match s.strip_suffix('%') {
            Some(pct) => {
                let pct = Decimal::from_str(pct.trim()).map_err(|_| invalid())?;
                VatRate::new(pct / Decimal::ONE_HUNDRED)
            }
            None => VatRate::new(Decimal::from_str(s).map_err(|_| invalid())?),
        }
    }
}

// =============================================================================
// Quantity
// =============================================================================

/// A line quantity: strictly positive, at most two fractional digits.
///
/// Fractional quantities cover goods sold by weight or length. Anything with
/// more precision is rounded (half away from zero) to two places on the way
/// in, so `2.567` becomes `2.57`. The same applies on deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal")]
pub struct Quantity(Decimal);

impl Quantity {
    /// Normalizes and validates a quantity.
    ///
    /// ## Errors
    /// - `MustBePositive` if the rounded value is zero or negative
    /// - `OutOfRange` if it exceeds `MAX_LINE_QUANTITY`
    pub fn new(value: Decimal) -> ValidationResult<Self> {
        let normalized = Self::normalize(value);

        if normalized <= Decimal::ZERO {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            });
        }

        if normalized > Decimal::from(MAX_LINE_QUANTITY) {
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: "0.01".to_string(),
                max: MAX_LINE_QUANTITY.to_string(),
            });
        }

        Ok(Quantity(normalized))
    }

    /// Parses quantity text typed into the cart.
    ///
    /// A decimal comma is accepted (`"1,5"`), as scales and keypads emit it.
    pub fn parse(text: &str) -> ValidationResult<Self> {
        let cleaned = text.trim().replace(',', ".");
        let value = Decimal::from_str(&cleaned).map_err(|_| ValidationError::InvalidFormat {
            field: "quantity".to_string(),
            reason: format!("'{}' is not a number", text.trim()),
        })?;
        Self::new(value)
    }

    /// Rounds to `QUANTITY_SCALE` places, half away from zero.
    pub fn normalize(value: Decimal) -> Decimal {
        value
            .round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::MidpointAwayFromZero)
            .normalize()
    }

    /// A single unit.
    #[inline]
    pub const fn one() -> Self {
        Quantity(Decimal::ONE)
    }

    /// Returns the quantity value.
    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Returns this quantity plus one unit, if still within limits.
    pub fn incremented(&self) -> ValidationResult<Self> {
        Self::new(self.0 + Decimal::ONE)
    }
}

impl TryFrom<Decimal> for Quantity {
    type Error = ValidationError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Quantity::new(value)
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Quantity::one()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.amount(), dec!(10.99));
        assert_eq!(money.to_minor_units(), Some(1099));
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::new(dec!(7.308)).to_string(), "7.31");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).amount(), dec!(15.00));
        assert_eq!((a - b).amount(), dec!(5.00));
        assert_eq!(-b, Money::from_cents(-500));

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total, Money::from_cents(2000));
    }

    #[test]
    fn test_vat_is_exact() {
        let net = Money::from_cents(120);
        let vat = net.calculate_vat(VatRate::new(dec!(0.09)).unwrap());
        assert_eq!(vat.amount(), dec!(0.108));
    }

    #[test]
    fn test_bankers_rounding_to_cents() {
        assert_eq!(Money::new(dec!(7.305)).round_to_cents().amount(), dec!(7.30));
        assert_eq!(Money::new(dec!(7.315)).round_to_cents().amount(), dec!(7.32));
        assert_eq!(Money::new(dec!(7.308)).to_minor_units(), Some(731));
    }

    #[test]
    fn test_minor_units_overflow_is_none() {
        assert_eq!(Money::new(Decimal::MAX).to_minor_units(), None);
        assert_eq!(Money::new(Decimal::MIN).to_minor_units(), None);
        // Fits in Decimal, not in i64 cents
        assert_eq!(Money::new(Decimal::from(i64::MAX)).to_minor_units(), None);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let negative = Money::from_cents(-100);
        assert!(negative.is_negative());
        assert_eq!(negative.abs(), Money::from_cents(100));
    }

    #[test]
    fn test_vat_rate_construction() {
        assert_eq!(VatRate::from_bps(2000).fraction(), dec!(0.20));
        assert_eq!(VatRate::default().fraction(), dec!(0.2));
        assert_eq!(VatRate::from_bps(900).percentage(), dec!(9));
        assert!(VatRate::new(dec!(1.5)).is_err());
        assert!(VatRate::new(dec!(-0.01)).is_err());
    }

    #[test]
    fn test_vat_rate_parsing() {
        assert_eq!("0.09".parse::<VatRate>().unwrap().fraction(), dec!(0.09));
        assert_eq!("20%".parse::<VatRate>().unwrap().fraction(), dec!(0.20));
        assert!("twenty".parse::<VatRate>().is_err());
    }

    #[test]
    fn test_quantity_rounds_to_two_places() {
        assert_eq!(Quantity::new(dec!(2.567)).unwrap().value(), dec!(2.57));
        assert_eq!(Quantity::new(dec!(2.565)).unwrap().value(), dec!(2.57));
        assert_eq!(Quantity::new(dec!(3)).unwrap().value(), dec!(3));
    }

    #[test]
    fn test_quantity_rejects_non_positive() {
        assert!(matches!(
            Quantity::new(dec!(0)),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(matches!(
            Quantity::new(dec!(-1)),
            Err(ValidationError::MustBePositive { .. })
        ));
        // Rounds to 0.00
        assert!(Quantity::new(dec!(0.004)).is_err());
    }

    #[test]
    fn test_quantity_upper_bound() {
        assert!(Quantity::new(dec!(999)).is_ok());
        assert!(matches!(
            Quantity::new(dec!(999.01)),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_vat_rate_deserialization_is_checked() {
        let rate: VatRate = serde_json::from_str("\"0.09\"").unwrap();
        assert_eq!(rate.fraction(), dec!(0.09));

        assert!(serde_json::from_str::<VatRate>("\"1.5\"").is_err());
        assert!(serde_json::from_str::<VatRate>("\"-0.2\"").is_err());
    }

    #[test]
    fn test_quantity_deserialization_is_checked() {
        let qty: Quantity = serde_json::from_str("\"2.567\"").unwrap();
        assert_eq!(qty.value(), dec!(2.57));

        for bad in ["\"-2.567\"", "\"0\"", "\"0.001\"", "\"1000\""] {
            assert!(serde_json::from_str::<Quantity>(bad).is_err(), "{} accepted", bad);
        }
    }

    #[test]
    fn test_quantity_parse() {
        assert_eq!(Quantity::parse(" 1,5 ").unwrap().value(), dec!(1.5));
        assert!(matches!(
            Quantity::parse("abc"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }
}
