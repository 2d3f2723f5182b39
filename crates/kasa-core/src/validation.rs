//! # Validation Module
//!
//! Input validation for cart and checkout data.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: UI form                                                      │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (before any network call)                        │
//! │  ├── Customer name / phone                                             │
//! │  └── Line ids, prices, cart size                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Backend REST API                                             │
//! │  └── Authoritative business rules (stock, loyalty, fiscal law)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kasa_core::validation::{validate_customer_name, validate_phone};
//!
//! assert!(validate_customer_name("Ana Petrova").is_ok());
//! assert_eq!(validate_phone(" +359 88 123 4567 ").unwrap(), "+359881234567");
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_CART_LINES, MAX_UNIT_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of a customer name.
const MAX_CUSTOMER_NAME_LEN: usize = 100;

/// Maximum length of a line identifier.
const MAX_LINE_ID_LEN: usize = 64;

/// Digit bounds for a phone number (E.164 allows at most 15).
const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_DIGITS: usize = 15;

// =============================================================================
// String Validators
// =============================================================================

/// Validates the customer name captured at checkout.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 100 characters
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "customer_name".to_string(),
        });
    }

    if name.chars().count() > MAX_CUSTOMER_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "customer_name".to_string(),
            max: MAX_CUSTOMER_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates and normalizes a phone number.
///
/// ## Rules
/// - Must not be empty
/// - Optional leading `+`
/// - Spaces, hyphens, dots and parentheses are separators and are dropped
/// - 7 to 15 digits
///
/// ## Returns
/// The compact form, e.g. `"+359881234567"`.
pub fn validate_phone(phone: &str) -> ValidationResult<String> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    let (prefix, rest) = match phone.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", phone),
    };

    let mut digits = String::with_capacity(rest.len());
    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '.' | '(' | ')' => {}
            other => {
                return Err(ValidationError::InvalidFormat {
                    field: "phone".to_string(),
                    reason: format!("unexpected character '{}'", other),
                })
            }
        }
    }

    if digits.len() < MIN_PHONE_DIGITS || digits.len() > MAX_PHONE_DIGITS {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: format!(
                "must have {} to {} digits",
                MIN_PHONE_DIGITS, MAX_PHONE_DIGITS
            ),
        });
    }

    Ok(format!("{}{}", prefix, digits))
}

/// Validates a line identifier (the product id the UI hands us).
pub fn validate_line_id(id: &str) -> ValidationResult<()> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    if id.len() > MAX_LINE_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "id".to_string(),
            max: MAX_LINE_ID_LEN,
        });
    }

    Ok(())
}

/// Validates a display name for a line.
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a unit price.
///
/// ## Rules
/// - Must be non-negative
/// - Zero is allowed (free items, promotional gifts)
/// - At most `MAX_UNIT_PRICE_CENTS`
pub fn validate_unit_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustBePositive {
            field: "unit_price".to_string(),
        });
    }

    let max = Money::from_cents(MAX_UNIT_PRICE_CENTS);
    if price > max {
        return Err(ValidationError::OutOfRange {
            field: "unit_price".to_string(),
            min: "0".to_string(),
            max: max.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that one more distinct line fits in the cart.
pub fn validate_cart_size(current_lines: usize) -> ValidationResult<()> {
    if current_lines >= MAX_CART_LINES {
        return Err(ValidationError::OutOfRange {
            field: "cart lines".to_string(),
            min: "0".to_string(),
            max: MAX_CART_LINES.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
