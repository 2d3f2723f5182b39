//! # Error Types
//!
//! Domain-specific error types for kasa-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kasa-core errors (this file)                                          │
//! │  ├── CoreError        - Cart and business rule violations              │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  kasa-checkout errors (separate crate)                                 │
//! │  ├── RemoteError      - REST collaborator failures                     │
//! │  └── CheckoutError    - What the sequencer reports                     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CheckoutError → Notice → UI       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (line id, limits)
//! 3. Errors are enum variants, never String
//! 4. Validation errors never reach the network

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Checkout was attempted with nothing in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cart has reached the maximum number of distinct lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// Adding one more unit would exceed the per-line maximum.
    ///
    /// ## User Workflow
    /// ```text
    /// Scan item (already 999 in cart)
    ///      │
    ///      ▼
    /// QuantityTooLarge { name: "Water 1L", max: 999 }
    ///      │
    ///      ▼
    /// UI shows: "Water 1L is already at the maximum of 999"
    /// ```
    #[error("{name} is already at the maximum quantity of {max}")]
    QuantityTooLarge { name: String, max: i64 },

    /// The line id is already taken by a line with another name.
    #[error("Line id {id} is already used by {name}")]
    LineConflict { id: String, name: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
    },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., non-numeric quantity, malformed phone).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
