//! # Checkout Error Types
//!
//! Error types for remote calls, configuration and the checkout flow.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Checkout Error Categories                          │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   Validation    │  │     Remote      │  │     Configuration       │ │
//! │  │  (never sent)   │  │  (one attempt)  │  │                         │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  EmptyCart      │  │  Network        │  │  InvalidConfig          │ │
//! │  │  bad phone      │  │  Unauthorized   │  │  InvalidUrl             │ │
//! │  │  bad quantity   │  │  Api {status}   │  │  LoadFailed / SaveFailed│ │
//! │  │                 │  │  Decode         │  │                         │ │
//! │  └────────┬────────┘  └────────┬────────┘  └─────────────────────────┘ │
//! │           └──────────┬─────────┘                                        │
//! │                      ▼                                                  │
//! │               CheckoutError ──► Notice { code, message } ──► UI toast   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;

use kasa_core::{CoreError, ValidationError};

// =============================================================================
// Remote Errors
// =============================================================================

/// Result type alias for remote collaborator calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// A failed call to a backend collaborator.
///
/// Each variant is surfaced once; nothing is retried.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// Could not reach the backend (DNS, connect, TLS, transport timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// The bearer token was missing, expired or rejected (401/403).
    #[error("Not authorized (HTTP {status})")]
    Unauthorized { status: u16 },

    /// Any other non-success status.
    #[error("Backend returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("Invalid response: {0}")]
    Decode(String),

    /// A URL could not be built from the configured base.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The request could not be built from local data.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl RemoteError {
    /// HTTP status, when the backend answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Unauthorized { status } | RemoteError::Api { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Returns true if the backend was never reached.
    pub fn is_network(&self) -> bool {
        matches!(self, RemoteError::Network(_))
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::Decode(err.to_string())
        } else if err.is_builder() {
            RemoteError::InvalidRequest(err.to_string())
        } else {
            RemoteError::Network(err.to_string())
        }
    }
}

impl From<url::ParseError> for RemoteError {
    fn from(err: url::ParseError) -> Self {
        RemoteError::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::Decode(err.to_string())
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration load/validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A setting has an unusable value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The API base URL is malformed.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    /// Failed to read or parse the config file.
    #[error("Failed to load config: {0}")]
    LoadFailed(String),

    /// Failed to write the config file.
    #[error("Failed to save config: {0}")]
    SaveFailed(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::SaveFailed(err.to_string())
    }
}

impl From<url::ParseError> for ConfigError {
    fn from(err: url::ParseError) -> Self {
        ConfigError::InvalidUrl(err.to_string())
    }
}

// =============================================================================
// Checkout Errors
// =============================================================================

/// Result type alias for the checkout flow.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

/// Why a checkout ended in `Failed`.
///
/// Fiscal failures are not here: they end the sale with a warning instead.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Local validation failed; no remote call was made.
    #[error("{0}")]
    Validation(#[from] CoreError),

    /// The order service did not create the order. Nothing to undo.
    #[error("Could not create order: {0}")]
    OrderCreationFailed(#[source] RemoteError),

    /// The gateway order could not be opened; the created order was deleted.
    #[error("Could not start payment for order {order_id}: {source}")]
    PaymentSetupFailed {
        order_id: String,
        #[source]
        source: RemoteError,
    },

    /// The customer closed the payment window; the created order was deleted.
    #[error("Payment for order {order_id} was cancelled")]
    PaymentCancelled { order_id: String },

    /// The gateway reported a failure or the payment was not confirmed.
    #[error("Payment for order {order_id} failed: {reason}")]
    PaymentFailed { order_id: String, reason: String },

    /// The verification call itself failed; the created order was deleted.
    #[error("Could not verify payment for order {order_id}: {source}")]
    PaymentVerificationFailed {
        order_id: String,
        #[source]
        source: RemoteError,
    },
}

impl From<ValidationError> for CheckoutError {
    fn from(err: ValidationError) -> Self {
        CheckoutError::Validation(CoreError::Validation(err))
    }
}

impl CheckoutError {
    /// The order that was created (and compensated) before the failure.
    pub fn order_id(&self) -> Option<&str> {
        match self {
            CheckoutError::Validation(_) | CheckoutError::OrderCreationFailed(_) => None,
            CheckoutError::PaymentSetupFailed { order_id, .. }
            | CheckoutError::PaymentCancelled { order_id }
            | CheckoutError::PaymentFailed { order_id, .. }
            | CheckoutError::PaymentVerificationFailed { order_id, .. } => Some(order_id),
        }
    }

    /// Returns true if the error happened before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(self, CheckoutError::Validation(_))
    }
}

// =============================================================================
// User-Facing Notice
// =============================================================================

/// Error codes for the transient notification shown by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (never reached the backend)
    ValidationError,
    /// Cart limits exceeded
    CartError,
    /// Backend unreachable
    NetworkError,
    /// Session token rejected
    Unauthorized,
    /// Order could not be created
    OrderError,
    /// Customer cancelled the payment
    PaymentCancelled,
    /// Payment failed or was not confirmed
    PaymentError,
}

/// What the UI shows when a checkout fails.
///
/// ## Serialization
/// ```json
/// { "code": "PAYMENT_CANCELLED", "message": "Payment was cancelled" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable message for display
    pub message: String,
}

impl Notice {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Notice {
            code,
            message: message.into(),
        }
    }
}

fn remote_notice(err: &RemoteError, fallback: ErrorCode, what: &str) -> Notice {
    match err {
        RemoteError::Network(_) => Notice::new(
            ErrorCode::NetworkError,
            format!("{}: the server could not be reached", what),
        ),
        RemoteError::Unauthorized { .. } => Notice::new(
            ErrorCode::Unauthorized,
            "Your session has expired, please sign in again",
        ),
        RemoteError::Api { message, .. } if !message.is_empty() => {
            Notice::new(fallback, format!("{}: {}", what, message))
        }
        other => {
            tracing::error!(error = %other, "Remote call failed");
            Notice::new(fallback, what.to_string())
        }
    }
}

/// Cart edits (`Cart::add`) report `CoreError` straight to the shell.
impl From<&CoreError> for Notice {
    fn from(err: &CoreError) -> Self {
        match err {
            CoreError::Validation(e) => Notice::new(ErrorCode::ValidationError, e.to_string()),
            CoreError::EmptyCart => {
                Notice::new(ErrorCode::ValidationError, "Add at least one item to the cart")
            }
            CoreError::CartTooLarge { .. }
            | CoreError::QuantityTooLarge { .. }
            | CoreError::LineConflict { .. } => Notice::new(ErrorCode::CartError, err.to_string()),
        }
    }
}

impl From<&CheckoutError> for Notice {
    fn from(err: &CheckoutError) -> Self {
        match err {
            CheckoutError::Validation(e) => Notice::from(e),
            CheckoutError::OrderCreationFailed(e) => {
                remote_notice(e, ErrorCode::OrderError, "Order could not be created")
            }
            CheckoutError::PaymentSetupFailed { source, .. } => {
                remote_notice(source, ErrorCode::PaymentError, "Payment could not be started")
            }
            CheckoutError::PaymentCancelled { .. } => {
                Notice::new(ErrorCode::PaymentCancelled, "Payment was cancelled")
            }
            CheckoutError::PaymentFailed { reason, .. } => {
                Notice::new(ErrorCode::PaymentError, format!("Payment failed: {}", reason))
            }
            CheckoutError::PaymentVerificationFailed { source, .. } => {
                remote_notice(source, ErrorCode::PaymentError, "Payment could not be verified")
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use kasa_core::{Cart, CatalogItem, Money};
    use rust_decimal::Decimal;

    #[test]
    fn test_remote_error_status() {
        assert_eq!(RemoteError::Unauthorized { status: 401 }.status(), Some(401));
        assert_eq!(
            RemoteError::Api {
                status: 500,
                message: "boom".into()
            }
            .status(),
            Some(500)
        );
        assert_eq!(RemoteError::Network("refused".into()).status(), None);
        assert!(RemoteError::Network("refused".into()).is_network());
    }

    #[test]
    fn test_checkout_error_order_id() {
        let err = CheckoutError::PaymentCancelled {
            order_id: "ord-7".into(),
        };
        assert_eq!(err.order_id(), Some("ord-7"));
        assert_eq!(err.to_string(), "Payment for order ord-7 was cancelled");

        let err = CheckoutError::Validation(CoreError::EmptyCart);
        assert_eq!(err.order_id(), None);
        assert!(err.is_validation());
    }

    #[test]
    fn test_validation_error_converts() {
        let err: CheckoutError = ValidationError::Required {
            field: "phone".into(),
        }
        .into();
        assert!(err.is_validation());
    }

    #[test]
    fn test_notice_codes() {
        let notice = Notice::from(&CheckoutError::Validation(CoreError::EmptyCart));
        assert_eq!(notice.code, ErrorCode::ValidationError);

        let notice = Notice::from(&CheckoutError::OrderCreationFailed(RemoteError::Network(
            "connection refused".into(),
        )));
        assert_eq!(notice.code, ErrorCode::NetworkError);

        let notice = Notice::from(&CheckoutError::OrderCreationFailed(
            RemoteError::Unauthorized { status: 401 },
        ));
        assert_eq!(notice.code, ErrorCode::Unauthorized);

        let notice = Notice::from(&CheckoutError::OrderCreationFailed(RemoteError::Api {
            status: 422,
            message: "phone already used".into(),
        }));
        assert_eq!(notice.code, ErrorCode::OrderError);
        assert_eq!(notice.message, "Order could not be created: phone already used");
    }

    #[test]
    fn test_cart_errors_map_to_cart_notice() {
        let mut cart = Cart::new();
        cart.add(&CatalogItem::new("7", "Milk", Money::from_cents(150))).unwrap();
        cart.update_quantity("7", Decimal::from(kasa_core::MAX_LINE_QUANTITY));

        let full = cart
            .add(&CatalogItem::new("7", "Milk", Money::from_cents(150)))
            .unwrap_err();
        let notice = Notice::from(&full);
        assert_eq!(notice.code, ErrorCode::CartError);
        assert_eq!(notice.message, "Milk is already at the maximum quantity of 999");

        let conflict = cart
            .add(&CatalogItem::new("7", "Butter", Money::from_cents(420)))
            .unwrap_err();
        let notice = Notice::from(&CheckoutError::from(conflict));
        assert_eq!(notice.code, ErrorCode::CartError);

        let bad_price = cart
            .add(&CatalogItem::new("8", "Tea", Money::from_cents(-1)))
            .unwrap_err();
        assert_eq!(Notice::from(&bad_price).code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_notice_serialization() {
        let notice = Notice::new(ErrorCode::PaymentCancelled, "Payment was cancelled");
        let json = serde_json::to_string(&notice).unwrap();
        assert_eq!(
            json,
            r#"{"code":"PAYMENT_CANCELLED","message":"Payment was cancelled"}"#
        );
    }
}
