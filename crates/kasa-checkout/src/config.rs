//! # Checkout Configuration
//!
//! Configuration for the backend connection, the store and the checkout flow.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     KASA_API_URL=https://pos.example.com/api/                          │
//! │     KASA_API_TOKEN=eyJhbGciOi...                                       │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/kasa-pos/checkout.toml (Linux)                           │
//! │     ~/Library/Application Support/com.kasa.pos/checkout.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     localhost backend, EUR, 20% VAT                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # checkout.toml
//! [api]
//! base_url = "https://pos.example.com/api/"
//! token = "eyJhbGciOi..."
//!
//! [store]
//! name = "Corner Shop"
//! currency = "EUR"
//! currency_symbol = "€"
//!
//! [checkout]
//! cashier = "Front Desk"
//! default_vat_rate = "0.20"
//! fiscal_device = "FP-01"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use kasa_core::{Money, VatRate};

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// API Settings
// =============================================================================

/// Connection to the POS backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL every endpoint is joined onto (http or https).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token sent in the `Authorization` header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:8000/api/".to_string()
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            token: None,
        }
    }
}

// =============================================================================
// Store Settings
// =============================================================================

/// The store printed on receipts and the currency it sells in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Store name shown on receipts.
    #[serde(default = "default_store_name")]
    pub name: String,

    /// ISO 4217 code sent to the payment gateway.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Symbol used when formatting amounts for display.
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_store_name() -> String {
    "Kasa Store".to_string()
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_currency_symbol() -> String {
    "€".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            name: default_store_name(),
            currency: default_currency(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

impl StoreSettings {
    /// Formats an amount for display, rounded to cents.
    ///
    /// ```rust
    /// use kasa_checkout::config::StoreSettings;
    /// use kasa_core::Money;
    ///
    /// let store = StoreSettings::default();
    /// assert_eq!(store.format_money(Money::from_cents(731)), "€7.31");
    /// assert_eq!(store.format_money(Money::from_cents(-50)), "-€0.50");
    /// ```
    pub fn format_money(&self, amount: Money) -> String {
        if amount.round_to_cents().is_negative() {
            format!("-{}{}", self.currency_symbol, amount.abs())
        } else {
            format!("{}{}", self.currency_symbol, amount)
        }
    }
}

// =============================================================================
// Checkout Settings
// =============================================================================

/// Defaults applied to every checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSettings {
    /// Cashier name sent with fiscal receipts.
    #[serde(default = "default_cashier")]
    pub cashier: String,

    /// VAT rate for lines with no explicit rate.
    #[serde(default)]
    pub default_vat_rate: VatRate,

    /// Fiscal device selected when a session starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiscal_device: Option<String>,
}

fn default_cashier() -> String {
    "Cashier".to_string()
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        CheckoutSettings {
            cashier: default_cashier(),
            default_vat_rate: VatRate::default(),
            fiscal_device: None,
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete checkout configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KasaConfig {
    /// Backend connection.
    #[serde(default)]
    pub api: ApiSettings,

    /// Store identity and currency.
    #[serde(default)]
    pub store: StoreSettings,

    /// Checkout defaults.
    #[serde(default)]
    pub checkout: CheckoutSettings,
}

impl KasaConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (checkout.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading checkout config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load checkout config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::SaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        info!(?path, "Checkout config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        let url = url::Url::parse(&self.api.base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "API URL must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.api.token.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ConfigError::InvalidConfig("api token must not be blank".into()));
        }

        let currency = &self.store.currency;
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ConfigError::InvalidConfig(format!(
                "currency must be a 3-letter ISO code, got: '{}'",
                currency
            )));
        }

        if self.checkout.cashier.trim().is_empty() {
            return Err(ConfigError::InvalidConfig("cashier must not be empty".into()));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("KASA_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Some(token) = lookup("KASA_API_TOKEN") {
            self.api.token = Some(token);
        }

        if let Some(name) = lookup("KASA_STORE_NAME") {
            self.store.name = name;
        }

        if let Some(currency) = lookup("KASA_CURRENCY") {
            self.store.currency = currency.to_uppercase();
        }

        if let Some(cashier) = lookup("KASA_CASHIER") {
            self.checkout.cashier = cashier;
        }

        if let Some(rate) = lookup("KASA_DEFAULT_VAT_RATE") {
            match rate.parse::<VatRate>() {
                Ok(parsed) => {
                    debug!(rate = %rate, "Overriding default VAT rate from environment");
                    self.checkout.default_vat_rate = parsed;
                }
                Err(e) => warn!(rate = %rate, error = %e, "Ignoring invalid VAT rate in environment"),
            }
        }

        if let Some(device) = lookup("KASA_FISCAL_DEVICE") {
            self.checkout.fiscal_device = Some(device).filter(|d| !d.trim().is_empty());
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "kasa", "pos")
            .map(|dirs| dirs.config_dir().join("checkout.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the API base URL.
    pub fn base_url(&self) -> &str {
        &self.api.base_url
    }

    /// Returns the currency code.
    pub fn currency(&self) -> &str {
        &self.store.currency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = KasaConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.currency(), "EUR");
        assert_eq!(config.checkout.default_vat_rate.fraction(), dec!(0.20));
        assert!(config.api.token.is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut config = KasaConfig::default();

        config.api.base_url = "ftp://files.example.com".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));

        config.api.base_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));

        config.api.base_url = "https://pos.example.com/api/".to_string();
        assert!(config.validate().is_ok());

        config.store.currency = "euro".to_string();
        assert!(config.validate().is_err());

        config.store.currency = "EUR".to_string();
        config.checkout.cashier = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_parsing() {
        let config: KasaConfig = toml::from_str(
            r#"
            [api]
            base_url = "https://pos.example.com/api/"
            token = "secret"

            [store]
            name = "Corner Shop"
            currency = "GBP"
            currency_symbol = "£"

            [checkout]
            default_vat_rate = "0.09"
            "#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.api.token.as_deref(), Some("secret"));
        assert_eq!(config.store.name, "Corner Shop");
        assert_eq!(config.checkout.default_vat_rate.fraction(), dec!(0.09));
        // Missing keys fall back to defaults
        assert_eq!(config.checkout.cashier, "Cashier");
        assert!(config.checkout.fiscal_device.is_none());
    }

    #[test]
    fn test_out_of_range_vat_rejected() {
        let err: ConfigError = toml::from_str::<KasaConfig>(
            r#"
            [checkout]
            default_vat_rate = "1.5"
            "#,
        )
        .unwrap_err()
        .into();
        assert!(matches!(
            err,
            ConfigError::LoadFailed(ref msg) if msg.contains("vat_rate must be between 0 and 1")
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("KASA_API_URL", "https://other.example.com/"),
            ("KASA_API_TOKEN", "tok"),
            ("KASA_CURRENCY", "usd"),
            ("KASA_DEFAULT_VAT_RATE", "9%"),
            ("KASA_FISCAL_DEVICE", "FP-02"),
        ]
        .into_iter()
        .collect();

        let mut config = KasaConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.base_url(), "https://other.example.com/");
        assert_eq!(config.api.token.as_deref(), Some("tok"));
        assert_eq!(config.currency(), "USD");
        assert_eq!(config.checkout.default_vat_rate.fraction(), dec!(0.09));
        assert_eq!(config.checkout.fiscal_device.as_deref(), Some("FP-02"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_env_vat_ignored() {
        let mut config = KasaConfig::default();
        config.apply_overrides(|key| (key == "KASA_DEFAULT_VAT_RATE").then(|| "lots".to_string()));
        assert_eq!(config.checkout.default_vat_rate, VatRate::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("kasa-config-{}", uuid::Uuid::new_v4()))
            .join("checkout.toml");

        let mut config = KasaConfig::default();
        config.store.name = "Harbour Kiosk".to_string();
        config.checkout.fiscal_device = Some("FP-01".to_string());
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[store]"));
        assert!(contents.contains("[checkout]"));

        let loaded: KasaConfig = toml::from_str(&contents).unwrap();
        assert_eq!(loaded.store.name, "Harbour Kiosk");
        assert_eq!(loaded.checkout.fiscal_device.as_deref(), Some("FP-01"));

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_format_money() {
        let store = StoreSettings::default();
        assert_eq!(store.format_money(Money::new(dec!(7.308))), "€7.31");
        assert_eq!(store.format_money(Money::zero()), "€0.00");
    }
}
