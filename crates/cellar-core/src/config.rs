//! # Store Configuration
//!
//! Process-wide settings built once at startup and handed to every service.
//! Nothing below the HTTP layer reads the environment directly.

use crate::catalog::{Currency, Visibility};
use crate::error::{ShopError, ShopResult};
use crate::intent::CURRENCY_BOUND_METHOD;
use crate::shipping::ShippingTable;
use serde::Serialize;

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn parse(value: &str) -> ShopResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "prod" | "production" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => Err(ShopError::Configuration(format!(
                "unknown ENVIRONMENT {:?} (expected development, production or test)",
                other
            ))),
        }
    }

    /// Catalog records shown in this environment
    pub fn visibility(&self) -> Visibility {
        match self {
            Environment::Development => Visibility::TestOnly,
            Environment::Production => Visibility::LiveOnly,
            Environment::Test => Visibility::All,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        };
        f.write_str(name)
    }
}

/// Page sizes sent to the provider on listing calls.
///
/// Listings never follow pagination: the storefront shows at most one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageSizes {
    pub products: u8,
    pub prices: u8,
    pub skus: u8,
}

impl Default for PageSizes {
    fn default() -> Self {
        Self {
            products: 3,
            prices: 3,
            skus: 1,
        }
    }
}

/// Storefront settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub environment: Environment,
    /// Payment method types offered by the storefront
    pub payment_methods: Vec<String>,
    /// Country of the provider account
    pub stripe_country: String,
    /// Country the store ships from
    pub country: String,
    /// Default checkout currency
    pub currency: Currency,
    pub page_sizes: PageSizes,
    pub shipping: ShippingTable,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            payment_methods: vec!["card".to_string()],
            stripe_country: "US".to_string(),
            country: "SP".to_string(),
            currency: Currency::default(),
            page_sizes: PageSizes::default(),
            shipping: ShippingTable::default(),
        }
    }
}

impl StoreConfig {
    /// Load from process environment variables
    pub fn from_env() -> ShopResult<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup.
    ///
    /// Recognised keys: `ENVIRONMENT`, `PAYMENT_METHODS`,
    /// `STRIPE_ACCOUNT_COUNTRY`, `STORE_COUNTRY`, `STORE_CURRENCY`,
    /// `PRODUCT_PAGE_SIZE`, `PRICE_PAGE_SIZE`, `SKU_PAGE_SIZE`,
    /// `SHIPPING_OPTIONS_FILE`.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> ShopResult<Self> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = match var("ENVIRONMENT") {
            Some(v) => Environment::parse(&v)?,
            None => defaults.environment,
        };

        let payment_methods = var("PAYMENT_METHODS")
            .map(|v| parse_methods(&v))
            .unwrap_or(defaults.payment_methods);

        let currency = match var("STORE_CURRENCY") {
            Some(v) => Currency::parse(&v)
                .map_err(|e| ShopError::Configuration(format!("STORE_CURRENCY: {}", e)))?,
            None => defaults.currency,
        };

        let page_sizes = PageSizes {
            products: page_size(var("PRODUCT_PAGE_SIZE"), "PRODUCT_PAGE_SIZE", defaults.page_sizes.products)?,
            prices: page_size(var("PRICE_PAGE_SIZE"), "PRICE_PAGE_SIZE", defaults.page_sizes.prices)?,
            skus: page_size(var("SKU_PAGE_SIZE"), "SKU_PAGE_SIZE", defaults.page_sizes.skus)?,
        };

        let shipping = match var("SHIPPING_OPTIONS_FILE") {
            Some(path) => {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    ShopError::Configuration(format!("cannot read {}: {}", path, e))
                })?;
                ShippingTable::from_toml(&content).map_err(|e| {
                    ShopError::Configuration(format!("failed to parse {}: {}", path, e))
                })?
            }
            None => defaults.shipping,
        };

        Ok(Self {
            environment,
            payment_methods,
            stripe_country: var("STRIPE_ACCOUNT_COUNTRY").unwrap_or(defaults.stripe_country),
            country: var("STORE_COUNTRY").unwrap_or(defaults.country),
            currency,
            page_sizes,
            shipping,
        })
    }

    /// Payment methods offered when an intent is first created.
    ///
    /// The currency of a new intent is not settled yet, so methods bound to
    /// a single currency are left out.
    pub fn creation_payment_methods(&self) -> Vec<String> {
        self.payment_methods
            .iter()
            .filter(|m| m.as_str() != CURRENCY_BOUND_METHOD)
            .cloned()
            .collect()
    }
}

fn parse_methods(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect()
}

fn page_size(raw: Option<String>, key: &str, default: u8) -> ShopResult<u8> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    // provider caps list pages at 100
    match raw.trim().parse::<u8>() {
        Ok(n) if (1..=100).contains(&n) => Ok(n),
        _ => Err(ShopError::Configuration(format!(
            "{} must be between 1 and 100, got {:?}",
            key, raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StoreConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.payment_methods, vec!["card"]);
        assert_eq!(config.stripe_country, "US");
        assert_eq!(config.currency.as_str(), "eur");
        assert_eq!(config.page_sizes, PageSizes { products: 3, prices: 3, skus: 1 });
        assert_eq!(config.shipping.cost("express"), Some(500));
    }

    #[test]
    fn test_overrides() {
        let config = StoreConfig::from_vars(vars(&[
            ("ENVIRONMENT", "prod"),
            ("PAYMENT_METHODS", "card, sepa_debit,au_becs_debit, "),
            ("STRIPE_ACCOUNT_COUNTRY", "ES"),
            ("STORE_CURRENCY", "USD"),
            ("SKU_PAGE_SIZE", "10"),
        ]))
        .unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.payment_methods, vec!["card", "sepa_debit", "au_becs_debit"]);
        assert_eq!(config.creation_payment_methods(), vec!["card", "sepa_debit"]);
        assert_eq!(config.stripe_country, "ES");
        assert_eq!(config.currency.as_str(), "usd");
        assert_eq!(config.page_sizes.skus, 10);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(StoreConfig::from_vars(vars(&[("ENVIRONMENT", "staging")])).is_err());
        assert!(StoreConfig::from_vars(vars(&[("PRICE_PAGE_SIZE", "0")])).is_err());
        assert!(StoreConfig::from_vars(vars(&[("PRICE_PAGE_SIZE", "500")])).is_err());
        assert!(StoreConfig::from_vars(vars(&[("STORE_CURRENCY", "euro")])).is_err());
        assert!(StoreConfig::from_vars(vars(&[("SHIPPING_OPTIONS_FILE", "/nonexistent/shipping.toml")])).is_err());
    }

    #[test]
    fn test_environment_visibility() {
        assert_eq!(Environment::Development.visibility(), Visibility::TestOnly);
        assert_eq!(Environment::Production.visibility(), Visibility::LiveOnly);
        assert_eq!(Environment::Test.visibility(), Visibility::All);
        assert_eq!(Environment::parse("Development").unwrap().to_string(), "development");
    }
}
