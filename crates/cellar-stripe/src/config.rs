//! # Stripe Configuration
//!
//! Keys and endpoint settings for the Stripe gateway.
//! All secrets are loaded from environment variables.

use cellar_core::{ShopError, ShopResult};

const DEFAULT_API_BASE: &str = "https://api.stripe.com";

// SKU and Source endpoints are gone from versions after 2020-08-27
const DEFAULT_API_VERSION: &str = "2020-03-02";

/// Stripe API configuration
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_test_... or sk_live_...)
    pub secret_key: String,

    /// Publishable key handed to the storefront (pk_test_... or pk_live_...)
    pub publishable_key: Option<String>,

    /// Webhook signing secret (whsec_...)
    pub webhook_secret: Option<String>,

    /// Accept unsigned webhooks when no signing secret is set
    pub allow_unsigned_webhooks: bool,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,

    /// API version
    pub api_version: String,
}

impl StripeConfig {
    /// Load configuration from environment variables.
    ///
    /// Required: `STRIPE_SECRET_KEY`.
    /// Optional: `STRIPE_PUBLISHABLE_KEY`, `STRIPE_SHOPPING_CART_WEBHOOK_SECRET`,
    /// `WEBHOOK_ALLOW_UNSIGNED`, `STRIPE_API_BASE`, `STRIPE_API_VERSION`.
    pub fn from_env() -> ShopResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> ShopResult<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let secret_key = var("STRIPE_SECRET_KEY").ok_or_else(|| {
            ShopError::Configuration("STRIPE_SECRET_KEY not set".to_string())
        })?;

        if !secret_key.starts_with("sk_test_") && !secret_key.starts_with("sk_live_") {
            return Err(ShopError::Configuration(
                "STRIPE_SECRET_KEY must start with sk_test_ or sk_live_".to_string(),
            ));
        }

        let publishable_key = var("STRIPE_PUBLISHABLE_KEY");
        if let Some(key) = &publishable_key {
            if !key.starts_with("pk_test_") && !key.starts_with("pk_live_") {
                return Err(ShopError::Configuration(
                    "STRIPE_PUBLISHABLE_KEY must start with pk_test_ or pk_live_".to_string(),
                ));
            }
        }

        let webhook_secret = var("STRIPE_SHOPPING_CART_WEBHOOK_SECRET");
        if let Some(secret) = &webhook_secret {
            if !secret.starts_with("whsec_") {
                return Err(ShopError::Configuration(
                    "STRIPE_SHOPPING_CART_WEBHOOK_SECRET must start with whsec_".to_string(),
                ));
            }
        }

        let allow_unsigned_webhooks = match var("WEBHOOK_ALLOW_UNSIGNED") {
            None => false,
            Some(v) => v.trim().parse::<bool>().map_err(|_| {
                ShopError::Configuration(format!(
                    "WEBHOOK_ALLOW_UNSIGNED must be true or false, got {:?}",
                    v
                ))
            })?,
        };

        Ok(Self {
            secret_key,
            publishable_key,
            webhook_secret,
            allow_unsigned_webhooks,
            api_base_url: var("STRIPE_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            api_version: var("STRIPE_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
        })
    }

    /// Create config with explicit values (for testing)
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            publishable_key: None,
            webhook_secret: None,
            allow_unsigned_webhooks: false,
            api_base_url: DEFAULT_API_BASE.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    /// Check if using test keys
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.starts_with("sk_test_")
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.secret_key)
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_publishable_key(mut self, key: impl Into<String>) -> Self {
        self.publishable_key = Some(key.into());
        self
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    pub fn allow_unsigned_webhooks(mut self) -> Self {
        self.allow_unsigned_webhooks = true;
        self
    }
}
