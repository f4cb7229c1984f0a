//! # Application State
//!
//! Shared state for the Axum application: configuration and the services
//! built on one payment gateway.

use cellar_core::{
    BoxedGateway, CustomerRegistrar, Environment, Inventory, PaymentOrchestrator, StoreConfig,
    WebhookDispatcher,
};
use cellar_stripe::{StripeConfig, StripeGateway, WebhookVerifier};
use std::net::SocketAddr;
use std::sync::Arc;

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Allow cross-origin requests from any origin
    pub cors_allow_any: bool,
}

impl AppConfig {
    /// Load from environment variables.
    ///
    /// `CORS_ALLOW_ANY` defaults to on outside production.
    pub fn from_env(environment: Environment) -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok(), environment)
    }

    pub fn from_vars(
        lookup: impl Fn(&str) -> Option<String>,
        environment: Environment,
    ) -> anyhow::Result<Self> {
        let port = match lookup("PORT") {
            Some(p) => p
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a port number, got {:?}", p))?,
            None => 4567,
        };

        let cors_allow_any = match lookup("CORS_ALLOW_ANY") {
            Some(v) => v
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("CORS_ALLOW_ANY must be true or false, got {:?}", v))?,
            None => !environment.is_production(),
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            cors_allow_any,
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e))
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<StoreConfig>,
    /// Publishable key handed to the storefront
    pub publishable_key: Option<String>,
    pub inventory: Inventory,
    pub payments: PaymentOrchestrator,
    pub customers: CustomerRegistrar,
    pub webhooks: WebhookDispatcher,
    pub verifier: WebhookVerifier,
    pub provider: &'static str,
}

impl AppState {
    /// Build everything from the environment with the Stripe gateway
    pub fn new() -> anyhow::Result<Self> {
        let store = StoreConfig::from_env()?;
        let stripe = StripeConfig::from_env()?;
        let verifier = WebhookVerifier::from_config(&stripe)?;
        let config = AppConfig::from_env(store.environment)?;
        let publishable_key = stripe.publishable_key.clone();

        let gateway = Arc::new(StripeGateway::new(stripe)?);

        Ok(Self::with_gateway(
            config,
            store,
            gateway,
            verifier,
            publishable_key,
        ))
    }

    /// Build with an arbitrary gateway
    pub fn with_gateway(
        config: AppConfig,
        store: StoreConfig,
        gateway: BoxedGateway,
        verifier: WebhookVerifier,
        publishable_key: Option<String>,
    ) -> Self {
        let store = Arc::new(store);
        let inventory = Inventory::new(gateway.clone(), store.clone());
        let payments = PaymentOrchestrator::new(gateway.clone(), inventory.clone(), store.clone());
        let webhooks = WebhookDispatcher::new(payments.clone(), inventory.clone());

        Self {
            config,
            store,
            publishable_key,
            inventory,
            payments,
            customers: CustomerRegistrar::new(gateway.clone()),
            webhooks,
            verifier,
            provider: gateway.provider_name(),
        }
    }
}
