//! # Payment Gateway Trait
//!
//! The seam between storefront logic and the remote payments/catalog
//! platform. Services only ever talk to a `PaymentGateway`; the Stripe
//! implementation lives in `cellar-stripe`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  PaymentGateway (trait)                     │
//! │  ├── catalog:   list/get products, prices, skus            │
//! │  ├── stock:     update_product_metadata()                   │
//! │  ├── intents:   create / retrieve / update / confirm / cancel│
//! │  └── customers: create_customer()                           │
//! └─────────────────────────────────────────────────────────────┘
//!                ▲                              ▲
//!        ┌───────┴───────┐              ┌───────┴───────┐
//!        │ StripeGateway │              │ MemoryGateway │
//!        │ (REST client) │              │  (test-util)  │
//!        └───────────────┘              └───────────────┘
//! ```

use crate::catalog::{ListQuery, Price, Product, Sku};
use crate::customer::{Customer, NewCustomer};
use crate::error::ShopResult;
use crate::intent::{IntentUpdate, NewIntent, PaymentIntent};
use async_trait::async_trait;
use std::sync::Arc;

/// Remote payments and catalog operations.
///
/// Every call is a single request/response against the provider; no
/// retries happen at this layer. Implementations report a missing remote
/// object as `ShopError::NotFound`.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// List one page of catalog products.
    async fn list_products(&self, query: &ListQuery) -> ShopResult<Vec<Product>>;

    /// Fetch a product by id.
    async fn get_product(&self, id: &str) -> ShopResult<Product>;

    /// Set a single metadata entry on a product and return the new record.
    async fn update_product_metadata(&self, id: &str, key: &str, value: &str)
        -> ShopResult<Product>;

    /// List one page of prices.
    async fn list_prices(&self, query: &ListQuery) -> ShopResult<Vec<Price>>;

    /// Fetch a price by id.
    async fn get_price(&self, id: &str) -> ShopResult<Price>;

    /// List one page of SKUs.
    async fn list_skus(&self, query: &ListQuery) -> ShopResult<Vec<Sku>>;

    /// Create a payment intent.
    async fn create_intent(&self, params: &NewIntent) -> ShopResult<PaymentIntent>;

    /// Fetch a payment intent by id.
    async fn retrieve_intent(&self, id: &str) -> ShopResult<PaymentIntent>;

    /// Overwrite fields on an existing intent.
    async fn update_intent(&self, id: &str, update: &IntentUpdate) -> ShopResult<PaymentIntent>;

    /// Confirm an intent with the given payment method (or source) id.
    async fn confirm_intent(&self, id: &str, payment_method: &str) -> ShopResult<PaymentIntent>;

    /// Cancel an intent.
    async fn cancel_intent(&self, id: &str) -> ShopResult<PaymentIntent>;

    /// Create a customer.
    async fn create_customer(&self, params: &NewCustomer) -> ShopResult<Customer>;

    /// Provider name (for logging).
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared gateway (dynamic dispatch)
pub type BoxedGateway = Arc<dyn PaymentGateway>;
