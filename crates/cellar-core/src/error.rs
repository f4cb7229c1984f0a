//! # Shop Error Types
//!
//! Typed error handling for the cellar-cart storefront.
//! All catalog, payment and webhook operations return `Result<T, ShopError>`.

use thiserror::Error;

/// Core error type for all storefront operations
#[derive(Debug, Error)]
pub enum ShopError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed or incomplete request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A cart line asked for zero (or fewer) bottles
    #[error("Sorry, the wine {product_name} has no bottles selected to create a payment intent")]
    NoBottlesSelected {
        product_id: String,
        product_name: String,
    },

    /// A cart line asked for more bottles than the catalog has in stock
    #[error(
        "Sorry, the wine {product_name} does not have enough stock to create your payment order with {requested} bottles"
    )]
    InsufficientStock {
        product_id: String,
        product_name: String,
        requested: i64,
        available: i64,
    },

    /// The stock metadata on a product is missing or not an integer
    #[error("Product {product_id} has unreadable stock metadata: {value:?}")]
    InvalidStock {
        product_id: String,
        value: Option<String>,
    },

    /// Shipping option id not present in the shipping table
    #[error("No cost found for shipping option {id:?}")]
    UnknownShippingOption { id: String },

    /// Remote object does not exist
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    /// A catalog, price or intent lookup failed upstream
    #[error("{operation} failed: {message}")]
    RemoteLookup { operation: String, message: String },

    /// Payment provider API error
    #[error("Provider error: {message}")]
    Provider {
        message: String,
        code: Option<String>,
    },

    /// Network/HTTP error communicating with the provider
    #[error("Network error: {0}")]
    Network(String),

    /// Intent is not in the state the operation requires
    #[error("PaymentIntent {intent_id} already has a status of {status}")]
    StatusConflict { intent_id: String, status: String },

    /// Webhook signature verification failed
    #[error("Webhook verification failed: {0}")]
    WebhookVerification(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Some stock writes after a successful payment did not go through
    #[error("Stock update failed for products: {}", .failed.join(", "))]
    StockUpdate { failed: Vec<String> },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShopError {
    /// Wrap a failed upstream call, keeping `NotFound` intact so callers
    /// can still answer 404.
    pub fn remote(operation: impl Into<String>, source: ShopError) -> Self {
        match source {
            ShopError::NotFound { .. } => source,
            other => ShopError::RemoteLookup {
                operation: operation.into(),
                message: other.to_string(),
            },
        }
    }

    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ShopError::Network(_) | ShopError::Provider { .. } | ShopError::RemoteLookup { .. }
        )
    }

    /// Returns true for cart validation failures that name a product
    pub fn is_cart_rejection(&self) -> bool {
        matches!(
            self,
            ShopError::NoBottlesSelected { .. }
                | ShopError::InsufficientStock { .. }
                | ShopError::InvalidStock { .. }
        )
    }

    /// Product identity and recorded stock behind a cart rejection
    pub fn offending_product(&self) -> Option<(&str, Option<String>)> {
        match self {
            ShopError::NoBottlesSelected { product_id, .. } => Some((product_id.as_str(), None)),
            ShopError::InsufficientStock {
                product_id,
                available,
                ..
            } => Some((product_id.as_str(), Some(available.to_string()))),
            ShopError::InvalidStock { product_id, value } => Some((product_id.as_str(), value.clone())),
            _ => None,
        }
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ShopError::Configuration(_) => 500,
            ShopError::InvalidRequest(_) => 400,
            ShopError::NoBottlesSelected { .. } => 406,
            ShopError::InsufficientStock { .. } => 406,
            ShopError::InvalidStock { .. } => 406,
            ShopError::UnknownShippingOption { .. } => 400,
            ShopError::NotFound { .. } => 404,
            ShopError::RemoteLookup { .. } => 502,
            ShopError::Provider { .. } => 502,
            ShopError::Network(_) => 503,
            ShopError::StatusConflict { .. } => 409,
            ShopError::WebhookVerification(_) => 401,
            ShopError::WebhookParse(_) => 400,
            ShopError::StockUpdate { .. } => 500,
            ShopError::Serialization(_) => 500,
            ShopError::Internal(_) => 500,
        }
    }
}

impl From<serde_json::Error> for ShopError {
    fn from(err: serde_json::Error) -> Self {
        ShopError::Serialization(err.to_string())
    }
}

/// Result type alias for storefront operations
pub type ShopResult<T> = Result<T, ShopError>;
