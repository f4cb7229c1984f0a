//! # cellar-stripe
//!
//! Stripe implementation of the cellar-cart `PaymentGateway`.
//!
//! - **StripeGateway** - catalog, stock metadata, payment intents and
//!   customers over the Stripe REST API (form-encoded, pinned API version)
//! - **WebhookVerifier** - `Stripe-Signature` checking and event decoding
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cellar_stripe::{StripeConfig, StripeGateway, WebhookVerifier};
//!
//! let config = StripeConfig::from_env()?;
//! let verifier = WebhookVerifier::from_config(&config)?;
//! let gateway = Arc::new(StripeGateway::new(config)?);
//!
//! // In the webhook endpoint:
//! let event = verifier.verify(&body, signature_header)?;
//! dispatcher.handle(event).await?;
//! ```

pub mod client;
pub mod config;
pub mod gateway;
pub mod webhook;

// Re-exports
pub use config::StripeConfig;
pub use gateway::StripeGateway;
pub use webhook::{sign_payload, WebhookVerifier, REQUIRED_WEBHOOK_EVENTS};
