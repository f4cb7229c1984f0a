//! # cellar-core
//!
//! Domain types and services for the cellar-cart wine storefront.
//!
//! This crate provides:
//! - `PaymentGateway` trait for the remote catalog and payments platform
//! - `Inventory` for catalog reads, cart totals and stock writes
//! - `PaymentOrchestrator` for the payment intent lifecycle
//! - `WebhookDispatcher` for idempotent handling of provider events
//! - `CustomerRegistrar` for checkout customer records
//! - `ShopError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use cellar_core::{CartItem, Inventory, IntentRequest, PaymentOrchestrator, StoreConfig};
//!
//! let config = Arc::new(StoreConfig::from_env()?);
//! let inventory = Inventory::new(gateway.clone(), config.clone());
//! let payments = PaymentOrchestrator::new(gateway, inventory, config);
//!
//! let intent = payments
//!     .create_intent(&IntentRequest {
//!         currency: "eur".into(),
//!         customer_id: None,
//!         items: vec![CartItem::new("prod_yenda", 2)],
//!     })
//!     .await?;
//!
//! // Hand intent.client_secret to the browser
//! ```

pub mod cart;
pub mod catalog;
pub mod config;
pub mod customer;
pub mod customers;
pub mod error;
pub mod event;
pub mod gateway;
pub mod intent;
pub mod inventory;
pub mod payments;
pub mod shipping;
pub mod webhooks;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Re-exports for convenience
pub use cart::CartItem;
pub use catalog::{Currency, ListQuery, Price, Product, Sku, Visibility, WineMetadata, STOCK_KEY};
pub use config::{Environment, PageSizes, StoreConfig};
pub use customer::{Customer, CustomerInput, NewCustomer};
pub use customers::CustomerRegistrar;
pub use error::{ShopError, ShopResult};
pub use event::{EventObject, Source, SourceStatus, WebhookEvent};
pub use gateway::{BoxedGateway, PaymentGateway};
pub use intent::{
    CurrencyChange, IntentRequest, IntentStatus, IntentStatusView, IntentUpdate, NewIntent,
    PaymentIntent, ShippingChange,
};
pub use inventory::Inventory;
pub use payments::PaymentOrchestrator;
pub use shipping::{ShippingOption, ShippingTable};
pub use webhooks::{Dispatch, EventLedger, WebhookDispatcher};
