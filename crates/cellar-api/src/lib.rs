//! # cellar-api
//!
//! HTTP API for the cellar-cart wine storefront.
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/config` | Storefront bootstrap settings |
//! | GET | `/wines` | List wines |
//! | GET | `/wines/{id}` | Get wine |
//! | GET | `/wines/{id}/skus` | SKUs of a wine |
//! | GET | `/prices` | List prices |
//! | GET | `/prices/{id}` | Prices of a wine |
//! | POST | `/payment-intents` | Validate cart and create intent |
//! | POST | `/payment-intents/{id}/shipping-change` | Recompute amount with shipping |
//! | POST | `/payment-intents/{id}/currency` | Change currency and methods |
//! | GET | `/payment-intents/{id}/status` | Intent status |
//! | POST | `/customers` | Create customer |
//! | POST | `/webhook/shopping-cart` | Stripe webhook |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
