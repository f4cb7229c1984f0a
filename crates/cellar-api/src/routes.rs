//! # Routes
//!
//! Axum router for the storefront API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Catalog:
///   - GET /wines, /wines/{id}, /wines/{id}/skus
///   - GET /prices, /prices/{id} (prices of wine `id`)
/// - Payment intents:
///   - POST /payment-intents
///   - POST /payment-intents/{id}/shipping-change
///   - POST /payment-intents/{id}/currency
///   - GET  /payment-intents/{id}/status
/// - Customers:
///   - POST /customers
/// - Webhooks:
///   - POST /webhook/shopping-cart
/// - GET /config, /health
pub fn create_router(state: AppState) -> Router {
    let cors = if state.config.cors_allow_any {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    let catalog_routes = Router::new()
        .route("/wines", get(handlers::list_wines))
        .route("/wines/{id}", get(handlers::get_wine))
        .route("/wines/{id}/skus", get(handlers::list_wine_skus))
        .route("/prices", get(handlers::list_prices))
        .route("/prices/{id}", get(handlers::list_wine_prices));

    let intent_routes = Router::new()
        .route("/payment-intents", post(handlers::create_payment_intent))
        .route(
            "/payment-intents/{id}/shipping-change",
            post(handlers::change_shipping),
        )
        .route("/payment-intents/{id}/currency", post(handlers::change_currency))
        .route(
            "/payment-intents/{id}/status",
            get(handlers::payment_intent_status),
        );

    // Raw body, signature checked in the handler
    let webhook_routes =
        Router::new().route("/shopping-cart", post(handlers::shopping_cart_webhook));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .merge(catalog_routes)
        .merge(intent_routes)
        .route("/customers", post(handlers::create_customer))
        .nest("/webhook", webhook_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
