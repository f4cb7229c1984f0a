//! # Request Handlers
//!
//! Axum request handlers for the storefront API. Handlers parse input,
//! call one service and shape the JSON the storefront expects.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use cellar_core::{
    Customer, CustomerInput, CurrencyChange, Dispatch, IntentRequest, IntentStatusView,
    PaymentIntent, Price, Product, ShippingChange, ShippingOption, ShopError, Sku,
};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

// =============================================================================
// Response Types
// =============================================================================

/// `{"data": [...]}` listing envelope
#[derive(Debug, Serialize)]
pub struct Listing<T> {
    pub data: Vec<T>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentEnvelope<T> {
    pub payment_intent: T,
}

/// Storefront bootstrap settings
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorefrontConfig {
    pub stripe_publishable_key: String,
    pub stripe_country: String,
    pub country: String,
    pub currency: String,
    pub payment_methods: Vec<String>,
    pub shipping_options: Vec<ShippingOption>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }
}

/// A rejected cart line as the storefront reports it
#[derive(Debug, Serialize)]
pub struct RejectedWine {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RejectionMeta {
    pub wines: Vec<RejectedWine>,
}

/// 406 body for carts that fail stock or quantity checks
#[derive(Debug, Serialize)]
pub struct CartRejection {
    pub message: String,
    pub meta: RejectionMeta,
}

// =============================================================================
// Errors
// =============================================================================

/// `ShopError` rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub ShopError);

impl From<ShopError> for ApiError {
    fn from(err: ShopError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(ShopError::InvalidRequest(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let code = err.status_code();
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!("Request failed: {}", err);
        } else {
            warn!("Request rejected: {}", err);
        }

        if let Some((id, stock)) = err.offending_product() {
            let body = CartRejection {
                message: err.to_string(),
                meta: RejectionMeta {
                    wines: vec![RejectedWine {
                        id: id.to_string(),
                        stock,
                    }],
                },
            };
            return (status, Json(body)).into_response();
        }

        (status, Json(ErrorResponse::new(err.to_string(), code))).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "cellar-cart",
        "provider": state.provider,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn get_config(State(state): State<AppState>) -> Json<StorefrontConfig> {
    let store = &state.store;
    Json(StorefrontConfig {
        stripe_publishable_key: state.publishable_key.clone().unwrap_or_default(),
        stripe_country: store.stripe_country.clone(),
        country: store.country.clone(),
        currency: store.currency.as_str().to_string(),
        payment_methods: store.payment_methods.clone(),
        shipping_options: store.shipping.options.clone(),
    })
}

pub async fn list_wines(State(state): State<AppState>) -> ApiResult<Listing<Product>> {
    let data = state.inventory.list_products().await?;
    Ok(Json(Listing { data }))
}

pub async fn get_wine(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Product> {
    Ok(Json(state.inventory.get_product(&id).await?))
}

pub async fn list_wine_skus(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Listing<Sku>> {
    let data = state.inventory.list_skus(&id).await?;
    Ok(Json(Listing { data }))
}

pub async fn list_prices(State(state): State<AppState>) -> ApiResult<Listing<Price>> {
    let data = state.inventory.list_prices(None).await?;
    Ok(Json(Listing { data }))
}

/// Prices of one wine
pub async fn list_wine_prices(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Listing<Price>> {
    let data = state.inventory.list_prices(Some(&id)).await?;
    Ok(Json(Listing { data }))
}

#[instrument(skip(state, payload))]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    payload: Result<Json<IntentRequest>, JsonRejection>,
) -> ApiResult<IntentEnvelope<PaymentIntent>> {
    let Json(request) = payload?;
    let payment_intent = state.payments.create_intent(&request).await?;
    Ok(Json(IntentEnvelope { payment_intent }))
}

#[instrument(skip(state, payload))]
pub async fn change_shipping(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ShippingChange>, JsonRejection>,
) -> ApiResult<IntentEnvelope<PaymentIntent>> {
    let Json(change) = payload?;
    let payment_intent = state.payments.update_shipping(&id, &change).await?;
    Ok(Json(IntentEnvelope { payment_intent }))
}

#[instrument(skip(state, payload))]
pub async fn change_currency(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<CurrencyChange>, JsonRejection>,
) -> ApiResult<IntentEnvelope<PaymentIntent>> {
    let Json(change) = payload?;
    let payment_intent = state
        .payments
        .update_currency_and_methods(&id, &change)
        .await?;
    Ok(Json(IntentEnvelope { payment_intent }))
}

pub async fn payment_intent_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<IntentEnvelope<IntentStatusView>> {
    let payment_intent = state.payments.intent_status(&id).await?;
    Ok(Json(IntentEnvelope { payment_intent }))
}

#[instrument(skip(state, payload))]
pub async fn create_customer(
    State(state): State<AppState>,
    payload: Result<Json<CustomerInput>, JsonRejection>,
) -> ApiResult<Customer> {
    let Json(input) = payload?;
    Ok(Json(state.customers.create(&input).await?))
}

/// Shopping cart webhook.
///
/// Verification and parse failures are answered with 401/400. Once an
/// event is accepted the response is 200 whatever the handler outcome;
/// failures are logged.
#[instrument(skip(state, headers, body))]
pub async fn shopping_cart_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok());

    let event = state.verifier.verify(&body, signature)?;
    let (event_id, event_type) = (event.id.clone(), event.event_type.clone());

    match state.webhooks.handle(event).await {
        Ok(Dispatch::Handled) => info!("Handled webhook {} ({})", event_id, event_type),
        Ok(Dispatch::Duplicate) => info!("Webhook {} already processed", event_id),
        Ok(Dispatch::Ignored { reason }) => {
            info!("Webhook {} received and not handled: {}", event_id, reason)
        }
        Err(e) => error!("Webhook {} ({}) failed: {}", event_id, event_type, e),
    }

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response() {
        let err = ErrorResponse::new("Test error", 400);
        assert_eq!(err.error, "Test error");
        assert_eq!(err.code, 400);
    }

    #[test]
    fn test_cart_rejection_shape() {
        let response = ApiError(ShopError::InsufficientStock {
            product_id: "prod_a".into(),
            product_name: "Yenda".into(),
            requested: 9,
            available: 5,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);

        let response = ApiError(ShopError::StatusConflict {
            intent_id: "pi_1".into(),
            status: "succeeded".into(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
