//! # Payment Orchestrator
//!
//! Creates and mutates payment intents. Cart lines are checked against the
//! live stock recorded in the catalog before any intent exists; after that
//! the provider's own state machine is the only source of truth.

use crate::cart::merge_lines;
use crate::catalog::Currency;
use crate::config::StoreConfig;
use crate::error::{ShopError, ShopResult};
use crate::gateway::BoxedGateway;
use crate::intent::{
    CurrencyChange, IntentRequest, IntentStatus, IntentStatusView, IntentUpdate, NewIntent,
    PaymentIntent, ShippingChange,
};
use crate::inventory::Inventory;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Clone)]
pub struct PaymentOrchestrator {
    gateway: BoxedGateway,
    inventory: Inventory,
    config: Arc<StoreConfig>,
}

impl PaymentOrchestrator {
    pub fn new(gateway: BoxedGateway, inventory: Inventory, config: Arc<StoreConfig>) -> Self {
        Self {
            gateway,
            inventory,
            config,
        }
    }

    /// Validate the cart against stock and create a new intent.
    ///
    /// Repeated lines for a product are summed first, so the quantity
    /// checked against stock is the one recorded on the intent. Every
    /// line is checked before anything is written; a rejected cart never
    /// reaches the provider's create call. Repeating the request creates
    /// another intent.
    #[instrument(skip(self, request), fields(lines = request.items.len(), currency = %request.currency))]
    pub async fn create_intent(&self, request: &IntentRequest) -> ShopResult<PaymentIntent> {
        if request.items.is_empty() {
            return Err(ShopError::InvalidRequest("cart has no items".to_string()));
        }
        let currency = Currency::parse(&request.currency)?;

        let lines = merge_lines(&request.items);
        for line in &lines {
            let product = self.inventory.get_product(&line.parent).await?;
            if let Err(e) = line.check_against(&product) {
                warn!("Rejected cart line {}: {}", line.parent, e);
                return Err(e);
            }
        }

        let amount = self.inventory.compute_cart_total(&lines).await?;

        let methods = self.config.creation_payment_methods();
        if methods.is_empty() {
            return Err(ShopError::Configuration(
                "no payment methods available for a new intent".to_string(),
            ));
        }

        let params = NewIntent::new(amount, currency, &lines)
            .with_payment_methods(methods)
            .with_customer(request.customer_id.clone());

        let intent = self.gateway.create_intent(&params).await?;
        info!(
            "Created payment intent {}: amount={} {}",
            intent.id, intent.amount, intent.currency
        );
        Ok(intent)
    }

    pub async fn retrieve_intent(&self, id: &str) -> ShopResult<PaymentIntent> {
        self.gateway.retrieve_intent(id).await
    }

    /// Status (and last failure message) for storefront polling
    pub async fn intent_status(&self, id: &str) -> ShopResult<IntentStatusView> {
        let intent = self.retrieve_intent(id).await?;
        Ok(IntentStatusView::from(&intent))
    }

    /// Recompute the amount as cart total plus the chosen shipping fee.
    ///
    /// Only the amount is written. Unknown shipping ids fail; they never
    /// fall back to a free tier.
    #[instrument(skip(self, change), fields(shipping = %change.shipping_option.id))]
    pub async fn update_shipping(&self, id: &str, change: &ShippingChange) -> ShopResult<PaymentIntent> {
        let fee = self
            .config
            .shipping
            .cost(&change.shipping_option.id)
            .ok_or_else(|| ShopError::UnknownShippingOption {
                id: change.shipping_option.id.clone(),
            })?;

        let subtotal = self.inventory.compute_cart_total(&change.items).await?;
        let amount = subtotal
            .checked_add(fee)
            .ok_or_else(|| ShopError::InvalidRequest("cart total overflows".to_string()))?;

        debug!("Shipping change on {}: {} + {} = {}", id, subtotal, fee, amount);
        self.gateway
            .update_intent(id, &IntentUpdate::amount(amount))
            .await
    }

    /// Overwrite currency and payment method types; the amount is untouched
    #[instrument(skip(self, change), fields(currency = %change.currency))]
    pub async fn update_currency_and_methods(
        &self,
        id: &str,
        change: &CurrencyChange,
    ) -> ShopResult<PaymentIntent> {
        let currency = Currency::parse(&change.currency)?;
        if change.payment_methods.is_empty() {
            return Err(ShopError::InvalidRequest(
                "payment_methods must not be empty".to_string(),
            ));
        }

        self.gateway
            .update_intent(
                id,
                &IntentUpdate::currency_and_methods(currency, change.payment_methods.clone()),
            )
            .await
    }

    /// Confirm an intent that is still waiting for a payment method.
    ///
    /// Any other status is a conflict and no confirmation is sent.
    #[instrument(skip(self))]
    pub async fn confirm_intent(&self, id: &str, payment_method: &str) -> ShopResult<PaymentIntent> {
        let intent = self.gateway.retrieve_intent(id).await?;

        if intent.status != IntentStatus::RequiresPaymentMethod {
            return Err(ShopError::StatusConflict {
                intent_id: intent.id,
                status: intent.status.to_string(),
            });
        }

        let confirmed = self.gateway.confirm_intent(&intent.id, payment_method).await?;
        info!("Confirmed payment intent {} with {}", confirmed.id, payment_method);
        Ok(confirmed)
    }

    /// Cancel an intent. Provider refusals (already canceled, succeeded)
    /// are returned, not swallowed.
    #[instrument(skip(self))]
    pub async fn cancel_intent(&self, id: &str) -> ShopResult<PaymentIntent> {
        let canceled = self.gateway.cancel_intent(id).await?;
        info!("Canceled payment intent {}", id);
        Ok(canceled)
    }
}
