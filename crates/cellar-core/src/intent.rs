//! # Payment Intent Types
//!
//! The remote payment-attempt object and the parameters used to create and
//! mutate it.

use crate::cart::{cart_metadata, CartItem};
use crate::catalog::Currency;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Payment method type that only works with AUD, never offered on creation
pub const CURRENCY_BOUND_METHOD: &str = "au_becs_debit";

/// Lifecycle status of a payment intent, as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    /// A status this build does not know about
    #[serde(other)]
    Unknown,
}

impl IntentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::RequiresPaymentMethod => "requires_payment_method",
            IntentStatus::RequiresConfirmation => "requires_confirmation",
            IntentStatus::RequiresAction => "requires_action",
            IntentStatus::Processing => "processing",
            IntentStatus::RequiresCapture => "requires_capture",
            IntentStatus::Canceled => "canceled",
            IntentStatus::Succeeded => "succeeded",
            IntentStatus::Unknown => "unknown",
        }
    }

    /// No further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, IntentStatus::Succeeded | IntentStatus::Canceled)
    }
}

impl Default for IntentStatus {
    fn default() -> Self {
        IntentStatus::RequiresPaymentMethod
    }
}

impl std::fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a payment method or source by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub id: String,
}

/// Why the last payment attempt on an intent failed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastPaymentError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ObjectRef>,
}

impl LastPaymentError {
    /// `("payment_method" | "source", id)` of whatever caused the failure
    pub fn culprit(&self) -> Option<(&'static str, &str)> {
        if let Some(pm) = &self.payment_method {
            return Some(("payment_method", pm.id.as_str()));
        }
        self.source.as_ref().map(|s| ("source", s.id.as_str()))
    }
}

/// A payment intent held by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,

    /// Amount in smallest currency unit
    pub amount: i64,

    pub currency: Currency,

    #[serde(default)]
    pub status: IntentStatus,

    #[serde(default)]
    pub payment_method_types: Vec<String>,

    /// Secret the browser needs to confirm the payment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,

    /// Cart snapshot: product id -> bottles
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_payment_error: Option<LastPaymentError>,

    #[serde(default)]
    pub livemode: bool,
}

/// Parameters for creating an intent
#[derive(Debug, Clone, PartialEq)]
pub struct NewIntent {
    pub amount: i64,
    pub currency: Currency,
    pub payment_method_types: Vec<String>,
    pub customer: Option<String>,
    pub metadata: HashMap<String, String>,
    /// Sent as the provider's idempotency key; fresh for every checkout attempt
    pub idempotency_key: String,
}

impl NewIntent {
    pub fn new(amount: i64, currency: Currency, items: &[CartItem]) -> Self {
        Self {
            amount,
            currency,
            payment_method_types: Vec::new(),
            customer: None,
            metadata: cart_metadata(items),
            idempotency_key: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_payment_methods(mut self, methods: Vec<String>) -> Self {
        self.payment_method_types = methods;
        self
    }

    pub fn with_customer(mut self, customer: Option<String>) -> Self {
        self.customer = customer.filter(|c| !c.is_empty());
        self
    }
}

/// Fields to overwrite on an existing intent; `None` leaves a field alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntentUpdate {
    pub amount: Option<i64>,
    pub currency: Option<Currency>,
    pub payment_method_types: Option<Vec<String>>,
}

impl IntentUpdate {
    pub fn amount(amount: i64) -> Self {
        Self {
            amount: Some(amount),
            ..Self::default()
        }
    }

    pub fn currency_and_methods(currency: Currency, methods: Vec<String>) -> Self {
        Self {
            amount: None,
            currency: Some(currency),
            payment_method_types: Some(methods),
        }
    }
}

/// Body of `POST /payment-intents`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRequest {
    pub currency: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

/// Shipping option reference as the storefront sends it
#[derive(Debug, Clone, Deserialize)]
pub struct ShippingOptionRef {
    pub id: String,
}

/// Body of `POST /payment-intents/{id}/shipping-change`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingChange {
    #[serde(default)]
    pub items: Vec<CartItem>,
    pub shipping_option: ShippingOptionRef,
}

/// Body of `POST /payment-intents/{id}/currency`
#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyChange {
    pub currency: String,
    #[serde(default)]
    pub payment_methods: Vec<String>,
}

/// Status-only view returned to the storefront while it polls
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntentStatusView {
    pub status: IntentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_payment_error: Option<String>,
}

impl From<&PaymentIntent> for IntentStatusView {
    fn from(intent: &PaymentIntent) -> Self {
        Self {
            status: intent.status,
            last_payment_error: intent
                .last_payment_error
                .as_ref()
                .and_then(|e| e.message.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_serde() {
        let status: IntentStatus = serde_json::from_value(json!("requires_payment_method")).unwrap();
        assert_eq!(status, IntentStatus::RequiresPaymentMethod);

        let status: IntentStatus = serde_json::from_value(json!("something_new")).unwrap();
        assert_eq!(status, IntentStatus::Unknown);

        assert_eq!(serde_json::to_value(IntentStatus::Canceled).unwrap(), json!("canceled"));
        assert!(IntentStatus::Succeeded.is_terminal());
        assert!(!IntentStatus::Processing.is_terminal());
    }

    #[test]
    fn test_intent_from_provider_json() {
        let intent: PaymentIntent = serde_json::from_value(json!({
            "id": "pi_123",
            "object": "payment_intent",
            "amount": 3600,
            "currency": "eur",
            "status": "requires_payment_method",
            "payment_method_types": ["card", "sepa_debit"],
            "client_secret": "pi_123_secret_abc",
            "customer": null,
            "metadata": {"prod_a": "2"},
            "last_payment_error": {
                "message": "Your card was declined.",
                "payment_method": {"id": "pm_1", "object": "payment_method"}
            },
            "livemode": false
        }))
        .unwrap();

        assert_eq!(intent.amount, 3600);
        assert_eq!(intent.customer, None);
        assert_eq!(intent.metadata["prod_a"], "2");
        let err = intent.last_payment_error.as_ref().unwrap();
        assert_eq!(err.culprit(), Some(("payment_method", "pm_1")));

        let view = IntentStatusView::from(&intent);
        assert_eq!(view.last_payment_error.as_deref(), Some("Your card was declined."));
    }

    #[test]
    fn test_culprit_falls_back_to_source() {
        let err = LastPaymentError {
            source: Some(ObjectRef { id: "src_9".into() }),
            ..Default::default()
        };
        assert_eq!(err.culprit(), Some(("source", "src_9")));
        assert_eq!(LastPaymentError::default().culprit(), None);
    }

    #[test]
    fn test_new_intent_keys_are_unique() {
        let items = vec![CartItem::new("prod_a", 1)];
        let a = NewIntent::new(100, Currency::default(), &items);
        let b = NewIntent::new(100, Currency::default(), &items);
        assert_ne!(a.idempotency_key, b.idempotency_key);
        assert_eq!(a.metadata["prod_a"], "1");

        let c = a.with_customer(Some(String::new()));
        assert_eq!(c.customer, None);
    }

    #[test]
    fn test_request_bodies() {
        let req: IntentRequest = serde_json::from_value(json!({
            "currency": "eur",
            "customerId": "cus_1",
            "items": [{"parent": "prod_a", "quantity": 2}]
        }))
        .unwrap();
        assert_eq!(req.customer_id.as_deref(), Some("cus_1"));
        assert_eq!(req.items[0].quantity, 2);

        let change: ShippingChange = serde_json::from_value(json!({
            "items": [],
            "shippingOption": {"id": "express", "label": "Express Shipping"}
        }))
        .unwrap();
        assert_eq!(change.shipping_option.id, "express");

        let change: CurrencyChange = serde_json::from_value(json!({
            "currency": "aud",
            "payment_methods": ["card", "au_becs_debit"]
        }))
        .unwrap();
        assert_eq!(change.payment_methods.len(), 2);
    }
}
