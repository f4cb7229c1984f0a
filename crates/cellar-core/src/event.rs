//! # Webhook Event Types
//!
//! Inbound provider events decoded into a closed set of object kinds.
//! Anything other than a payment intent or a source lands in
//! [`EventObject::Unrecognized`] instead of being dropped silently.

use crate::error::{ShopError, ShopResult};
use crate::intent::PaymentIntent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Source metadata key carrying the intent the source pays for
pub const SOURCE_INTENT_KEY: &str = "paymentIntent";

/// Status of an asynchronous payment source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Pending,
    Chargeable,
    Consumed,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

/// A customer-provided payment asset that settles asynchronously
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub status: SourceStatus,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Source {
    /// Intent this source was created for, if any
    pub fn intent_id(&self) -> Option<&str> {
        self.metadata
            .get(SOURCE_INTENT_KEY)
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }
}

/// The object an event is about
#[derive(Debug, Clone, PartialEq)]
pub enum EventObject {
    PaymentIntent(PaymentIntent),
    Source(Source),
    /// Object kind this service does not act on
    Unrecognized { kind: String },
}

impl EventObject {
    pub fn kind(&self) -> &str {
        match self {
            EventObject::PaymentIntent(_) => "payment_intent",
            EventObject::Source(_) => "source",
            EventObject::Unrecognized { kind } => kind.as_str(),
        }
    }
}

/// Payment-intent event types the dispatcher distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentEventKind {
    Succeeded,
    PaymentFailed,
    Other,
}

/// A decoded webhook event
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    /// Provider event id, used for deduplication
    pub id: String,
    /// Event type, e.g. `payment_intent.succeeded`
    pub event_type: String,
    pub created: DateTime<Utc>,
    pub livemode: bool,
    pub object: EventObject,
}

#[derive(Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    created: i64,
    #[serde(default)]
    livemode: bool,
    data: RawEventData,
}

#[derive(Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

impl WebhookEvent {
    /// Decode an event from its JSON body
    pub fn from_slice(payload: &[u8]) -> ShopResult<Self> {
        let raw: RawEvent = serde_json::from_slice(payload)
            .map_err(|e| ShopError::WebhookParse(format!("Failed to parse webhook: {}", e)))?;

        let kind = raw
            .data
            .object
            .get("object")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let object = match kind.as_str() {
            "payment_intent" => EventObject::PaymentIntent(
                serde_json::from_value(raw.data.object).map_err(|e| {
                    ShopError::WebhookParse(format!("Bad payment_intent object: {}", e))
                })?,
            ),
            "source" => EventObject::Source(serde_json::from_value(raw.data.object).map_err(
                |e| ShopError::WebhookParse(format!("Bad source object: {}", e)),
            )?),
            _ => EventObject::Unrecognized { kind: kind.clone() },
        };

        Ok(Self {
            id: raw.id,
            event_type: raw.event_type,
            created: DateTime::from_timestamp(raw.created, 0).unwrap_or_else(Utc::now),
            livemode: raw.livemode,
            object,
        })
    }

    pub fn intent_event_kind(&self) -> IntentEventKind {
        match self.event_type.as_str() {
            "payment_intent.succeeded" => IntentEventKind::Succeeded,
            "payment_intent.payment_failed" => IntentEventKind::PaymentFailed,
            _ => IntentEventKind::Other,
        }
    }
}
