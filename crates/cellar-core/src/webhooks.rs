//! # Webhook Dispatcher
//!
//! Routes verified provider events to the services that act on them.
//!
//! ```text
//! WebhookEvent ──► EventLedger::claim ──► dispatch by object kind
//!                        │                   ├── payment_intent.succeeded  → decrement stock (once per line)
//!                        │                   ├── payment_intent.payment_failed → log culprit
//!                        │                   ├── source chargeable        → confirm intent
//!                        │                   ├── source failed / canceled → cancel intent
//!                        │                   └── anything else            → ignored
//!                        └── already seen ──► Dispatch::Duplicate
//! ```
//!
//! Signature verification happens before an event reaches this module.

use crate::error::{ShopError, ShopResult};
use crate::event::{EventObject, IntentEventKind, Source, SourceStatus, WebhookEvent};
use crate::intent::PaymentIntent;
use crate::inventory::Inventory;
use crate::payments::PaymentOrchestrator;
use moka::future::Cache;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const LEDGER_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const LEDGER_CAPACITY: u64 = 100_000;

/// Outcome of handling one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    Ignored { reason: String },
    /// The event id was already processed
    Duplicate,
}

impl Dispatch {
    pub fn is_handled(&self) -> bool {
        matches!(self, Dispatch::Handled)
    }

    fn ignored(reason: impl Into<String>) -> Self {
        Dispatch::Ignored {
            reason: reason.into(),
        }
    }
}

/// Event ids seen recently.
///
/// Providers deliver at least once; a claimed id is remembered for 24 hours.
/// Stock lines of an event are claimed under `{event_id}:{product_id}` so a
/// redelivered event only redoes the lines that failed.
#[derive(Clone)]
pub struct EventLedger {
    seen: Cache<String, ()>,
}

impl Default for EventLedger {
    fn default() -> Self {
        Self::new(LEDGER_CAPACITY, LEDGER_TTL)
    }
}

impl EventLedger {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            seen: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Record an id. Returns false when it was already present.
    pub async fn claim(&self, event_id: &str) -> bool {
        self.seen
            .entry(event_id.to_string())
            .or_insert(())
            .await
            .is_fresh()
    }

    /// Forget an id so a redelivery is processed again
    pub async fn release(&self, event_id: &str) {
        self.seen.invalidate(event_id).await;
    }

    fn line_key(event_id: &str, product_id: &str) -> String {
        format!("{}:{}", event_id, product_id)
    }
}

#[derive(Clone)]
pub struct WebhookDispatcher {
    payments: PaymentOrchestrator,
    inventory: Inventory,
    ledger: EventLedger,
}

impl WebhookDispatcher {
    pub fn new(payments: PaymentOrchestrator, inventory: Inventory) -> Self {
        Self::with_ledger(payments, inventory, EventLedger::default())
    }

    pub fn with_ledger(
        payments: PaymentOrchestrator,
        inventory: Inventory,
        ledger: EventLedger,
    ) -> Self {
        Self {
            payments,
            inventory,
            ledger,
        }
    }

    /// Handle one event at most once per event id.
    ///
    /// A failed event is released from the ledger before the error is
    /// returned. Stock lines that already went through stay claimed.
    #[instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.event_type))]
    pub async fn handle(&self, event: WebhookEvent) -> ShopResult<Dispatch> {
        if !self.ledger.claim(&event.id).await {
            info!("Skipping duplicate event {}", event.id);
            return Ok(Dispatch::Duplicate);
        }

        let outcome = self.dispatch(&event).await;
        if outcome.is_err() {
            self.ledger.release(&event.id).await;
        }
        outcome
    }

    async fn dispatch(&self, event: &WebhookEvent) -> ShopResult<Dispatch> {
        match &event.object {
            EventObject::PaymentIntent(intent) => match event.intent_event_kind() {
                IntentEventKind::Succeeded => {
                    self.settle_stock(&event.id, intent).await?;
                    Ok(Dispatch::Handled)
                }
                IntentEventKind::PaymentFailed => {
                    log_payment_failure(intent);
                    Ok(Dispatch::Handled)
                }
                IntentEventKind::Other => Ok(Dispatch::ignored(format!(
                    "event type {} not handled",
                    event.event_type
                ))),
            },
            EventObject::Source(source) => self.on_source(source).await,
            EventObject::Unrecognized { kind } => {
                warn!("Unhandled webhook object kind: {}", kind);
                Ok(Dispatch::ignored(format!("object kind {} not handled", kind)))
            }
        }
    }

    /// Decrement stock for every cart line recorded on the intent.
    ///
    /// Every line is attempted. Lines already written stay written when a
    /// later one fails, and are skipped when the event is delivered again.
    async fn settle_stock(&self, event_id: &str, intent: &PaymentIntent) -> ShopResult<()> {
        let mut lines: Vec<(&String, &String)> = intent.metadata.iter().collect();
        lines.sort();

        let mut failed = Vec::new();
        for (product_id, quantity) in lines {
            let key = EventLedger::line_key(event_id, product_id);
            if !self.ledger.claim(&key).await {
                debug!("Stock of {} already settled for {}", product_id, event_id);
                continue;
            }

            let sold = match quantity.trim().parse::<i64>() {
                Ok(n) => n,
                Err(_) => {
                    warn!("Intent {}: bad quantity {:?} for {}", intent.id, quantity, product_id);
                    self.ledger.release(&key).await;
                    failed.push(product_id.clone());
                    continue;
                }
            };

            match self.inventory.decrement_stock(product_id, sold).await {
                Ok(remaining) => info!("Sold {} of {}, {} left", sold, product_id, remaining),
                Err(e) => {
                    warn!("Stock update failed for {}: {}", product_id, e);
                    self.ledger.release(&key).await;
                    failed.push(product_id.clone());
                }
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(ShopError::StockUpdate { failed })
        }
    }

    async fn on_source(&self, source: &Source) -> ShopResult<Dispatch> {
        let Some(intent_id) = source.intent_id() else {
            return Ok(Dispatch::ignored(format!(
                "source {} has no payment intent",
                source.id
            )));
        };

        match source.status {
            SourceStatus::Chargeable => {
                self.payments.confirm_intent(intent_id, &source.id).await?;
                Ok(Dispatch::Handled)
            }
            SourceStatus::Failed | SourceStatus::Canceled => {
                self.payments.cancel_intent(intent_id).await?;
                Ok(Dispatch::Handled)
            }
            other => Ok(Dispatch::ignored(format!(
                "source {} status {:?} not handled",
                source.id, other
            ))),
        }
    }
}

fn log_payment_failure(intent: &PaymentIntent) {
    let failure = intent.last_payment_error.as_ref();
    let message = failure
        .and_then(|e| e.message.as_deref())
        .unwrap_or("no message");

    match failure.and_then(|e| e.culprit()) {
        Some((kind, id)) => warn!("Payment failed for {} with {} {}: {}", intent.id, kind, id, message),
        None => warn!("Payment failed for {}: {}", intent.id, message),
    }
}
