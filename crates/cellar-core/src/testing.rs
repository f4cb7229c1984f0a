//! # In-Memory Gateway
//!
//! A `PaymentGateway` backed by plain maps that records every call.
//! Compiled for tests and behind the `test-util` feature.

use crate::catalog::{ListQuery, Price, Product, Sku};
use crate::customer::{Customer, NewCustomer};
use crate::error::{ShopError, ShopResult};
use crate::gateway::PaymentGateway;
use crate::intent::{IntentStatus, IntentUpdate, NewIntent, PaymentIntent};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// A call received by [`MemoryGateway`]
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    ListProducts(ListQuery),
    GetProduct(String),
    UpdateProductMetadata {
        id: String,
        key: String,
        value: String,
    },
    ListPrices(ListQuery),
    GetPrice(String),
    ListSkus(ListQuery),
    CreateIntent(NewIntent),
    RetrieveIntent(String),
    UpdateIntent(String, IntentUpdate),
    ConfirmIntent {
        id: String,
        payment_method: String,
    },
    CancelIntent(String),
    CreateCustomer(NewCustomer),
}

#[derive(Default)]
struct State {
    products: Vec<Product>,
    prices: Vec<Price>,
    skus: Vec<Sku>,
    intents: HashMap<String, PaymentIntent>,
    customers: Vec<Customer>,
    calls: Vec<GatewayCall>,
    failing_catalog: bool,
    failing_stock: HashSet<String>,
    next_id: u32,
}

/// In-memory provider
#[derive(Default)]
pub struct MemoryGateway {
    state: Mutex<State>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("memory gateway lock poisoned")
    }

    pub fn with_product(self, product: Product) -> Self {
        self.state().products.push(product);
        self
    }

    pub fn with_price(self, price: Price) -> Self {
        self.state().prices.push(price);
        self
    }

    pub fn with_sku(self, sku: Sku) -> Self {
        self.state().skus.push(sku);
        self
    }

    pub fn with_intent(self, intent: PaymentIntent) -> Self {
        self.state().intents.insert(intent.id.clone(), intent);
        self
    }

    /// Every listing call fails with a network error
    pub fn failing_catalog(self) -> Self {
        self.state().failing_catalog = true;
        self
    }

    /// Metadata writes on this product fail
    pub fn failing_stock_update(self, product_id: impl Into<String>) -> Self {
        self.state().failing_stock.insert(product_id.into());
        self
    }

    /// Calls received so far, in order
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state().calls.clone()
    }

    /// Number of recorded calls matching a predicate
    pub fn count(&self, pred: impl Fn(&GatewayCall) -> bool) -> usize {
        self.state().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn product(&self, id: &str) -> Option<Product> {
        self.state().products.iter().find(|p| p.id == id).cloned()
    }

    pub fn intent(&self, id: &str) -> Option<PaymentIntent> {
        self.state().intents.get(id).cloned()
    }

    pub fn customers(&self) -> Vec<Customer> {
        self.state().customers.clone()
    }

    fn record(&self, call: GatewayCall) -> MutexGuard<'_, State> {
        let mut state = self.state();
        state.calls.push(call);
        state
    }
}

fn page<T: Clone>(items: &[T], query: &ListQuery, keep: impl Fn(&T) -> bool) -> Vec<T> {
    items
        .iter()
        .filter(|item| keep(item))
        .take(query.limit as usize)
        .cloned()
        .collect()
}

fn not_found(resource: &'static str, id: &str) -> ShopError {
    ShopError::NotFound {
        resource,
        id: id.to_string(),
    }
}

#[async_trait]
impl PaymentGateway for MemoryGateway {
    async fn list_products(&self, query: &ListQuery) -> ShopResult<Vec<Product>> {
        let state = self.record(GatewayCall::ListProducts(query.clone()));
        if state.failing_catalog {
            return Err(ShopError::Network("connection refused".into()));
        }
        Ok(page(&state.products, query, |p| {
            query.active.map_or(true, |a| p.active == a)
        }))
    }

    async fn get_product(&self, id: &str) -> ShopResult<Product> {
        let state = self.record(GatewayCall::GetProduct(id.to_string()));
        state
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| not_found("product", id))
    }

    async fn update_product_metadata(
        &self,
        id: &str,
        key: &str,
        value: &str,
    ) -> ShopResult<Product> {
        let mut state = self.record(GatewayCall::UpdateProductMetadata {
            id: id.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        });
        if state.failing_stock.contains(id) {
            return Err(ShopError::Provider {
                message: format!("cannot update product {}", id),
                code: None,
            });
        }
        let product = state
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found("product", id))?;
        product.metadata.insert(key.to_string(), value.to_string());
        Ok(product.clone())
    }

    async fn list_prices(&self, query: &ListQuery) -> ShopResult<Vec<Price>> {
        let state = self.record(GatewayCall::ListPrices(query.clone()));
        if state.failing_catalog {
            return Err(ShopError::Network("connection refused".into()));
        }
        Ok(page(&state.prices, query, |p| {
            query.product.as_deref().map_or(true, |id| p.product == id)
        }))
    }

    async fn get_price(&self, id: &str) -> ShopResult<Price> {
        let state = self.record(GatewayCall::GetPrice(id.to_string()));
        state
            .prices
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| not_found("price", id))
    }

    async fn list_skus(&self, query: &ListQuery) -> ShopResult<Vec<Sku>> {
        let state = self.record(GatewayCall::ListSkus(query.clone()));
        if state.failing_catalog {
            return Err(ShopError::Network("connection refused".into()));
        }
        Ok(page(&state.skus, query, |s| {
            query.product.as_deref().map_or(true, |id| s.product == id)
        }))
    }

    async fn create_intent(&self, params: &NewIntent) -> ShopResult<PaymentIntent> {
        let mut state = self.record(GatewayCall::CreateIntent(params.clone()));
        state.next_id += 1;
        let id = format!("pi_mem_{}", state.next_id);
        let intent = PaymentIntent {
            client_secret: Some(format!("{}_secret", id)),
            id: id.clone(),
            amount: params.amount,
            currency: params.currency.clone(),
            status: IntentStatus::RequiresPaymentMethod,
            payment_method_types: params.payment_method_types.clone(),
            customer: params.customer.clone(),
            metadata: params.metadata.clone(),
            last_payment_error: None,
            livemode: false,
        };
        state.intents.insert(id, intent.clone());
        Ok(intent)
    }

    async fn retrieve_intent(&self, id: &str) -> ShopResult<PaymentIntent> {
        let state = self.record(GatewayCall::RetrieveIntent(id.to_string()));
        state
            .intents
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("payment_intent", id))
    }

    async fn update_intent(&self, id: &str, update: &IntentUpdate) -> ShopResult<PaymentIntent> {
        let mut state = self.record(GatewayCall::UpdateIntent(id.to_string(), update.clone()));
        let intent = state
            .intents
            .get_mut(id)
            .ok_or_else(|| not_found("payment_intent", id))?;
        if let Some(amount) = update.amount {
            intent.amount = amount;
        }
        if let Some(currency) = &update.currency {
            intent.currency = currency.clone();
        }
        if let Some(methods) = &update.payment_method_types {
            intent.payment_method_types = methods.clone();
        }
        Ok(intent.clone())
    }

    async fn confirm_intent(&self, id: &str, payment_method: &str) -> ShopResult<PaymentIntent> {
        let mut state = self.record(GatewayCall::ConfirmIntent {
            id: id.to_string(),
            payment_method: payment_method.to_string(),
        });
        let intent = state
            .intents
            .get_mut(id)
            .ok_or_else(|| not_found("payment_intent", id))?;
        intent.status = IntentStatus::Succeeded;
        Ok(intent.clone())
    }

    async fn cancel_intent(&self, id: &str) -> ShopResult<PaymentIntent> {
        let mut state = self.record(GatewayCall::CancelIntent(id.to_string()));
        let intent = state
            .intents
            .get_mut(id)
            .ok_or_else(|| not_found("payment_intent", id))?;
        if intent.status.is_terminal() {
            return Err(ShopError::Provider {
                message: format!(
                    "You cannot cancel this PaymentIntent because it has a status of {}",
                    intent.status
                ),
                code: Some("payment_intent_unexpected_state".into()),
            });
        }
        intent.status = IntentStatus::Canceled;
        Ok(intent.clone())
    }

    async fn create_customer(&self, params: &NewCustomer) -> ShopResult<Customer> {
        let mut state = self.record(GatewayCall::CreateCustomer(params.clone()));
        state.next_id += 1;
        let customer = Customer {
            id: format!("cus_mem_{}", state.next_id),
            name: Some(params.name.clone()),
            email: Some(params.email.clone()),
            phone: Some(params.phone.clone()),
            address: Some(params.address.clone()),
            shipping: Some(params.shipping.clone()),
            metadata: params.metadata.clone(),
        };
        state.customers.push(customer.clone());
        Ok(customer)
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
