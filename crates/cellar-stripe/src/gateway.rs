//! # Stripe Gateway
//!
//! `PaymentGateway` over the Stripe REST API. Products, prices and SKUs
//! come from the Stripe catalog; stock lives in product metadata; intents
//! and customers map one-to-one onto Stripe objects.

use crate::client::{List, Params, StripeClient, Target};
use crate::config::StripeConfig;
use async_trait::async_trait;
use cellar_core::customer::{PostalAddress, ShippingDetails};
use cellar_core::{
    Customer, IntentUpdate, ListQuery, NewCustomer, NewIntent, PaymentGateway, PaymentIntent,
    Price, Product, ShopResult, Sku,
};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{info, instrument};

/// Stripe-backed gateway
pub struct StripeGateway {
    client: StripeClient,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> ShopResult<Self> {
        Ok(Self {
            client: StripeClient::new(config)?,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> ShopResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    pub fn config(&self) -> &StripeConfig {
        self.client.config()
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self))]
    async fn list_products(&self, query: &ListQuery) -> ShopResult<Vec<Product>> {
        let page: List<Product> = self
            .client
            .get(&["products"], &list_params(query), Target::new("product", ""))
            .await?;
        Ok(page.data)
    }

    async fn get_product(&self, id: &str) -> ShopResult<Product> {
        self.client
            .get(&["products", id], &Params::new(), Target::new("product", id))
            .await
    }

    #[instrument(skip(self))]
    async fn update_product_metadata(
        &self,
        id: &str,
        key: &str,
        value: &str,
    ) -> ShopResult<Product> {
        let form = vec![(format!("metadata[{}]", key), value.to_string())];
        self.client
            .post(&["products", id], &form, None, Target::new("product", id))
            .await
    }

    #[instrument(skip(self))]
    async fn list_prices(&self, query: &ListQuery) -> ShopResult<Vec<Price>> {
        let page: List<Price> = self
            .client
            .get(&["prices"], &list_params(query), Target::new("price", ""))
            .await?;
        Ok(page.data)
    }

    async fn get_price(&self, id: &str) -> ShopResult<Price> {
        self.client
            .get(&["prices", id], &Params::new(), Target::new("price", id))
            .await
    }

    #[instrument(skip(self))]
    async fn list_skus(&self, query: &ListQuery) -> ShopResult<Vec<Sku>> {
        let page: List<Sku> = self
            .client
            .get(&["skus"], &list_params(query), Target::new("sku", ""))
            .await?;
        Ok(page.data)
    }

    #[instrument(skip(self, params), fields(amount = params.amount, currency = %params.currency))]
    async fn create_intent(&self, params: &NewIntent) -> ShopResult<PaymentIntent> {
        let mut form: Params = vec![
            ("amount".to_string(), params.amount.to_string()),
            ("currency".to_string(), params.currency.as_str().to_string()),
        ];
        push_methods(&mut form, &params.payment_method_types);
        if let Some(customer) = &params.customer {
            form.push(("customer".to_string(), customer.clone()));
        }
        push_metadata(&mut form, "metadata", &params.metadata);

        let intent: PaymentIntent = self
            .client
            .post(
                &["payment_intents"],
                &form,
                Some(&params.idempotency_key),
                Target::new("payment_intent", ""),
            )
            .await?;

        info!("Created Stripe payment intent: id={}", intent.id);
        Ok(intent)
    }

    async fn retrieve_intent(&self, id: &str) -> ShopResult<PaymentIntent> {
        self.client
            .get(
                &["payment_intents", id],
                &Params::new(),
                Target::new("payment_intent", id),
            )
            .await
    }

    #[instrument(skip(self, update))]
    async fn update_intent(&self, id: &str, update: &IntentUpdate) -> ShopResult<PaymentIntent> {
        let mut form = Params::new();
        if let Some(amount) = update.amount {
            form.push(("amount".to_string(), amount.to_string()));
        }
        if let Some(currency) = &update.currency {
            form.push(("currency".to_string(), currency.as_str().to_string()));
        }
        if let Some(methods) = &update.payment_method_types {
            push_methods(&mut form, methods);
        }

        self.client
            .post(
                &["payment_intents", id],
                &form,
                None,
                Target::new("payment_intent", id),
            )
            .await
    }

    #[instrument(skip(self))]
    async fn confirm_intent(&self, id: &str, payment_method: &str) -> ShopResult<PaymentIntent> {
        let form = vec![("payment_method".to_string(), payment_method.to_string())];
        self.client
            .post(
                &["payment_intents", id, "confirm"],
                &form,
                None,
                Target::new("payment_intent", id),
            )
            .await
    }

    #[instrument(skip(self))]
    async fn cancel_intent(&self, id: &str) -> ShopResult<PaymentIntent> {
        self.client
            .post(
                &["payment_intents", id, "cancel"],
                &Params::new(),
                None,
                Target::new("payment_intent", id),
            )
            .await
    }

    #[instrument(skip(self, params))]
    async fn create_customer(&self, params: &NewCustomer) -> ShopResult<Customer> {
        let mut form = Params::new();
        push_nonempty(&mut form, "name", &params.name);
        push_nonempty(&mut form, "email", &params.email);
        push_nonempty(&mut form, "phone", &params.phone);
        push_address(&mut form, "address", &params.address);
        push_nonempty(&mut form, "shipping[name]", &params.shipping.name);
        push_nonempty(&mut form, "shipping[phone]", &params.shipping.phone);
        push_address(&mut form, "shipping[address]", &params.shipping.address);
        push_metadata(&mut form, "metadata", &params.metadata);

        let customer: StripeCustomer = self
            .client
            .post(&["customers"], &form, None, Target::new("customer", ""))
            .await?;

        info!("Created Stripe customer: id={}", customer.id);
        Ok(customer.into())
    }

    fn provider_name(&self) -> &'static str {
        "stripe"
    }
}

// =============================================================================
// Form Encoding
// =============================================================================

fn list_params(query: &ListQuery) -> Params {
    let mut params = vec![("limit".to_string(), query.limit.to_string())];
    if let Some(active) = query.active {
        params.push(("active".to_string(), active.to_string()));
    }
    if let Some(product) = &query.product {
        params.push(("product".to_string(), product.clone()));
    }
    params
}

fn push_methods(form: &mut Params, methods: &[String]) {
    for (i, method) in methods.iter().enumerate() {
        form.push((format!("payment_method_types[{}]", i), method.clone()));
    }
}

fn push_metadata(form: &mut Params, prefix: &str, metadata: &HashMap<String, String>) {
    let mut entries: Vec<_> = metadata.iter().collect();
    entries.sort();
    for (key, value) in entries {
        form.push((format!("{}[{}]", prefix, key), value.clone()));
    }
}

fn push_nonempty(form: &mut Params, key: &str, value: &str) {
    if !value.is_empty() {
        form.push((key.to_string(), value.to_string()));
    }
}

fn push_address(form: &mut Params, prefix: &str, address: &PostalAddress) {
    push_nonempty(form, &format!("{}[line1]", prefix), &address.line1);
    push_nonempty(form, &format!("{}[postal_code]", prefix), &address.postal_code);
    push_nonempty(form, &format!("{}[state]", prefix), &address.state);
    push_nonempty(form, &format!("{}[city]", prefix), &address.city);
    push_nonempty(form, &format!("{}[country]", prefix), &address.country);
}

// =============================================================================
// Stripe API Types
// =============================================================================

// Stripe sends null for unset address fields
#[derive(Debug, Deserialize)]
struct StripeAddress {
    line1: Option<String>,
    postal_code: Option<String>,
    state: Option<String>,
    city: Option<String>,
    country: Option<String>,
}

impl From<StripeAddress> for PostalAddress {
    fn from(a: StripeAddress) -> Self {
        PostalAddress {
            line1: a.line1.unwrap_or_default(),
            postal_code: a.postal_code.unwrap_or_default(),
            state: a.state.unwrap_or_default(),
            city: a.city.unwrap_or_default(),
            country: a.country.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StripeShipping {
    #[serde(default)]
    address: Option<StripeAddress>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeCustomer {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    address: Option<StripeAddress>,
    #[serde(default)]
    shipping: Option<StripeShipping>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl From<StripeCustomer> for Customer {
    fn from(c: StripeCustomer) -> Self {
        Customer {
            id: c.id,
            name: c.name,
            email: c.email,
            phone: c.phone,
            address: c.address.map(PostalAddress::from),
            shipping: c.shipping.map(|s| ShippingDetails {
                address: s.address.map(PostalAddress::from).unwrap_or_default(),
                name: s.name.unwrap_or_default(),
                phone: s.phone.unwrap_or_default(),
            }),
            metadata: c.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellar_core::{CartItem, Currency, CustomerInput, IntentStatus, ShopError};
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(server: &MockServer) -> StripeGateway {
        StripeGateway::new(StripeConfig::new("sk_test_123").with_api_base_url(server.uri())).unwrap()
    }

    fn intent_json(id: &str, amount: i64, status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "object": "payment_intent",
            "amount": amount,
            "currency": "eur",
            "status": status,
            "payment_method_types": ["card"],
            "client_secret": format!("{}_secret_abc", id),
            "customer": null,
            "metadata": {"prod_a": "3"},
            "last_payment_error": null,
            "livemode": false
        })
    }

    #[tokio::test]
    async fn test_list_products_sends_page_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/products"))
            .and(query_param("limit", "3"))
            .and(query_param("active", "true"))
            .and(header("Authorization", "Bearer sk_test_123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "has_more": true,
                "data": [{
                    "id": "prod_a",
                    "object": "product",
                    "name": "Yenda",
                    "description": null,
                    "active": true,
                    "livemode": false,
                    "images": [],
                    "metadata": {"quantity": "12", "vintage": "2019"}
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let products = gateway(&server)
            .list_products(&ListQuery::new(3).active(true))
            .await
            .unwrap();

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].stock().unwrap(), 12);
    }

    #[tokio::test]
    async fn test_list_prices_by_product() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/prices"))
            .and(query_param("product", "prod_a"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"id": "price_1", "product": "prod_a", "unit_amount": 1500, "currency": "eur", "active": true},
                    {"id": "price_2", "product": "prod_a", "unit_amount": null, "currency": "eur", "active": true}
                ]
            })))
            .mount(&server)
            .await;

        let prices = gateway(&server)
            .list_prices(&ListQuery::new(3).product("prod_a"))
            .await
            .unwrap();
        assert_eq!(prices[0].unit_amount, Some(1500));
        assert_eq!(prices[1].unit_amount, None);
    }

    #[tokio::test]
    async fn test_missing_product_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/products/prod_gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"message": "No such product: 'prod_gone'", "code": "resource_missing"}
            })))
            .mount(&server)
            .await;

        let err = gateway(&server).get_product("prod_gone").await.unwrap_err();
        assert!(matches!(err, ShopError::NotFound { resource: "product", .. }));
    }

    #[tokio::test]
    async fn test_update_stock_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/products/prod_a"))
            .and(body_string_contains("metadata%5Bquantity%5D=7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "prod_a",
                "name": "Yenda",
                "metadata": {"quantity": "7"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let product = gateway(&server)
            .update_product_metadata("prod_a", "quantity", "7")
            .await
            .unwrap();
        assert_eq!(product.stock().unwrap(), 7);
    }

    #[tokio::test]
    async fn test_create_intent_form_and_idempotency_key() {
        let server = MockServer::start().await;
        let params = NewIntent::new(4500, Currency::parse("eur").unwrap(), &[CartItem::new("prod_a", 3)])
            .with_payment_methods(vec!["card".into(), "sepa_debit".into()])
            .with_customer(Some("cus_9".into()));

        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .and(header("Idempotency-Key", params.idempotency_key.as_str()))
            .and(body_string_contains("amount=4500"))
            .and(body_string_contains("currency=eur"))
            .and(body_string_contains("payment_method_types%5B1%5D=sepa_debit"))
            .and(body_string_contains("customer=cus_9"))
            .and(body_string_contains("metadata%5Bprod_a%5D=3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(intent_json("pi_1", 4500, "requires_payment_method")))
            .expect(1)
            .mount(&server)
            .await;

        let intent = gateway(&server).create_intent(&params).await.unwrap();
        assert_eq!(intent.id, "pi_1");
        assert_eq!(intent.status, IntentStatus::RequiresPaymentMethod);
        assert_eq!(intent.client_secret.as_deref(), Some("pi_1_secret_abc"));
    }

    #[tokio::test]
    async fn test_confirm_and_cancel_paths() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents/pi_1/confirm"))
            .and(body_string_contains("payment_method=src_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(intent_json("pi_1", 4500, "processing")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents/pi_2/cancel"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "message": "You cannot cancel this PaymentIntent because it has a status of succeeded.",
                    "code": "payment_intent_unexpected_state"
                }
            })))
            .mount(&server)
            .await;

        let gw = gateway(&server);
        let confirmed = gw.confirm_intent("pi_1", "src_1").await.unwrap();
        assert_eq!(confirmed.status, IntentStatus::Processing);

        let err = gw.cancel_intent("pi_2").await.unwrap_err();
        match err {
            ShopError::Provider { code, .. } => {
                assert_eq!(code.as_deref(), Some("payment_intent_unexpected_state"))
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_customer_maps_nullable_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/customers"))
            .and(body_string_contains("address%5Bline1%5D=Rua+Nova+2"))
            .and(body_string_contains("shipping%5Baddress%5D%5Bstate%5D=Lugo"))
            .and(body_string_contains("metadata%5Blgpd%5D=true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cus_1",
                "object": "customer",
                "name": "Ana Souto",
                "email": "ana@example.com",
                "phone": null,
                "address": {"line1": "Rua Nova 2", "line2": null, "postal_code": "27001", "state": "Lugo", "city": "Lugo", "country": "ES"},
                "shipping": {"address": {"line1": "Rua Nova 2", "line2": null, "postal_code": null, "state": "Lugo", "city": null, "country": "ES"}, "name": "Ana Souto", "phone": null},
                "metadata": {"lgpd": "true", "nifCif": "", "company": ""}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let input: CustomerInput = serde_json::from_value(json!({
            "address": {"city": "Lugo", "country": "ES", "postalCode": "27001", "province": "Lugo", "street": "Rua Nova 2"},
            "email": "ana@example.com",
            "firstName": "Ana",
            "lastName": "Souto",
            "lgpd": true
        }))
        .unwrap();

        let customer = gateway(&server)
            .create_customer(&input.to_new_customer())
            .await
            .unwrap();

        assert_eq!(customer.id, "cus_1");
        assert!(customer.has_consent());
        assert_eq!(customer.phone, None);
        let shipping = customer.shipping.unwrap();
        assert_eq!(shipping.address.postal_code, "");
        assert_eq!(shipping.address.state, "Lugo");
    }

    #[tokio::test]
    async fn test_intent_id_stays_inside_its_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/customers/cus_victim"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "cus_victim"})))
            .expect(0)
            .mount(&server)
            .await;

        let gw = gateway(&server);
        let update = IntentUpdate::amount(100);
        assert!(gw.update_intent("../customers/cus_victim", &update).await.is_err());

        let err = gw.cancel_intent("..").await.unwrap_err();
        assert!(matches!(err, ShopError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_network_failure() {
        let gw = StripeGateway::new(StripeConfig::new("sk_test_123").with_api_base_url("http://127.0.0.1:1"))
            .unwrap();
        let err = gw.retrieve_intent("pi_1").await.unwrap_err();
        assert!(matches!(err, ShopError::Network(_)));
        assert!(err.is_retryable());
    }
}
