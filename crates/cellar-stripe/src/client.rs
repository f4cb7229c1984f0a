//! # Stripe HTTP Client
//!
//! Thin request layer over the Stripe REST API: bearer auth, pinned API
//! version, form-encoded bodies and Stripe's error envelope.

use crate::config::StripeConfig;
use cellar_core::{ShopError, ShopResult};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error};

/// Form or query parameters in Stripe's bracket notation
pub type Params = Vec<(String, String)>;

/// The remote object a request addresses, reported on 404
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    pub resource: &'static str,
    pub id: &'a str,
}

impl<'a> Target<'a> {
    pub fn new(resource: &'static str, id: &'a str) -> Self {
        Self { resource, id }
    }
}

pub struct StripeClient {
    config: StripeConfig,
    http: Client,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> ShopResult<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ShopError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    /// `{base}/v1/{segments..}` with every segment percent-encoded on its
    /// own, so an id can never climb out of its resource path
    fn url(&self, segments: &[&str]) -> ShopResult<Url> {
        if let Some(bad) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
            return Err(ShopError::InvalidRequest(format!(
                "invalid Stripe object id {:?}",
                bad
            )));
        }

        let mut url = Url::parse(&self.config.api_base_url).map_err(|e| {
            ShopError::Configuration(format!("Invalid Stripe API base URL: {}", e))
        })?;
        url.path_segments_mut()
            .map_err(|_| ShopError::Configuration("Stripe API base URL has no path".to_string()))?
            .pop_if_empty()
            .push("v1")
            .extend(segments.iter());
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &[&str],
        query: &Params,
        target: Target<'_>,
    ) -> ShopResult<T> {
        let request = self.authorized(self.http.get(self.url(path)?)).query(query);
        self.send(request, target).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &[&str],
        form: &Params,
        idempotency_key: Option<&str>,
        target: Target<'_>,
    ) -> ShopResult<T> {
        let mut request = self.authorized(self.http.post(self.url(path)?)).form(form);
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }
        self.send(request, target).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        target: Target<'_>,
    ) -> ShopResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| ShopError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ShopError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(api_error(status, &body, target));
        }

        debug!("Stripe {} {} ok", target.resource, target.id);
        serde_json::from_str(&body).map_err(|e| {
            ShopError::Serialization(format!("Failed to parse Stripe {}: {}", target.resource, e))
        })
    }
}

/// Stripe list envelope
#[derive(Debug, Deserialize)]
pub struct List<T> {
    pub data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

fn api_error(status: StatusCode, body: &str, target: Target<'_>) -> ShopError {
    if status == StatusCode::NOT_FOUND {
        return ShopError::NotFound {
            resource: target.resource,
            id: target.id.to_string(),
        };
    }

    error!("Stripe API error: status={}, body={}", status, body);

    match serde_json::from_str::<StripeErrorResponse>(body) {
        Ok(parsed) => ShopError::Provider {
            message: parsed
                .error
                .message
                .unwrap_or_else(|| format!("HTTP {}", status)),
            code: parsed.error.code,
        },
        Err(_) => ShopError::Provider {
            message: format!("HTTP {}: {}", status, body),
            code: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> StripeClient {
        StripeClient::new(StripeConfig::new("sk_test_123").with_api_base_url(base)).unwrap()
    }

    #[test]
    fn test_url_encodes_each_segment() {
        let stripe = client("https://api.stripe.com");
        assert_eq!(
            stripe.url(&["payment_intents", "pi_1", "confirm"]).unwrap().as_str(),
            "https://api.stripe.com/v1/payment_intents/pi_1/confirm"
        );

        let url = stripe.url(&["payment_intents", "../customers/cus_x"]).unwrap();
        assert_eq!(url.path_segments().unwrap().count(), 3);
        assert!(url.path().starts_with("/v1/payment_intents/"));
        assert!(!url.path().contains("/customers/"));

        let local = client("http://127.0.0.1:9999/");
        assert_eq!(
            local.url(&["products"]).unwrap().as_str(),
            "http://127.0.0.1:9999/v1/products"
        );
    }

    #[test]
    fn test_url_rejects_dot_segments() {
        let stripe = client("https://api.stripe.com");
        for id in ["..", ".", ""] {
            let err = stripe.url(&["payment_intents", id]).unwrap_err();
            assert!(matches!(err, ShopError::InvalidRequest(_)), "{:?}", err);
        }
    }

    #[test]
    fn test_not_found_keeps_target() {
        let err = api_error(
            StatusCode::NOT_FOUND,
            r#"{"error":{"message":"No such product: 'prod_x'","code":"resource_missing"}}"#,
            Target::new("product", "prod_x"),
        );
        match err {
            ShopError::NotFound { resource, id } => {
                assert_eq!(resource, "product");
                assert_eq!(id, "prod_x");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_provider_error_envelope() {
        let err = api_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"Amount must be at least 50 cents","code":"amount_too_small","type":"invalid_request_error"}}"#,
            Target::new("payment_intent", ""),
        );
        match err {
            ShopError::Provider { message, code } => {
                assert_eq!(message, "Amount must be at least 50 cents");
                assert_eq!(code.as_deref(), Some("amount_too_small"));
            }
            other => panic!("unexpected: {:?}", other),
        }

        let err = api_error(StatusCode::BAD_GATEWAY, "upstream down", Target::new("price", ""));
        assert!(err.to_string().contains("502"));
    }
}
