//! # Customer Registrar
//!
//! Turns the checkout form into a provider customer.

use crate::customer::{Customer, CustomerInput};
use crate::error::{ShopError, ShopResult};
use crate::gateway::BoxedGateway;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct CustomerRegistrar {
    gateway: BoxedGateway,
}

impl CustomerRegistrar {
    pub fn new(gateway: BoxedGateway) -> Self {
        Self { gateway }
    }

    /// Register a customer from the checkout form.
    ///
    /// No deduplication: submitting the same form twice creates two records.
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: &CustomerInput) -> ShopResult<Customer> {
        if input.email.trim().is_empty() {
            return Err(ShopError::InvalidRequest("email is required".to_string()));
        }

        let customer = self.gateway.create_customer(&input.to_new_customer()).await?;
        info!(
            "Created customer {} (consent: {})",
            customer.id,
            customer.has_consent()
        );
        Ok(customer)
    }
}
