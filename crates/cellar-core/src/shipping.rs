//! # Shipping Options
//!
//! Static shipping tiers with flat fees. The table is defined locally and
//! never fetched from the provider.

use serde::{Deserialize, Serialize};

/// A named shipping tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingOption {
    pub id: String,
    pub label: String,
    pub detail: String,
    /// Fee in smallest currency unit
    pub amount: i64,
}

impl ShippingOption {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        detail: impl Into<String>,
        amount: i64,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            detail: detail.into(),
            amount,
        }
    }
}

/// Shipping options offered by the store (loadable from TOML)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingTable {
    pub options: Vec<ShippingOption>,
}

impl ShippingTable {
    /// Find an option by id
    pub fn get(&self, id: &str) -> Option<&ShippingOption> {
        self.options.iter().find(|o| o.id == id)
    }

    /// Flat fee of an option, `None` for unknown ids
    pub fn cost(&self, id: &str) -> Option<i64> {
        self.get(id).map(|o| o.amount)
    }

    /// Load the table from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

impl Default for ShippingTable {
    fn default() -> Self {
        Self {
            options: vec![
                ShippingOption::new("free", "Free Shipping", "Delivery within 5 days", 0),
                ShippingOption::new("express", "Express Shipping", "Next day delivery", 500),
            ],
        }
    }
}
