//! # Customer Types
//!
//! Customer record as the checkout form submits it, and the provider-side
//! parameter shapes it maps onto.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata key marking data-protection consent
pub const CONSENT_KEY: &str = "lgpd";

/// Postal address from the checkout form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub city: String,
    pub country: String,
    pub postal_code: String,
    pub province: String,
    pub street: String,
}

/// Body of `POST /customers`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub company: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Data-protection consent
    #[serde(default)]
    pub lgpd: bool,
    /// Spanish tax id (NIF/CIF)
    #[serde(default)]
    pub nif_cif: String,
    #[serde(default)]
    pub phone: String,
}

impl CustomerInput {
    /// Full name as sent to the provider
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Map the form onto the provider's customer-creation shape.
    ///
    /// Locale-specific fields go into metadata; the consent key is only
    /// present when consent was given.
    pub fn to_new_customer(&self) -> NewCustomer {
        let name = self.full_name();
        let address = PostalAddress {
            line1: self.address.street.clone(),
            postal_code: self.address.postal_code.clone(),
            state: self.address.province.clone(),
            city: self.address.city.clone(),
            country: self.address.country.clone(),
        };

        let mut metadata = HashMap::from([
            ("nifCif".to_string(), self.nif_cif.clone()),
            ("company".to_string(), self.company.clone()),
        ]);
        if self.lgpd {
            metadata.insert(CONSENT_KEY.to_string(), "true".to_string());
        }

        NewCustomer {
            name: name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            shipping: ShippingDetails {
                address: address.clone(),
                name,
                phone: self.phone.clone(),
            },
            address,
            metadata,
        }
    }
}

/// Address in the provider's field naming
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalAddress {
    pub line1: String,
    pub postal_code: String,
    pub state: String,
    pub city: String,
    pub country: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub address: PostalAddress,
    pub name: String,
    pub phone: String,
}

/// Parameters for the provider's customer-creation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: PostalAddress,
    pub shipping: ShippingDetails,
    pub metadata: HashMap<String, String>,
}

/// A customer as the provider returns it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<PostalAddress>,
    #[serde(default)]
    pub shipping: Option<ShippingDetails>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Customer {
    /// True when the consent marker is set
    pub fn has_consent(&self) -> bool {
        self.metadata.get(CONSENT_KEY).map(|v| v == "true").unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(lgpd: bool) -> CustomerInput {
        serde_json::from_value(json!({
            "address": {
                "city": "Vigo",
                "country": "ES",
                "postalCode": "36201",
                "province": "Pontevedra",
                "street": "Rúa do Príncipe 1"
            },
            "company": "Adega SL",
            "email": "ana@example.com",
            "firstName": "Ana",
            "lastName": "Souto",
            "lgpd": lgpd,
            "nifCif": "B12345678",
            "phone": "+34 600 000 000"
        }))
        .unwrap()
    }

    #[test]
    fn test_maps_address_and_shipping() {
        let params = input(true).to_new_customer();

        assert_eq!(params.name, "Ana Souto");
        assert_eq!(params.address.line1, "Rúa do Príncipe 1");
        assert_eq!(params.address.state, "Pontevedra");
        assert_eq!(params.address.postal_code, "36201");
        assert_eq!(params.shipping.address, params.address);
        assert_eq!(params.shipping.name, "Ana Souto");
        assert_eq!(params.shipping.phone, "+34 600 000 000");
        assert_eq!(params.metadata["nifCif"], "B12345678");
        assert_eq!(params.metadata["company"], "Adega SL");
    }

    #[test]
    fn test_consent_marker() {
        let with = input(true).to_new_customer();
        assert_eq!(with.metadata.get(CONSENT_KEY).map(String::as_str), Some("true"));

        let without = input(false).to_new_customer();
        assert!(!without.metadata.contains_key(CONSENT_KEY));
    }

    #[test]
    fn test_full_name_trims_missing_parts() {
        let customer = CustomerInput {
            first_name: "Ana".into(),
            email: "ana@example.com".into(),
            ..Default::default()
        };
        assert_eq!(customer.full_name(), "Ana");
    }
}
