//! # Catalog Types
//!
//! Products, prices and SKUs as the payment provider's catalog returns them.
//! The provider owns these records; the storefront only reads them and, after
//! a sale, rewrites the stock entry in a product's metadata.

use crate::error::{ShopError, ShopResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata key holding the remaining bottles of a product (decimal string)
pub const STOCK_KEY: &str = "quantity";

/// ISO 4217 currency code, stored lowercase the way the provider expects it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Parse a three-letter currency code (case-insensitive)
    pub fn parse(code: &str) -> ShopResult<Self> {
        let code = code.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ShopError::InvalidRequest(format!(
                "invalid currency code: {:?}",
                code
            )));
        }
        Ok(Self(code.to_ascii_lowercase()))
    }

    /// Returns the lowercase ISO 4217 code
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency("eur".to_string())
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_uppercase())
    }
}

impl TryFrom<String> for Currency {
    type Error = ShopError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Currency::parse(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

/// A wine in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Provider product id (e.g. "prod_...")
    pub id: String,

    /// Display name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether the product is available for purchase
    #[serde(default = "default_true")]
    pub active: bool,

    /// True when the record belongs to the provider's live mode
    #[serde(default)]
    pub livemode: bool,

    #[serde(default)]
    pub images: Vec<String>,

    /// Stock and display attributes
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

fn default_true() -> bool {
    true
}

impl Product {
    /// Create an active test-mode product with no metadata
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            active: true,
            livemode: false,
            images: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Builder: set the recorded stock
    pub fn with_stock(mut self, stock: i64) -> Self {
        self.metadata.insert(STOCK_KEY.to_string(), stock.to_string());
        self
    }

    /// Builder: add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Builder: mark as a live-mode record
    pub fn live(mut self) -> Self {
        self.livemode = true;
        self
    }

    /// Remaining bottles recorded in metadata.
    ///
    /// Fails with `InvalidStock` when the entry is missing or not an integer.
    pub fn stock(&self) -> ShopResult<i64> {
        let raw = self.metadata.get(STOCK_KEY);
        raw.and_then(|v| v.trim().parse::<i64>().ok())
            .ok_or_else(|| ShopError::InvalidStock {
                product_id: self.id.clone(),
                value: raw.cloned(),
            })
    }

    /// Typed view over the display metadata
    pub fn wine_metadata(&self) -> WineMetadata {
        WineMetadata::from_map(&self.metadata)
    }
}

/// Display attributes the storefront keeps in product metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WineMetadata {
    pub barrel: String,
    pub brand_image: String,
    pub capacity: String,
    pub cellar: String,
    #[serde(rename = "cellarURL")]
    pub cellar_url: String,
    pub color: String,
    pub cork: String,
    #[serde(rename = "do")]
    pub designation: String,
    pub do_image: String,
    pub graduation: String,
    pub grape: String,
    pub placeholder_image: String,
    pub path: String,
    pub quantity: String,
    #[serde(rename = "where")]
    pub region: String,
}

impl WineMetadata {
    /// Pick the known keys out of a raw metadata map; unknown keys are ignored
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).cloned().unwrap_or_default();
        Self {
            barrel: get("barrel"),
            brand_image: get("brandImage"),
            capacity: get("capacity"),
            cellar: get("cellar"),
            cellar_url: get("cellarURL"),
            color: get("color"),
            cork: get("cork"),
            designation: get("do"),
            do_image: get("doImage"),
            graduation: get("graduation"),
            grape: get("grape"),
            placeholder_image: get("placeholderImage"),
            path: get("path"),
            quantity: get(STOCK_KEY),
            region: get("where"),
        }
    }
}

/// A unit price attached to a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub id: String,

    /// Id of the product this price belongs to
    pub product: String,

    /// Amount in smallest currency unit (cents for EUR). Tiered and
    /// custom prices carry none.
    #[serde(default)]
    pub unit_amount: Option<i64>,

    pub currency: Currency,

    #[serde(default = "default_true")]
    pub active: bool,
}

impl Price {
    pub fn new(
        id: impl Into<String>,
        product: impl Into<String>,
        unit_amount: i64,
        currency: Currency,
    ) -> Self {
        Self {
            id: id.into(),
            product: product.into(),
            unit_amount: Some(unit_amount),
            currency,
            active: true,
        }
    }
}

/// Stock keeping unit of a product (legacy provider object)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sku {
    pub id: String,
    pub product: String,
    #[serde(default)]
    pub price: i64,
    pub currency: Currency,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Parameters for a catalog listing call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListQuery {
    /// Page size sent to the provider
    pub limit: u8,
    /// Only return records with this `active` flag
    pub active: Option<bool>,
    /// Only return records belonging to this product
    pub product: Option<String>,
}

impl ListQuery {
    pub fn new(limit: u8) -> Self {
        Self {
            limit,
            active: None,
            product: None,
        }
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    pub fn product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }
}

/// Which catalog records are visible in a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Only test-mode records
    TestOnly,
    /// Only live-mode records
    LiveOnly,
    /// Everything the provider returns
    All,
}

impl Visibility {
    pub fn admits(&self, product: &Product) -> bool {
        match self {
            Visibility::TestOnly => !product.livemode,
            Visibility::LiveOnly => product.livemode,
            Visibility::All => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_parse() {
        let eur = Currency::parse("EUR").unwrap();
        assert_eq!(eur.as_str(), "eur");
        assert_eq!(eur.to_string(), "EUR");

        assert!(Currency::parse("euro").is_err());
        assert!(Currency::parse("e1r").is_err());
    }

    #[test]
    fn test_currency_serde() {
        let price: Price = serde_json::from_str(
            r#"{"id":"price_1","product":"prod_1","unit_amount":1250,"currency":"EUR"}"#,
        )
        .unwrap();
        assert_eq!(price.currency.as_str(), "eur");
        assert!(price.active);

        let bad = serde_json::from_str::<Price>(
            r#"{"id":"price_1","product":"prod_1","unit_amount":1,"currency":"??"}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_product_stock() {
        let product = Product::new("prod_1", "Yenda").with_stock(12);
        assert_eq!(product.stock().unwrap(), 12);

        let missing = Product::new("prod_2", "Sel d'Aiz");
        match missing.stock() {
            Err(ShopError::InvalidStock { product_id, value }) => {
                assert_eq!(product_id, "prod_2");
                assert_eq!(value, None);
            }
            other => panic!("unexpected: {:?}", other),
        }

        let garbage = Product::new("prod_3", "Godello").with_metadata(STOCK_KEY, "lots");
        assert!(matches!(
            garbage.stock(),
            Err(ShopError::InvalidStock { value: Some(ref v), .. }) if v == "lots"
        ));
    }

    #[test]
    fn test_wine_metadata_view() {
        let product = Product::new("prod_1", "Albariño")
            .with_stock(4)
            .with_metadata("grape", "albariño")
            .with_metadata("do", "Rías Baixas")
            .with_metadata("cellarURL", "https://example.com")
            .with_metadata("unrelated", "x");

        let meta = product.wine_metadata();
        assert_eq!(meta.quantity, "4");
        assert_eq!(meta.grape, "albariño");
        assert_eq!(meta.designation, "Rías Baixas");
        assert_eq!(meta.cellar_url, "https://example.com");
        assert_eq!(meta.barrel, "");

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["do"], "Rías Baixas");
        assert_eq!(json["cellarURL"], "https://example.com");
    }

    #[test]
    fn test_visibility() {
        let test_wine = Product::new("prod_t", "Test");
        let live_wine = Product::new("prod_l", "Live").live();

        assert!(Visibility::TestOnly.admits(&test_wine));
        assert!(!Visibility::TestOnly.admits(&live_wine));
        assert!(Visibility::LiveOnly.admits(&live_wine));
        assert!(!Visibility::LiveOnly.admits(&test_wine));
        assert!(Visibility::All.admits(&test_wine));
    }

    #[test]
    fn test_list_query_builder() {
        let query = ListQuery::new(3).active(true).product("prod_1");
        assert_eq!(query.limit, 3);
        assert_eq!(query.active, Some(true));
        assert_eq!(query.product.as_deref(), Some("prod_1"));
    }
}
