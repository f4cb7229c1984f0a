//! # Inventory Reader
//!
//! Catalog reads, cart totals and stock writes on top of a
//! [`PaymentGateway`].

use crate::cart::CartItem;
use crate::catalog::{ListQuery, Price, Product, Sku, STOCK_KEY};
use crate::config::StoreConfig;
use crate::error::{ShopError, ShopResult};
use crate::gateway::BoxedGateway;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Reads the wine catalog and keeps its stock entries current
#[derive(Clone)]
pub struct Inventory {
    gateway: BoxedGateway,
    config: Arc<StoreConfig>,
}

impl Inventory {
    pub fn new(gateway: BoxedGateway, config: Arc<StoreConfig>) -> Self {
        Self { gateway, config }
    }

    /// Active wines visible in the current environment
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> ShopResult<Vec<Product>> {
        let query = ListQuery::new(self.config.page_sizes.products).active(true);
        let products = self
            .gateway
            .list_products(&query)
            .await
            .map_err(|e| ShopError::remote("listing products", e))?;

        let visibility = self.config.environment.visibility();
        let total = products.len();
        let visible: Vec<Product> = products
            .into_iter()
            .filter(|p| visibility.admits(p))
            .collect();

        debug!("Listed {} products, {} visible ({:?})", total, visible.len(), visibility);
        Ok(visible)
    }

    pub async fn get_product(&self, id: &str) -> ShopResult<Product> {
        self.gateway.get_product(id).await
    }

    /// Prices of one product, or of the whole catalog when `product` is `None`
    #[instrument(skip(self))]
    pub async fn list_prices(&self, product: Option<&str>) -> ShopResult<Vec<Price>> {
        let mut query = ListQuery::new(self.config.page_sizes.prices);
        if let Some(product) = product {
            query = query.product(product);
        }
        self.gateway
            .list_prices(&query)
            .await
            .map_err(|e| ShopError::remote("listing prices", e))
    }

    pub async fn get_price(&self, id: &str) -> ShopResult<Price> {
        self.gateway.get_price(id).await
    }

    /// SKUs of a product. The default page size returns at most one.
    #[instrument(skip(self))]
    pub async fn list_skus(&self, product: &str) -> ShopResult<Vec<Sku>> {
        let query = ListQuery::new(self.config.page_sizes.skus).product(product);
        self.gateway
            .list_skus(&query)
            .await
            .map_err(|e| ShopError::remote("listing SKUs", e))
    }

    /// Σ first unit price × quantity over the cart.
    ///
    /// Fails as a whole if any lookup fails; no partial totals.
    #[instrument(skip(self, items), fields(lines = items.len()))]
    pub async fn compute_cart_total(&self, items: &[CartItem]) -> ShopResult<i64> {
        let mut total: i64 = 0;

        for item in items {
            let prices = self.list_prices(Some(&item.parent)).await?;
            let price = prices.first().ok_or_else(|| ShopError::RemoteLookup {
                operation: "pricing cart".to_string(),
                message: format!("no price found for product {}", item.parent),
            })?;

            let unit_amount = price.unit_amount.ok_or_else(|| ShopError::RemoteLookup {
                operation: "pricing cart".to_string(),
                message: format!("price {} of product {} has no unit amount", price.id, item.parent),
            })?;

            total = unit_amount
                .checked_mul(item.quantity)
                .and_then(|line| total.checked_add(line))
                .ok_or_else(|| ShopError::InvalidRequest("cart total overflows".to_string()))?;
        }

        debug!("Cart total: {}", total);
        Ok(total)
    }

    /// Overwrite the recorded stock of a product
    #[instrument(skip(self))]
    pub async fn update_stock(&self, product_id: &str, new_stock: i64) -> ShopResult<Product> {
        let product = self
            .gateway
            .update_product_metadata(product_id, STOCK_KEY, &new_stock.to_string())
            .await?;
        info!("Stock of {} set to {}", product_id, new_stock);
        Ok(product)
    }

    /// Subtract sold bottles from the recorded stock, never below zero.
    ///
    /// Returns the stock written.
    #[instrument(skip(self))]
    pub async fn decrement_stock(&self, product_id: &str, sold: i64) -> ShopResult<i64> {
        let product = self.gateway.get_product(product_id).await?;
        let remaining = product.stock()?.saturating_sub(sold).max(0);
        self.update_stock(product_id, remaining).await?;
        Ok(remaining)
    }
}
