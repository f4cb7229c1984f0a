//! # Cart Types
//!
//! What the storefront sends when it asks for a payment intent.

use crate::catalog::Product;
use crate::error::{ShopError, ShopResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One line of the shopping cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product id
    pub parent: String,

    /// Bottles requested. Kept signed so that zero or negative requests
    /// reach validation instead of failing deserialization.
    pub quantity: i64,
}

impl CartItem {
    pub fn new(parent: impl Into<String>, quantity: i64) -> Self {
        Self {
            parent: parent.into(),
            quantity,
        }
    }

    /// Check this line against the product's recorded stock.
    ///
    /// Order matters: an empty line is reported before the stock entry is
    /// even read.
    pub fn check_against(&self, product: &Product) -> ShopResult<()> {
        if self.quantity <= 0 {
            return Err(ShopError::NoBottlesSelected {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
            });
        }

        let available = product.stock()?;
        if self.quantity > available {
            return Err(ShopError::InsufficientStock {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                requested: self.quantity,
                available,
            });
        }

        Ok(())
    }
}

/// One line per product, in first-seen order.
///
/// Repeated lines are summed. An empty or negative line keeps its own
/// quantity for the merged line so it is still rejected as empty.
pub fn merge_lines(items: &[CartItem]) -> Vec<CartItem> {
    let mut merged: Vec<CartItem> = Vec::new();
    for item in items {
        match merged.iter_mut().find(|line| line.parent == item.parent) {
            Some(line) if line.quantity <= 0 => {}
            Some(line) if item.quantity <= 0 => line.quantity = item.quantity,
            Some(line) => line.quantity = line.quantity.saturating_add(item.quantity),
            None => merged.push(item.clone()),
        }
    }
    merged
}

/// Metadata map written on an intent: product id -> bottles
pub fn cart_metadata(items: &[CartItem]) -> HashMap<String, String> {
    merge_lines(items)
        .into_iter()
        .map(|line| (line.parent, line.quantity.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_accepts_within_stock() {
        let product = Product::new("prod_1", "Yenda").with_stock(6);
        assert!(CartItem::new("prod_1", 6).check_against(&product).is_ok());
        assert!(CartItem::new("prod_1", 1).check_against(&product).is_ok());
    }

    #[test]
    fn test_check_rejects_empty_line_first() {
        // no stock entry at all: the empty line still wins
        let product = Product::new("prod_1", "Yenda");
        let err = CartItem::new("prod_1", 0).check_against(&product).unwrap_err();
        match err {
            ShopError::NoBottlesSelected {
                product_id,
                product_name,
            } => {
                assert_eq!(product_id, "prod_1");
                assert_eq!(product_name, "Yenda");
            }
            other => panic!("unexpected: {:?}", other),
        }

        let err = CartItem::new("prod_1", -2).check_against(&product).unwrap_err();
        assert!(matches!(err, ShopError::NoBottlesSelected { .. }));
    }

    #[test]
    fn test_check_rejects_over_stock() {
        let product = Product::new("prod_1", "Godello").with_stock(5);
        let err = CartItem::new("prod_1", 7).check_against(&product).unwrap_err();
        match err {
            ShopError::InsufficientStock {
                product_id,
                requested,
                available,
                ..
            } => {
                assert_eq!(product_id, "prod_1");
                assert_eq!(requested, 7);
                assert_eq!(available, 5);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_merge_lines() {
        let merged = merge_lines(&[
            CartItem::new("prod_b", 1),
            CartItem::new("prod_a", 2),
            CartItem::new("prod_b", 4),
            CartItem::new("prod_a", 2),
        ]);
        assert_eq!(merged, vec![CartItem::new("prod_b", 5), CartItem::new("prod_a", 4)]);

        let merged = merge_lines(&[
            CartItem::new("prod_a", 3),
            CartItem::new("prod_a", 0),
            CartItem::new("prod_a", 2),
        ]);
        assert_eq!(merged, vec![CartItem::new("prod_a", 0)]);
    }

    #[test]
    fn test_cart_metadata_sums_duplicates() {
        let items = vec![
            CartItem::new("prod_a", 2),
            CartItem::new("prod_b", 1),
            CartItem::new("prod_a", 3),
        ];
        let meta = cart_metadata(&items);
        assert_eq!(meta.len(), 2);
        assert_eq!(meta["prod_a"], "5");
        assert_eq!(meta["prod_b"], "1");
    }
}
