use std::collections::HashMap;

use serde::Serialize;

use storefront_catalog::Product;
use storefront_core::ProductId;

use crate::{Cart, CartError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub name: String,
    pub slug: String,
    pub image_url: Option<String>,
    pub unit_price_cents: i64,
    pub quantity: u32,
    pub line_total_cents: i64,
    pub available_stock: i32,
}

/// Cart lines joined with current catalog prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    pub lines: Vec<PricedLine>,
    pub item_count: u32,
    pub subtotal_cents: i64,
}

impl CartSummary {
    /// Every line must have a catalog entry; reconcile the cart first.
    pub fn price(cart: &Cart, catalog: &HashMap<ProductId, Product>) -> Result<Self, CartError> {
        let mut lines = Vec::with_capacity(cart.lines().len());
        let mut subtotal: i64 = 0;

        for line in cart.lines() {
            let product = catalog
                .get(&line.product_id)
                .ok_or(CartError::Unavailable(line.product_id))?;
            let line_total = product
                .price_cents
                .checked_mul(i64::from(line.quantity))
                .ok_or(CartError::Overflow)?;
            subtotal = subtotal.checked_add(line_total).ok_or(CartError::Overflow)?;
            lines.push(PricedLine {
                product_id: product.id,
                name: product.name.clone(),
                slug: product.slug.clone(),
                image_url: product.image_url.clone(),
                unit_price_cents: product.price_cents,
                quantity: line.quantity,
                line_total_cents: line_total,
                available_stock: product.stock,
            });
        }

        Ok(Self {
            lines,
            item_count: cart.item_count(),
            subtotal_cents: subtotal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CartLine;
    use chrono::Utc;

    fn product(price_cents: i64, stock: i32) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(),
            name: "Mug".into(),
            slug: "mug".into(),
            description: None,
            price_cents,
            stock,
            category_id: None,
            image_url: None,
            featured: false,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn catalog(products: &[Product]) -> HashMap<ProductId, Product> {
        products.iter().map(|p| (p.id, p.clone())).collect()
    }

    #[test]
    fn totals_lines_and_subtotal() {
        let (a, b) = (product(1250, 9), product(399, 9));
        let cart = Cart::from_lines([
            CartLine { product_id: a.id, quantity: 2 },
            CartLine { product_id: b.id, quantity: 3 },
        ]);
        let summary = CartSummary::price(&cart, &catalog(&[a.clone(), b])).unwrap();
        assert_eq!(summary.lines[0].line_total_cents, 2500);
        assert_eq!(summary.lines[1].line_total_cents, 1197);
        assert_eq!(summary.subtotal_cents, 3697);
        assert_eq!(summary.item_count, 5);
        assert_eq!(summary.lines[0].product_id, a.id);
    }

    #[test]
    fn empty_cart_prices_to_zero() {
        let summary = CartSummary::price(&Cart::new(), &HashMap::new()).unwrap();
        assert!(summary.lines.is_empty());
        assert_eq!(summary.subtotal_cents, 0);
    }

    #[test]
    fn missing_product_and_overflow() {
        let p = product(i64::MAX, 9);
        let cart = Cart::from_lines([CartLine { product_id: p.id, quantity: 2 }]);
        assert_eq!(CartSummary::price(&cart, &HashMap::new()), Err(CartError::Unavailable(p.id)));
        assert_eq!(CartSummary::price(&cart, &catalog(&[p])), Err(CartError::Overflow));
    }
}
