use std::collections::HashMap;

use storefront_catalog::Product;
use storefront_core::ProductId;

/// Point-in-time stock lookup used to bound cart quantities.
///
/// `None` means the product cannot be carted at all (deleted or inactive).
pub trait StockView {
    fn available(&self, product_id: &ProductId) -> Option<u32>;
}

impl StockView for HashMap<ProductId, Product> {
    fn available(&self, product_id: &ProductId) -> Option<u32> {
        self.get(product_id)
            .filter(|p| p.active)
            .map(|p| u32::try_from(p.stock).unwrap_or(0))
    }
}

impl StockView for HashMap<ProductId, u32> {
    fn available(&self, product_id: &ProductId) -> Option<u32> {
        self.get(product_id).copied()
    }
}
