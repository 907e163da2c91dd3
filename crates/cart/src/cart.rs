use serde::{Deserialize, Serialize};
use thiserror::Error;

use storefront_core::ProductId;

use crate::StockView;

/// Upper bound for a single line, independent of stock.
pub const MAX_LINE_QUANTITY: u32 = 99;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    /// Always >= 1 for a stored line.
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// Merge into an existing line or append a new one.
    Add { product_id: ProductId, quantity: i64 },
    /// `0` removes the line.
    SetQuantity { product_id: ProductId, quantity: i64 },
    Remove { product_id: ProductId },
    Clear,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("product {0} is not in the cart")]
    NotInCart(ProductId),

    #[error("product {0} is not available")]
    Unavailable(ProductId),

    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    #[error("at most {MAX_LINE_QUANTITY} units of one product per cart")]
    LineLimit,

    #[error("cart total overflows")]
    Overflow,
}

/// A change made by [`Cart::reconcile`] to fit the cart to current stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Adjustment {
    pub product_id: ProductId,
    #[serde(flatten)]
    pub kind: AdjustmentKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "adjustment", rename_all = "snake_case")]
pub enum AdjustmentKind {
    Clamped { from: u32, to: u32 },
    Removed { from: u32 },
}

/// Ordered set of cart lines, at most one per product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted lines: duplicates merge, zero quantities drop.
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            if line.quantity == 0 {
                continue;
            }
            match cart.position(&line.product_id) {
                Some(i) => {
                    let merged = cart.lines[i].quantity.saturating_add(line.quantity);
                    cart.lines[i].quantity = merged.min(MAX_LINE_QUANTITY);
                }
                None => cart.lines.push(CartLine {
                    quantity: line.quantity.min(MAX_LINE_QUANTITY),
                    ..line
                }),
            }
        }
        cart
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.position(product_id).map(|i| self.lines[i].quantity).unwrap_or(0)
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn product_ids(&self) -> Vec<ProductId> {
        self.lines.iter().map(|l| l.product_id).collect()
    }

    /// Apply one action. On error the cart is unchanged.
    pub fn apply(&mut self, action: CartAction, stock: &impl StockView) -> Result<(), CartError> {
        match action {
            CartAction::Add { product_id, quantity } => {
                if quantity < 1 {
                    return Err(CartError::InvalidQuantity("quantity must be at least 1".into()));
                }
                let current = self.quantity_of(&product_id);
                let requested = u32::try_from(quantity)
                    .ok()
                    .and_then(|q| q.checked_add(current))
                    .ok_or(CartError::LineLimit)?;
                let requested = Self::check_line(product_id, requested, stock)?;
                match self.position(&product_id) {
                    Some(i) => self.lines[i].quantity = requested,
                    None => self.lines.push(CartLine { product_id, quantity: requested }),
                }
                Ok(())
            }
            CartAction::SetQuantity { product_id, quantity } => {
                if quantity < 0 {
                    return Err(CartError::InvalidQuantity("quantity cannot be negative".into()));
                }
                let i = self.position(&product_id).ok_or(CartError::NotInCart(product_id))?;
                if quantity == 0 {
                    self.lines.remove(i);
                    return Ok(());
                }
                let requested = u32::try_from(quantity).map_err(|_| CartError::LineLimit)?;
                self.lines[i].quantity = Self::check_line(product_id, requested, stock)?;
                Ok(())
            }
            CartAction::Remove { product_id } => {
                let i = self.position(&product_id).ok_or(CartError::NotInCart(product_id))?;
                self.lines.remove(i);
                Ok(())
            }
            CartAction::Clear => {
                self.lines.clear();
                Ok(())
            }
        }
    }

    /// Fit every line to current stock. Lines for unavailable or sold-out
    /// products are dropped; others are clamped down.
    pub fn reconcile(&mut self, stock: &impl StockView) -> Vec<Adjustment> {
        let mut adjustments = Vec::new();
        self.lines.retain_mut(|line| {
            let cap = stock.available(&line.product_id).unwrap_or(0).min(MAX_LINE_QUANTITY);
            if cap == 0 {
                adjustments.push(Adjustment {
                    product_id: line.product_id,
                    kind: AdjustmentKind::Removed { from: line.quantity },
                });
                return false;
            }
            if line.quantity > cap {
                adjustments.push(Adjustment {
                    product_id: line.product_id,
                    kind: AdjustmentKind::Clamped { from: line.quantity, to: cap },
                });
                line.quantity = cap;
            }
            true
        });
        adjustments
    }

    fn position(&self, product_id: &ProductId) -> Option<usize> {
        self.lines.iter().position(|l| &l.product_id == product_id)
    }

    fn check_line(product_id: ProductId, requested: u32, stock: &impl StockView) -> Result<u32, CartError> {
        let available = stock.available(&product_id).ok_or(CartError::Unavailable(product_id))?;
        if requested > MAX_LINE_QUANTITY {
            return Err(CartError::LineLimit);
        }
        if requested > available {
            return Err(CartError::InsufficientStock {
                product_id,
                requested,
                available,
            });
        }
        Ok(requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn stock(entries: &[(ProductId, u32)]) -> HashMap<ProductId, u32> {
        entries.iter().copied().collect()
    }

    #[test]
    fn add_merges_and_respects_stock() {
        let p = ProductId::new();
        let s = stock(&[(p, 5)]);
        let mut cart = Cart::new();

        cart.apply(CartAction::Add { product_id: p, quantity: 2 }, &s).unwrap();
        cart.apply(CartAction::Add { product_id: p, quantity: 3 }, &s).unwrap();
        assert_eq!(cart.quantity_of(&p), 5);
        assert_eq!(cart.lines().len(), 1);

        let err = cart.apply(CartAction::Add { product_id: p, quantity: 1 }, &s).unwrap_err();
        assert_eq!(
            err,
            CartError::InsufficientStock { product_id: p, requested: 6, available: 5 }
        );
        assert_eq!(cart.quantity_of(&p), 5, "rejected action leaves cart unchanged");
    }

    #[test]
    fn add_rejects_non_positive_and_unavailable() {
        let p = ProductId::new();
        let s = stock(&[(p, 5)]);
        let mut cart = Cart::new();
        assert!(matches!(
            cart.apply(CartAction::Add { product_id: p, quantity: 0 }, &s),
            Err(CartError::InvalidQuantity(_))
        ));

        let gone = ProductId::new();
        assert_eq!(
            cart.apply(CartAction::Add { product_id: gone, quantity: 1 }, &s),
            Err(CartError::Unavailable(gone))
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn line_limit_applies_even_with_plenty_of_stock() {
        let p = ProductId::new();
        let s = stock(&[(p, 10_000)]);
        let mut cart = Cart::new();
        assert_eq!(
            cart.apply(CartAction::Add { product_id: p, quantity: 100 }, &s),
            Err(CartError::LineLimit)
        );
        assert_eq!(
            cart.apply(CartAction::Add { product_id: p, quantity: i64::MAX }, &s),
            Err(CartError::LineLimit)
        );
    }

    #[test]
    fn set_quantity_and_remove() {
        let (a, b) = (ProductId::new(), ProductId::new());
        let s = stock(&[(a, 3), (b, 3)]);
        let mut cart = Cart::new();
        cart.apply(CartAction::Add { product_id: a, quantity: 1 }, &s).unwrap();
        cart.apply(CartAction::Add { product_id: b, quantity: 1 }, &s).unwrap();

        cart.apply(CartAction::SetQuantity { product_id: a, quantity: 3 }, &s).unwrap();
        assert_eq!(cart.quantity_of(&a), 3);
        assert!(cart.apply(CartAction::SetQuantity { product_id: a, quantity: 4 }, &s).is_err());
        assert!(cart.apply(CartAction::SetQuantity { product_id: a, quantity: -1 }, &s).is_err());

        cart.apply(CartAction::SetQuantity { product_id: a, quantity: 0 }, &s).unwrap();
        assert_eq!(cart.product_ids(), vec![b]);

        let missing = ProductId::new();
        assert_eq!(
            cart.apply(CartAction::SetQuantity { product_id: missing, quantity: 1 }, &s),
            Err(CartError::NotInCart(missing))
        );
        assert_eq!(
            cart.apply(CartAction::Remove { product_id: a }, &s),
            Err(CartError::NotInCart(a))
        );
        cart.apply(CartAction::Remove { product_id: b }, &s).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn clear_empties_cart() {
        let p = ProductId::new();
        let s = stock(&[(p, 3)]);
        let mut cart = Cart::new();
        cart.apply(CartAction::Add { product_id: p, quantity: 2 }, &s).unwrap();
        cart.apply(CartAction::Clear, &s).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.item_count(), 0);
    }

    #[test]
    fn reconcile_clamps_and_drops() {
        let (a, b, c) = (ProductId::new(), ProductId::new(), ProductId::new());
        let mut cart = Cart::from_lines([
            CartLine { product_id: a, quantity: 5 },
            CartLine { product_id: b, quantity: 2 },
            CartLine { product_id: c, quantity: 1 },
        ]);
        let s = stock(&[(a, 3), (b, 0)]);

        let adjustments = cart.reconcile(&s);
        assert_eq!(
            adjustments,
            vec![
                Adjustment { product_id: a, kind: AdjustmentKind::Clamped { from: 5, to: 3 } },
                Adjustment { product_id: b, kind: AdjustmentKind::Removed { from: 2 } },
                Adjustment { product_id: c, kind: AdjustmentKind::Removed { from: 1 } },
            ]
        );
        assert_eq!(cart.lines(), &[CartLine { product_id: a, quantity: 3 }]);
        assert!(cart.reconcile(&s).is_empty(), "reconcile is idempotent");
    }

    #[test]
    fn from_lines_merges_duplicates_and_drops_zeroes() {
        let (a, b) = (ProductId::new(), ProductId::new());
        let cart = Cart::from_lines([
            CartLine { product_id: a, quantity: 2 },
            CartLine { product_id: b, quantity: 0 },
            CartLine { product_id: a, quantity: 3 },
        ]);
        assert_eq!(cart.lines(), &[CartLine { product_id: a, quantity: 5 }]);
    }

    #[test]
    fn adjustment_json_shape() {
        let p = ProductId::new();
        let json = serde_json::to_value(Adjustment {
            product_id: p,
            kind: AdjustmentKind::Clamped { from: 4, to: 2 },
        })
        .unwrap();
        assert_eq!(json["adjustment"], "clamped");
        assert_eq!(json["from"], 4);
        assert_eq!(json["to"], 2);
        assert_eq!(json["product_id"], p.to_string());
    }

    fn action_for(kind: u8, product_id: ProductId, quantity: i64) -> CartAction {
        match kind {
            0 => CartAction::Add { product_id, quantity },
            1 => CartAction::SetQuantity { product_id, quantity },
            2 => CartAction::Remove { product_id },
            _ => CartAction::Clear,
        }
    }

    proptest! {
        #[test]
        fn lines_never_exceed_stock_or_hit_zero(
            stocks in proptest::collection::vec(0u32..6, 3),
            script in proptest::collection::vec((0u8..4, 0usize..3, -2i64..8), 0..40),
        ) {
            let ids: Vec<ProductId> = (0..3).map(|_| ProductId::new()).collect();
            let view: HashMap<ProductId, u32> = ids.iter().copied().zip(stocks.iter().copied()).collect();

            let mut cart = Cart::new();
            for (kind, idx, quantity) in script {
                let before = cart.clone();
                if cart.apply(action_for(kind, ids[idx], quantity), &view).is_err() {
                    prop_assert_eq!(&cart, &before);
                }
                for line in cart.lines() {
                    prop_assert!(line.quantity >= 1);
                    prop_assert!(line.quantity <= view[&line.product_id]);
                }
                let mut seen = std::collections::HashSet::new();
                prop_assert!(cart.lines().iter().all(|l| seen.insert(l.product_id)));
            }
        }
    }
}
