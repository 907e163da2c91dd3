//! Shopping cart domain.
//!
//! A cart is a plain reducer: [`Cart::apply`] takes an action and a view of
//! current stock and either commits the whole transition or rejects it.

pub mod cart;
pub mod stock;
pub mod summary;

pub use cart::{Adjustment, AdjustmentKind, Cart, CartAction, CartError, CartLine, MAX_LINE_QUANTITY};
pub use stock::StockView;
pub use summary::{CartSummary, PricedLine};
