//! Store traits consumed by the API layer.
//!
//! Every trait has an in-memory implementation (dev/test) and a Postgres
//! implementation. Both must agree on filtering, ordering and conflict rules.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use storefront_auth::{Role, User};
use storefront_cart::Cart;
use storefront_catalog::{Category, Product, ProductFilter, ProductSort};
use storefront_core::{CategoryId, Page, PageRequest, ProductId, UserId};

use crate::StoreResult;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// `Conflict` when the email is taken.
    async fn insert(&self, user: User) -> StoreResult<()>;
    async fn get(&self, id: UserId) -> StoreResult<Option<User>>;
    /// `email` must already be normalized.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// Oldest first.
    async fn list(&self, page: PageRequest) -> StoreResult<Page<User>>;
    async fn set_role(&self, id: UserId, role: Role, now: DateTime<Utc>) -> StoreResult<User>;
    async fn count(&self) -> StoreResult<u64>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// `Conflict` on duplicate slug.
    async fn insert(&self, category: Category) -> StoreResult<()>;
    /// `NotFound` if absent, `Conflict` on duplicate slug.
    async fn update(&self, category: Category) -> StoreResult<()>;
    /// `Conflict` while any product references the category.
    async fn delete(&self, id: CategoryId) -> StoreResult<()>;
    async fn get(&self, id: CategoryId) -> StoreResult<Option<Category>>;
    async fn get_by_slug(&self, slug: &str) -> StoreResult<Option<Category>>;
    /// Ordered by name.
    async fn list(&self) -> StoreResult<Vec<Category>>;
    async fn count(&self) -> StoreResult<u64>;
}

/// One line of an all-or-nothing stock decrement.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StockReservation {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductStats {
    pub products: u64,
    pub active_products: u64,
    /// Sum of price × stock over active products.
    pub inventory_value_cents: i64,
    /// Active products at or below the threshold, lowest stock first.
    pub low_stock: Vec<Product>,
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// `Conflict` on duplicate slug, `InvalidReference` for an unknown category.
    async fn insert(&self, product: Product) -> StoreResult<()>;
    async fn update(&self, product: Product) -> StoreResult<()>;
    async fn delete(&self, id: ProductId) -> StoreResult<()>;
    async fn get(&self, id: ProductId) -> StoreResult<Option<Product>>;
    async fn get_by_slug(&self, slug: &str) -> StoreResult<Option<Product>>;
    /// Missing ids are simply absent from the map.
    async fn get_many(&self, ids: &[ProductId]) -> StoreResult<HashMap<ProductId, Product>>;
    async fn search(&self, filter: &ProductFilter, sort: ProductSort, page: PageRequest) -> StoreResult<Page<Product>>;
    /// Decrement stock for every line or for none. `InsufficientStock` names
    /// the first line that could not be satisfied.
    async fn reserve_stock(&self, lines: &[StockReservation]) -> StoreResult<()>;
    async fn stats(&self, low_stock_threshold: i32) -> StoreResult<ProductStats>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    /// An unknown user has an empty cart.
    async fn load(&self, user_id: UserId) -> StoreResult<Cart>;
    /// Replace the stored cart wholesale.
    async fn save(&self, user_id: UserId, cart: &Cart) -> StoreResult<()>;
}
