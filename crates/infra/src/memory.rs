//! In-memory stores for tests/dev.
//!
//! State sits behind `std::sync::RwLock`; no lock is held across an await.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use storefront_auth::{Role, User};
use storefront_cart::{Cart, CartLine};
use storefront_catalog::{Category, Product, ProductFilter, ProductSort};
use storefront_core::{CategoryId, Page, PageRequest, ProductId, UserId};

use crate::store::{CartStore, CategoryStore, ProductStats, ProductStore, StockReservation, UserStore};
use crate::{StoreError, StoreResult};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    inner: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: User) -> StoreResult<()> {
        let mut map = write(&self.inner);
        if map.values().any(|u| u.email == user.email) {
            return Err(StoreError::conflict("email is already registered"));
        }
        map.insert(user.id, user);
        Ok(())
    }

    async fn get(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(read(&self.inner).get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(read(&self.inner).values().find(|u| u.email == email).cloned())
    }

    async fn list(&self, page: PageRequest) -> StoreResult<Page<User>> {
        let map = read(&self.inner);
        let mut users: Vec<&User> = map.values().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        let total = users.len() as u64;
        let items = users
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit() as usize)
            .cloned()
            .collect();
        Ok(Page::new(items, page, total))
    }

    async fn set_role(&self, id: UserId, role: Role, now: DateTime<Utc>) -> StoreResult<User> {
        let mut map = write(&self.inner);
        let user = map.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.role = role;
        user.updated_at = now;
        Ok(user.clone())
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(read(&self.inner).len() as u64)
    }
}

#[derive(Debug, Default)]
struct CatalogState {
    categories: HashMap<CategoryId, Category>,
    products: HashMap<ProductId, Product>,
}

impl CatalogState {
    fn check_product(&self, product: &Product) -> StoreResult<()> {
        if self
            .products
            .values()
            .any(|p| p.slug == product.slug && p.id != product.id)
        {
            return Err(StoreError::conflict(format!("product slug '{}' is taken", product.slug)));
        }
        if let Some(category_id) = product.category_id {
            if !self.categories.contains_key(&category_id) {
                return Err(StoreError::InvalidReference(format!("category {category_id} does not exist")));
            }
        }
        Ok(())
    }

    fn check_category(&self, category: &Category) -> StoreResult<()> {
        if self
            .categories
            .values()
            .any(|c| c.slug == category.slug && c.id != category.id)
        {
            return Err(StoreError::conflict(format!("category slug '{}' is taken", category.slug)));
        }
        Ok(())
    }
}

/// Categories and products share one lock so referential checks are atomic.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    inner: RwLock<CatalogState>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CategoryStore for InMemoryCatalog {
    async fn insert(&self, category: Category) -> StoreResult<()> {
        let mut state = write(&self.inner);
        state.check_category(&category)?;
        state.categories.insert(category.id, category);
        Ok(())
    }

    async fn update(&self, category: Category) -> StoreResult<()> {
        let mut state = write(&self.inner);
        if !state.categories.contains_key(&category.id) {
            return Err(StoreError::NotFound);
        }
        state.check_category(&category)?;
        state.categories.insert(category.id, category);
        Ok(())
    }

    async fn delete(&self, id: CategoryId) -> StoreResult<()> {
        let mut state = write(&self.inner);
        if !state.categories.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        if state.products.values().any(|p| p.category_id == Some(id)) {
            return Err(StoreError::conflict("category still has products"));
        }
        state.categories.remove(&id);
        Ok(())
    }

    async fn get(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        Ok(read(&self.inner).categories.get(&id).cloned())
    }

    async fn get_by_slug(&self, slug: &str) -> StoreResult<Option<Category>> {
        Ok(read(&self.inner).categories.values().find(|c| c.slug == slug).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<Category>> {
        let mut categories: Vec<Category> = read(&self.inner).categories.values().cloned().collect();
        categories.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(categories)
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(read(&self.inner).categories.len() as u64)
    }
}

#[async_trait]
impl ProductStore for InMemoryCatalog {
    async fn insert(&self, product: Product) -> StoreResult<()> {
        let mut state = write(&self.inner);
        state.check_product(&product)?;
        state.products.insert(product.id, product);
        Ok(())
    }

    async fn update(&self, product: Product) -> StoreResult<()> {
        let mut state = write(&self.inner);
        if !state.products.contains_key(&product.id) {
            return Err(StoreError::NotFound);
        }
        state.check_product(&product)?;
        state.products.insert(product.id, product);
        Ok(())
    }

    async fn delete(&self, id: ProductId) -> StoreResult<()> {
        write(&self.inner)
            .products
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn get(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(read(&self.inner).products.get(&id).cloned())
    }

    async fn get_by_slug(&self, slug: &str) -> StoreResult<Option<Product>> {
        Ok(read(&self.inner).products.values().find(|p| p.slug == slug).cloned())
    }

    async fn get_many(&self, ids: &[ProductId]) -> StoreResult<HashMap<ProductId, Product>> {
        let state = read(&self.inner);
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id).map(|p| (*id, p.clone())))
            .collect())
    }

    async fn search(&self, filter: &ProductFilter, sort: ProductSort, page: PageRequest) -> StoreResult<Page<Product>> {
        Ok(filter.select(read(&self.inner).products.values(), sort, page))
    }

    async fn reserve_stock(&self, lines: &[StockReservation]) -> StoreResult<()> {
        let mut state = write(&self.inner);
        for line in lines {
            let ok = state.products.get(&line.product_id).is_some_and(|p| {
                p.active && i64::from(p.stock) >= i64::from(line.quantity)
            });
            if !ok {
                return Err(StoreError::InsufficientStock(line.product_id));
            }
        }
        let now = Utc::now();
        for line in lines {
            if let Some(p) = state.products.get_mut(&line.product_id) {
                // Checked above: quantity <= stock <= i32::MAX.
                p.stock -= line.quantity as i32;
                p.updated_at = now;
            }
        }
        Ok(())
    }

    async fn stats(&self, low_stock_threshold: i32) -> StoreResult<ProductStats> {
        let state = read(&self.inner);
        let active: Vec<&Product> = state.products.values().filter(|p| p.active).collect();
        let inventory_value_cents = active.iter().fold(0i64, |acc, p| {
            acc.saturating_add(p.price_cents.saturating_mul(i64::from(p.stock)))
        });
        let mut low_stock: Vec<Product> = active
            .iter()
            .filter(|p| p.stock <= low_stock_threshold)
            .map(|p| (*p).clone())
            .collect();
        low_stock.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.id.cmp(&b.id)));
        Ok(ProductStats {
            products: state.products.len() as u64,
            active_products: active.len() as u64,
            inventory_value_cents,
            low_stock,
        })
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    inner: RwLock<HashMap<UserId, Vec<CartLine>>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn load(&self, user_id: UserId) -> StoreResult<Cart> {
        let lines = read(&self.inner).get(&user_id).cloned().unwrap_or_default();
        Ok(Cart::from_lines(lines))
    }

    async fn save(&self, user_id: UserId, cart: &Cart) -> StoreResult<()> {
        let mut map = write(&self.inner);
        if cart.is_empty() {
            map.remove(&user_id);
        } else {
            map.insert(user_id, cart.lines().to_vec());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_catalog::{NewCategory, NewProduct};

    fn category(name: &str) -> Category {
        NewCategory {
            name: name.into(),
            ..Default::default()
        }
        .into_category(Utc::now())
        .unwrap()
    }

    fn product(name: &str, price_cents: i64, stock: i32, category_id: Option<CategoryId>) -> Product {
        NewProduct {
            name: name.into(),
            slug: None,
            description: None,
            price_cents,
            stock,
            category_id,
            image_url: None,
            featured: false,
            active: true,
        }
        .into_product(Utc::now())
        .unwrap()
    }

    #[tokio::test]
    async fn slug_conflicts_and_category_references() {
        let catalog = InMemoryCatalog::new();
        let shoes = category("Shoes");
        CategoryStore::insert(&catalog, shoes.clone()).await.unwrap();
        assert!(matches!(
            CategoryStore::insert(&catalog, category("Shoes")).await,
            Err(StoreError::Conflict(_))
        ));

        let p = product("Runner", 5000, 2, Some(shoes.id));
        ProductStore::insert(&catalog, p.clone()).await.unwrap();
        assert!(matches!(
            ProductStore::insert(&catalog, product("Runner", 10, 1, None)).await,
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(
            ProductStore::insert(&catalog, product("Orphan", 10, 1, Some(CategoryId::new()))).await,
            Err(StoreError::InvalidReference(_))
        ));

        assert!(matches!(
            CategoryStore::delete(&catalog, shoes.id).await,
            Err(StoreError::Conflict(_))
        ));
        ProductStore::delete(&catalog, p.id).await.unwrap();
        CategoryStore::delete(&catalog, shoes.id).await.unwrap();
        assert!(matches!(
            CategoryStore::delete(&catalog, shoes.id).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn reserve_stock_is_all_or_nothing() {
        let catalog = InMemoryCatalog::new();
        let a = product("A", 100, 5, None);
        let b = product("B", 100, 1, None);
        ProductStore::insert(&catalog, a.clone()).await.unwrap();
        ProductStore::insert(&catalog, b.clone()).await.unwrap();

        let err = catalog
            .reserve_stock(&[
                StockReservation { product_id: a.id, quantity: 2 },
                StockReservation { product_id: b.id, quantity: 2 },
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InsufficientStock(id) if id == b.id));
        assert_eq!(ProductStore::get(&catalog, a.id).await.unwrap().unwrap().stock, 5);

        catalog
            .reserve_stock(&[
                StockReservation { product_id: a.id, quantity: 2 },
                StockReservation { product_id: b.id, quantity: 1 },
            ])
            .await
            .unwrap();
        assert_eq!(ProductStore::get(&catalog, a.id).await.unwrap().unwrap().stock, 3);
        assert_eq!(ProductStore::get(&catalog, b.id).await.unwrap().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn stats_cover_active_products_only() {
        let catalog = InMemoryCatalog::new();
        let mut hidden = product("Hidden", 1000, 1, None);
        hidden.active = false;
        ProductStore::insert(&catalog, hidden).await.unwrap();
        ProductStore::insert(&catalog, product("Low", 250, 2, None)).await.unwrap();
        ProductStore::insert(&catalog, product("Plenty", 100, 50, None)).await.unwrap();

        let stats = catalog.stats(5).await.unwrap();
        assert_eq!(stats.products, 3);
        assert_eq!(stats.active_products, 2);
        assert_eq!(stats.inventory_value_cents, 250 * 2 + 100 * 50);
        let low: Vec<_> = stats.low_stock.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(low, ["Low"]);
    }

    #[tokio::test]
    async fn users_unique_by_email_and_role_updates() {
        let users = InMemoryUserStore::new();
        let user = storefront_auth::NewUser::validate("a@b.io", "longenough", "Ann")
            .unwrap()
            .into_user("hash".into(), Utc::now());
        users.insert(user.clone()).await.unwrap();

        let dup = storefront_auth::NewUser::validate("A@B.io", "longenough", "Other")
            .unwrap()
            .into_user("hash".into(), Utc::now());
        assert!(matches!(users.insert(dup).await, Err(StoreError::Conflict(_))));

        let promoted = users.set_role(user.id, Role::Admin, Utc::now()).await.unwrap();
        assert_eq!(promoted.role, Role::Admin);
        assert!(matches!(
            users.set_role(UserId::new(), Role::Admin, Utc::now()).await,
            Err(StoreError::NotFound)
        ));
        assert_eq!(users.list(PageRequest::default()).await.unwrap().pagination.total, 1);
    }

    #[tokio::test]
    async fn empty_cart_save_removes_entry() {
        let carts = InMemoryCartStore::new();
        let user = UserId::new();
        let cart = Cart::from_lines([CartLine { product_id: ProductId::new(), quantity: 2 }]);
        carts.save(user, &cart).await.unwrap();
        assert_eq!(carts.load(user).await.unwrap(), cart);

        carts.save(user, &Cart::new()).await.unwrap();
        assert!(carts.load(user).await.unwrap().is_empty());
        assert!(carts.load(UserId::new()).await.unwrap().is_empty());
    }
}
