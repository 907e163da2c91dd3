//! Store wiring and the request-level workflows the handlers call.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use anyhow::Context;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use storefront_auth::{
    Hs256Jwt, JwtIssuer, NewUser, Role, User, UserProfile, hash_password, normalize_email, verify_password,
};
use storefront_cart::{Adjustment, Cart, CartAction, CartSummary};
use storefront_catalog::{
    Category, CategoryPatch, NewCategory, NewProduct, Product, ProductPatch, ProductQuery, ProductQueryParams,
};
use storefront_core::{CategoryId, Page, PageRequest, ProductId, UserId};
use storefront_infra::memory::{InMemoryCartStore, InMemoryCatalog, InMemoryUserStore};
use storefront_infra::postgres::{self, PostgresCartStore, PostgresCatalog, PostgresUserStore};
use storefront_infra::{CartStore, CategoryStore, ProductStore, StockReservation, StoreError, UserStore};

use crate::app::dto::{AdminStats, AuthResponse, CartView, Receipt};
use crate::app::errors::{ApiError, ApiResult};
use crate::config::{AdminSeed, Config};

pub struct AppServices {
    pub users: Arc<dyn UserStore>,
    pub categories: Arc<dyn CategoryStore>,
    pub products: Arc<dyn ProductStore>,
    pub carts: Arc<dyn CartStore>,
    pub jwt: Arc<Hs256Jwt>,
    pub low_stock_threshold: i32,
}

/// Outcome of a checkout attempt that did not fail outright.
#[derive(Debug)]
pub enum Checkout {
    Placed(Receipt),
    /// The cart no longer fit current stock; it was adjusted and saved instead.
    Adjusted { cart: CartView },
}

/// Build services from config. Persistent stores need `DATABASE_URL`.
pub async fn build_services(config: &Config) -> anyhow::Result<AppServices> {
    let jwt = Arc::new(Hs256Jwt::new(
        config.jwt_secret.as_bytes(),
        Duration::minutes(config.jwt_ttl_minutes),
    ));

    let services = if config.use_persistent_stores {
        let url = config
            .database_url
            .as_deref()
            .context("DATABASE_URL is required for persistent stores")?;
        let pool = postgres::connect(url, config.database_max_connections)
            .await
            .context("failed to connect to Postgres")?;
        postgres::migrations::run(&pool)
            .await
            .context("failed to apply schema migrations")?;
        info!("using Postgres stores");

        let catalog = Arc::new(PostgresCatalog::new(pool.clone()));
        AppServices {
            users: Arc::new(PostgresUserStore::new(pool.clone())),
            categories: catalog.clone(),
            products: catalog,
            carts: Arc::new(PostgresCartStore::new(pool)),
            jwt,
            low_stock_threshold: config.low_stock_threshold,
        }
    } else {
        info!("using in-memory stores");
        let catalog = Arc::new(InMemoryCatalog::new());
        AppServices {
            users: Arc::new(InMemoryUserStore::new()),
            categories: catalog.clone(),
            products: catalog,
            carts: Arc::new(InMemoryCartStore::new()),
            jwt,
            low_stock_threshold: config.low_stock_threshold,
        }
    };

    if let Some(seed) = &config.admin {
        services.seed_admin(seed).await?;
    }
    tokio::task::spawn_blocking(dummy_hash)
        .await
        .context("failed to prepare login hash")?;

    Ok(services)
}

async fn hash_blocking(password: String) -> ApiResult<String> {
    // Argon2 blocks; run it off the async workers.
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::internal(format!("hashing task failed: {e}")))?
        .map_err(ApiError::from)
}

static DUMMY_HASH: OnceLock<String> = OnceLock::new();

fn dummy_hash() -> &'static str {
    DUMMY_HASH.get_or_init(|| hash_password("no-such-account").unwrap_or_default())
}

/// Check `password` against `stored`, or against a throwaway hash when there is no account.
/// Either way it costs one Argon2 verify.
async fn verify_blocking(password: String, stored: Option<String>) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || match stored {
        Some(hash) => verify_password(&password, &hash),
        None => {
            let _ = verify_password(&password, dummy_hash());
            Ok(false)
        }
    })
    .await
    .map_err(|e| ApiError::internal(format!("verify task failed: {e}")))?
    .map_err(ApiError::from)
}

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("invalid_credentials", "invalid email or password")
}

impl AppServices {
    /// Create the configured admin, or promote an existing account with that email.
    pub async fn seed_admin(&self, seed: &AdminSeed) -> anyhow::Result<()> {
        let email = normalize_email(&seed.email).context("ADMIN_EMAIL is invalid")?;
        if let Some(existing) = self.users.find_by_email(&email).await? {
            if !existing.role.is_admin() {
                self.users.set_role(existing.id, Role::Admin, Utc::now()).await?;
                info!(user_id = %existing.id, "promoted seeded admin");
            }
            return Ok(());
        }

        let new_user = NewUser::validate(&email, &seed.password, "Administrator").context("ADMIN_PASSWORD is invalid")?;
        let hash = hash_blocking(new_user.password.clone())
            .await
            .map_err(|e| anyhow::anyhow!("failed to hash admin password: {}", e.message))?;
        let mut user = new_user.into_user(hash, Utc::now());
        user.role = Role::Admin;
        info!(user_id = %user.id, "seeded admin account");
        self.users.insert(user).await?;
        Ok(())
    }

    fn auth_response(&self, user: &User) -> ApiResult<AuthResponse> {
        let token = self.jwt.issue(user, Utc::now())?;
        Ok(AuthResponse {
            token,
            token_type: "Bearer",
            expires_in: self.jwt.ttl().num_seconds(),
            user: user.profile(),
        })
    }

    // -------------------------
    // Accounts
    // -------------------------

    pub async fn register(&self, email: &str, password: &str, name: &str) -> ApiResult<AuthResponse> {
        let new_user = NewUser::validate(email, password, name)?;
        if self.users.find_by_email(&new_user.email).await?.is_some() {
            return Err(ApiError::new(StatusCode::CONFLICT, "email_taken", "email is already registered"));
        }

        let hash = hash_blocking(new_user.password.clone()).await?;
        let user = new_user.into_user(hash, Utc::now());
        match self.users.insert(user.clone()).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => {
                return Err(ApiError::new(StatusCode::CONFLICT, "email_taken", "email is already registered"));
            }
            Err(e) => return Err(e.into()),
        }
        info!(user_id = %user.id, "user registered");
        self.auth_response(&user)
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<AuthResponse> {
        let email = normalize_email(email).map_err(|_| invalid_credentials())?;
        let Some(user) = self.users.find_by_email(&email).await? else {
            verify_blocking(password.to_string(), None).await?;
            warn!("login for unknown email");
            return Err(invalid_credentials());
        };

        let verified = verify_blocking(password.to_string(), Some(user.password_hash.clone())).await?;
        if !verified {
            warn!(user_id = %user.id, "login with wrong password");
            return Err(invalid_credentials());
        }
        self.auth_response(&user)
    }

    pub async fn profile(&self, user_id: UserId) -> ApiResult<UserProfile> {
        match self.users.get(user_id).await? {
            Some(user) => Ok(user.profile()),
            None => Err(ApiError::unauthorized("unauthorized", "account no longer exists")),
        }
    }

    pub async fn list_users(&self, page: PageRequest) -> ApiResult<Page<UserProfile>> {
        Ok(self.users.list(page).await?.map(|u| u.profile()))
    }

    pub async fn change_role(&self, actor: UserId, target: UserId, role: Role) -> ApiResult<UserProfile> {
        if actor == target {
            return Err(ApiError::forbidden("self_role_change", "admins cannot change their own role"));
        }
        let user = self.users.set_role(target, role, Utc::now()).await?;
        info!(actor = %actor, user_id = %target, role = %role, "role changed");
        Ok(user.profile())
    }

    // -------------------------
    // Catalog
    // -------------------------

    pub async fn list_categories(&self) -> ApiResult<Vec<Category>> {
        Ok(self.categories.list().await?)
    }

    pub async fn category_by_slug(&self, slug: &str) -> ApiResult<Category> {
        self.categories
            .get_by_slug(&slug.to_lowercase())
            .await?
            .ok_or_else(|| ApiError::not_found("category"))
    }

    pub async fn create_category(&self, body: NewCategory) -> ApiResult<Category> {
        let category = body.into_category(Utc::now())?;
        self.categories.insert(category.clone()).await?;
        info!(category_id = %category.id, slug = %category.slug, "category created");
        Ok(category)
    }

    pub async fn update_category(&self, id: CategoryId, patch: CategoryPatch) -> ApiResult<Category> {
        let current = self
            .categories
            .get(id)
            .await?
            .ok_or_else(|| ApiError::not_found("category"))?;
        let next = patch.apply(&current, Utc::now())?;
        self.categories.update(next.clone()).await?;
        info!(category_id = %id, "category updated");
        Ok(next)
    }

    pub async fn delete_category(&self, id: CategoryId) -> ApiResult<()> {
        self.categories.delete(id).await.map_err(|e| match e {
            StoreError::NotFound => ApiError::not_found("category"),
            StoreError::Conflict(msg) => ApiError::new(StatusCode::CONFLICT, "category_in_use", msg),
            other => other.into(),
        })?;
        info!(category_id = %id, "category deleted");
        Ok(())
    }

    /// Look a product up by UUID or slug. Inactive products are hidden unless `include_inactive`.
    pub async fn find_product(&self, id_or_slug: &str, include_inactive: bool) -> ApiResult<Product> {
        let found = match id_or_slug.parse::<ProductId>() {
            Ok(id) => self.products.get(id).await?,
            Err(_) => self.products.get_by_slug(&id_or_slug.to_lowercase()).await?,
        };
        found
            .filter(|p| include_inactive || p.active)
            .ok_or_else(|| ApiError::not_found("product"))
    }

    pub async fn search_products(&self, params: ProductQueryParams, include_inactive: bool) -> ApiResult<Page<Product>> {
        let query = ProductQuery::try_from(params)?;
        let category_id = match &query.category_slug {
            None => None,
            Some(slug) => match self.categories.get_by_slug(slug).await? {
                Some(category) => Some(category.id),
                None => return Ok(Page::empty(query.page)),
            },
        };
        let filter = query.filter(category_id, include_inactive);
        Ok(self.products.search(&filter, query.sort, query.page).await?)
    }

    pub async fn create_product(&self, body: NewProduct) -> ApiResult<Product> {
        let product = body.into_product(Utc::now())?;
        self.products.insert(product.clone()).await?;
        info!(product_id = %product.id, slug = %product.slug, "product created");
        Ok(product)
    }

    pub async fn update_product(&self, id: ProductId, patch: ProductPatch) -> ApiResult<Product> {
        let current = self
            .products
            .get(id)
            .await?
            .ok_or_else(|| ApiError::not_found("product"))?;
        let next = patch.apply(&current, Utc::now())?;
        self.products.update(next.clone()).await?;
        info!(product_id = %id, "product updated");
        Ok(next)
    }

    pub async fn delete_product(&self, id: ProductId) -> ApiResult<()> {
        self.products.delete(id).await.map_err(|e| match e {
            StoreError::NotFound => ApiError::not_found("product"),
            other => other.into(),
        })?;
        info!(product_id = %id, "product deleted");
        Ok(())
    }

    pub async fn stats(&self) -> ApiResult<AdminStats> {
        let products = self.products.stats(self.low_stock_threshold).await?;
        Ok(AdminStats {
            users: self.users.count().await?,
            products: products.products,
            active_products: products.active_products,
            categories: self.categories.count().await?,
            low_stock: products.low_stock,
            inventory_value_cents: products.inventory_value_cents,
        })
    }

    // -------------------------
    // Cart
    // -------------------------

    /// Load the cart with a catalog snapshot covering its lines plus `extra`.
    async fn load_cart(&self, user_id: UserId, extra: Option<ProductId>) -> ApiResult<(Cart, HashMap<ProductId, Product>)> {
        let cart = self.carts.load(user_id).await?;
        let mut ids = cart.product_ids();
        if let Some(id) = extra {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        let catalog = self.products.get_many(&ids).await?;
        Ok((cart, catalog))
    }

    fn view(cart: &Cart, catalog: &HashMap<ProductId, Product>, adjustments: Vec<Adjustment>) -> ApiResult<CartView> {
        Ok(CartView {
            summary: CartSummary::price(cart, catalog)?,
            adjustments,
        })
    }

    pub async fn cart(&self, user_id: UserId) -> ApiResult<CartView> {
        let (mut cart, catalog) = self.load_cart(user_id, None).await?;
        let adjustments = cart.reconcile(&catalog);
        if !adjustments.is_empty() {
            info!(user_id = %user_id, adjusted = adjustments.len(), "cart reconciled against stock");
            self.carts.save(user_id, &cart).await?;
        }
        Self::view(&cart, &catalog, adjustments)
    }

    /// Reconcile, apply one action, save. Nothing is saved if the action is rejected
    /// and the cart needed no adjustment.
    pub async fn apply_cart_action(&self, user_id: UserId, action: CartAction) -> ApiResult<CartView> {
        let target = match &action {
            CartAction::Add { product_id, .. }
            | CartAction::SetQuantity { product_id, .. }
            | CartAction::Remove { product_id } => Some(*product_id),
            CartAction::Clear => None,
        };
        let (mut cart, catalog) = self.load_cart(user_id, target).await?;
        let adjustments = cart.reconcile(&catalog);

        if let Err(e) = cart.apply(action, &catalog) {
            if !adjustments.is_empty() {
                self.carts.save(user_id, &cart).await?;
            }
            return Err(e.into());
        }
        self.carts.save(user_id, &cart).await?;
        Self::view(&cart, &catalog, adjustments)
    }

    pub async fn checkout(&self, user_id: UserId) -> ApiResult<Checkout> {
        let (mut cart, catalog) = self.load_cart(user_id, None).await?;
        if cart.is_empty() {
            return Err(ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "empty_cart", "cart is empty"));
        }

        let adjustments = cart.reconcile(&catalog);
        if !adjustments.is_empty() {
            self.carts.save(user_id, &cart).await?;
            warn!(user_id = %user_id, adjusted = adjustments.len(), "checkout blocked by stock changes");
            return Ok(Checkout::Adjusted {
                cart: Self::view(&cart, &catalog, adjustments)?,
            });
        }

        let summary = CartSummary::price(&cart, &catalog)?;
        let reservations: Vec<StockReservation> = cart
            .lines()
            .iter()
            .map(|line| StockReservation {
                product_id: line.product_id,
                quantity: line.quantity,
            })
            .collect();
        self.products.reserve_stock(&reservations).await?;
        self.carts.save(user_id, &Cart::new()).await?;

        let receipt = Receipt {
            order_ref: format!("ord_{}", Uuid::now_v7().simple()),
            lines: summary.lines,
            subtotal_cents: summary.subtotal_cents,
            placed_at: Utc::now(),
        };
        info!(
            user_id = %user_id,
            order_ref = %receipt.order_ref,
            subtotal_cents = receipt.subtotal_cents,
            "checkout placed"
        );
        Ok(Checkout::Placed(receipt))
    }
}
