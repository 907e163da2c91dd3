//! Admin dashboard endpoints. Mounted behind `require_admin`.

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};

use storefront_auth::permissions::{CATALOG_MANAGE, STATS_READ, USERS_MANAGE};
use storefront_auth::{Role, UserProfile};
use storefront_catalog::{Category, CategoryPatch, NewCategory, NewProduct, Product, ProductPatch, ProductQueryParams};
use storefront_core::{CategoryId, Page, PageRequest, ProductId, UserId};

use crate::app::dto::{AdminStats, JsonBody, PageParams, SetRoleRequest};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::authz::authorize_permission;
use crate::context::PrincipalContext;
use crate::middleware::require_admin;

pub fn router() -> Router {
    Router::new()
        .route("/stats", get(stats))
        .route("/users", get(list_users))
        .route("/users/:id/role", patch(set_role))
        .route("/products", get(list_products).post(create_product))
        .route("/products/:id", patch(update_product).delete(delete_product))
        .route("/categories", post(create_category))
        .route("/categories/:id", patch(update_category).delete(delete_category))
        .layer(axum::middleware::from_fn(require_admin))
}

pub async fn stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Json<AdminStats>> {
    authorize_permission(&principal, &STATS_READ)?;
    Ok(Json(services.stats().await?))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<UserProfile>>> {
    authorize_permission(&principal, &USERS_MANAGE)?;
    let page = PageRequest::try_from(params)?;
    Ok(Json(services.list_users(page).await?))
}

pub async fn set_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<SetRoleRequest>,
) -> ApiResult<Json<UserProfile>> {
    authorize_permission(&principal, &USERS_MANAGE)?;
    let target = id.parse::<UserId>()?;
    let role = body.role.parse::<Role>()?;
    Ok(Json(services.change_role(principal.user_id(), target, role).await?))
}

/// Same query as the public listing, including inactive products.
pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(params): Query<ProductQueryParams>,
) -> ApiResult<Json<Page<Product>>> {
    authorize_permission(&principal, &CATALOG_MANAGE)?;
    Ok(Json(services.search_products(params, true).await?))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<NewProduct>,
) -> ApiResult<impl IntoResponse> {
    authorize_permission(&principal, &CATALOG_MANAGE)?;
    let product = services.create_product(body).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<ProductPatch>,
) -> ApiResult<Json<Product>> {
    authorize_permission(&principal, &CATALOG_MANAGE)?;
    let id = id.parse::<ProductId>()?;
    Ok(Json(services.update_product(id, patch).await?))
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    authorize_permission(&principal, &CATALOG_MANAGE)?;
    services.delete_product(id.parse::<ProductId>()?).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<NewCategory>,
) -> ApiResult<impl IntoResponse> {
    authorize_permission(&principal, &CATALOG_MANAGE)?;
    let category = services.create_category(body).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<CategoryPatch>,
) -> ApiResult<Json<Category>> {
    authorize_permission(&principal, &CATALOG_MANAGE)?;
    let id = id.parse::<CategoryId>()?;
    Ok(Json(services.update_category(id, patch).await?))
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    authorize_permission(&principal, &CATALOG_MANAGE)?;
    services.delete_category(id.parse::<CategoryId>()?).await?;
    Ok(StatusCode::NO_CONTENT)
}
