//! Public catalog reads. Only active products are visible here.

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    routing::get,
};

use storefront_catalog::{Category, Product, ProductQueryParams};
use storefront_core::Page;

use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/categories/:slug", get(get_category))
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
}

pub async fn list_categories(Extension(services): Extension<Arc<AppServices>>) -> ApiResult<Json<serde_json::Value>> {
    let items = services.list_categories().await?;
    Ok(Json(serde_json::json!({ "items": items })))
}

pub async fn get_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Category>> {
    Ok(Json(services.category_by_slug(&slug).await?))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<ProductQueryParams>,
) -> ApiResult<Json<Page<Product>>> {
    Ok(Json(services.search_products(params, false).await?))
}

/// `:id` is a product UUID or slug.
pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    Ok(Json(services.find_product(&id, false).await?))
}
