use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};

use storefront_auth::permissions::{CART_READ, CART_WRITE, CHECKOUT};
use storefront_cart::CartAction;
use storefront_core::ProductId;

use crate::app::dto::{AddCartItemRequest, CartView, JsonBody, SetQuantityRequest};
use crate::app::errors::ApiResult;
use crate::app::services::{AppServices, Checkout};
use crate::authz::authorize_permission;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_cart).delete(clear_cart))
        .route("/items", post(add_item))
        .route("/items/:product_id", patch(set_quantity).delete(remove_item))
        .route("/checkout", post(checkout))
}

pub async fn get_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Json<CartView>> {
    authorize_permission(&principal, &CART_READ)?;
    Ok(Json(services.cart(principal.user_id()).await?))
}

pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<AddCartItemRequest>,
) -> ApiResult<Json<CartView>> {
    authorize_permission(&principal, &CART_WRITE)?;
    let action = CartAction::Add {
        product_id: body.product_id,
        quantity: body.quantity,
    };
    Ok(Json(services.apply_cart_action(principal.user_id(), action).await?))
}

pub async fn set_quantity(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(product_id): Path<String>,
    JsonBody(body): JsonBody<SetQuantityRequest>,
) -> ApiResult<Json<CartView>> {
    authorize_permission(&principal, &CART_WRITE)?;
    let action = CartAction::SetQuantity {
        product_id: product_id.parse::<ProductId>()?,
        quantity: body.quantity,
    };
    Ok(Json(services.apply_cart_action(principal.user_id(), action).await?))
}

pub async fn remove_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<CartView>> {
    authorize_permission(&principal, &CART_WRITE)?;
    let action = CartAction::Remove {
        product_id: product_id.parse::<ProductId>()?,
    };
    Ok(Json(services.apply_cart_action(principal.user_id(), action).await?))
}

pub async fn clear_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Json<CartView>> {
    authorize_permission(&principal, &CART_WRITE)?;
    Ok(Json(services.apply_cart_action(principal.user_id(), CartAction::Clear).await?))
}

pub async fn checkout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Response> {
    authorize_permission(&principal, &CHECKOUT)?;
    let response = match services.checkout(principal.user_id()).await? {
        Checkout::Placed(receipt) => (StatusCode::CREATED, Json(receipt)).into_response(),
        Checkout::Adjusted { cart } => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "error": "cart_adjusted",
                "message": "cart changed to match current stock; review and retry",
                "adjustments": cart.adjustments,
                "cart": cart.summary,
            })),
        )
            .into_response(),
    };
    Ok(response)
}
