use std::sync::Arc;

use axum::{Extension, Json, http::StatusCode, response::IntoResponse};

use storefront_auth::UserProfile;
use storefront_auth::permissions::PROFILE_READ;

use crate::app::dto::{JsonBody, LoginRequest, RegisterRequest};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::authz::authorize_permission;
use crate::context::PrincipalContext;

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let auth = services.register(&body.email, &body.password, &body.name).await?;
    Ok((StatusCode::CREATED, Json(auth)))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let auth = services.login(&body.email, &body.password).await?;
    Ok(Json(auth))
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Json<UserProfile>> {
    authorize_permission(&principal, &PROFILE_READ)?;
    Ok(Json(services.profile(principal.user_id()).await?))
}
