use axum::{Extension, Json, http::StatusCode, response::IntoResponse};

use storefront_auth::role_permissions;

use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Echo the token's identity without touching the user store.
pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": principal.user_id().to_string(),
        "email": principal.email(),
        "role": principal.role().as_str(),
        "permissions": role_permissions(principal.role())
            .iter()
            .map(|p| p.as_str().to_string())
            .collect::<Vec<_>>(),
    }))
}
