use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::warn;

use storefront_auth::JwtValidator;

use crate::app::errors::json_error;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Verify the bearer token and attach a [`PrincipalContext`] to the request.
pub async fn auth_middleware(State(state): State<AuthState>, mut req: Request, next: Next) -> Response {
    let token = match extract_bearer(req.headers()) {
        Ok(token) => token,
        Err(reason) => {
            return json_error(StatusCode::UNAUTHORIZED, "unauthorized", reason);
        }
    };

    let claims = match state.jwt.validate(token, Utc::now()) {
        Ok(claims) => claims,
        Err(e) => {
            warn!(error = %e, path = %req.uri().path(), "rejected bearer token");
            return json_error(StatusCode::UNAUTHORIZED, "invalid_token", e.to_string());
        }
    };

    req.extensions_mut().insert(PrincipalContext::from(claims));
    next.run(req).await
}

/// Must run inside [`auth_middleware`].
pub async fn require_admin(req: Request, next: Next) -> Response {
    match req.extensions().get::<PrincipalContext>() {
        Some(principal) if principal.role().is_admin() => next.run(req).await,
        Some(principal) => {
            warn!(user_id = %principal.user_id(), path = %req.uri().path(), "admin route denied");
            json_error(StatusCode::FORBIDDEN, "forbidden", "admin role required")
        }
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, &'static str> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or("missing authorization header")?;

    let header = header.to_str().map_err(|_| "malformed authorization header")?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or("expected a bearer token")?
        .trim();
    if token.is_empty() {
        return Err("empty bearer token");
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use axum::http::header::AUTHORIZATION;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def")), Ok("abc.def"));
        assert_eq!(extract_bearer(&headers("Bearer   abc  ")), Ok("abc"));
        assert!(extract_bearer(&headers("Basic abc")).is_err());
        assert!(extract_bearer(&headers("Bearer ")).is_err());
        assert!(extract_bearer(&HeaderMap::new()).is_err());
    }
}
