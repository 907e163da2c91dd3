//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and the workflows handlers call
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::middleware;

use self::services::AppServices;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: Config) -> anyhow::Result<Router> {
    let services = Arc::new(services::build_services(&config).await?);
    Ok(router(services, config.body_limit_bytes))
}

/// Router over already-built services.
pub fn router(services: Arc<AppServices>, body_limit_bytes: usize) -> Router {
    let auth_state = middleware::AuthState {
        jwt: services.jwt.clone(),
    };

    // Protected routes: require a valid bearer token.
    let protected = routes::protected_router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .merge(routes::public_router())
        .merge(protected)
        .layer(Extension(services))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(body_limit_bytes)),
        )
}
