use axum::{
    Router,
    routing::{get, post},
};

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod system;

/// Endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .merge(catalog::router())
}

/// Endpoints that need a valid bearer token. `/admin` additionally needs the admin role.
pub fn protected_router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/auth/me", get(auth::me))
        .nest("/cart", cart::router())
        .nest("/admin", admin::router())
}
