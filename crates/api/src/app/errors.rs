use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use storefront_auth::{AuthzError, PasswordError, TokenError};
use storefront_cart::CartError;
use storefront_core::DomainError;
use storefront_infra::StoreError;

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Error returned by handlers; rendered with [`json_error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
    }

    pub fn forbidden(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, code, message)
    }

    pub fn unauthorized(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, code, message)
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        json_error(self.status, self.code, self.message)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => Self::new(StatusCode::BAD_REQUEST, "validation_error", msg),
            DomainError::InvalidId(msg) => Self::new(StatusCode::BAD_REQUEST, "invalid_id", msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::new(StatusCode::NOT_FOUND, "not_found", "not found"),
            StoreError::Conflict(msg) => Self::new(StatusCode::CONFLICT, "conflict", msg),
            StoreError::InvalidReference(msg) => Self::new(StatusCode::BAD_REQUEST, "invalid_reference", msg),
            StoreError::InsufficientStock(id) => Self::new(
                StatusCode::CONFLICT,
                "insufficient_stock",
                format!("insufficient stock for product {id}"),
            ),
            StoreError::Corrupt(msg) => {
                error!(error = %msg, "corrupt row");
                Self::internal("internal storage error")
            }
            StoreError::Database(e) => {
                error!(error = %e, "database error");
                Self::internal("internal storage error")
            }
        }
    }
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        let message = err.to_string();
        match err {
            CartError::InvalidQuantity(_) => Self::new(StatusCode::BAD_REQUEST, "invalid_quantity", message),
            CartError::NotInCart(_) => Self::new(StatusCode::NOT_FOUND, "not_in_cart", message),
            CartError::Unavailable(_) => Self::new(StatusCode::NOT_FOUND, "product_unavailable", message),
            CartError::InsufficientStock { .. } => Self::new(StatusCode::CONFLICT, "insufficient_stock", message),
            CartError::LineLimit => Self::new(StatusCode::UNPROCESSABLE_ENTITY, "line_limit", message),
            CartError::Overflow => Self::new(StatusCode::UNPROCESSABLE_ENTITY, "overflow", message),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        warn!(error = %err, "permission denied");
        Self::forbidden("forbidden", err.to_string())
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(msg) => {
                error!(error = %msg, "token signing failed");
                Self::internal("could not issue token")
            }
            other => Self::unauthorized("invalid_token", other.to_string()),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        error!(error = %err, "password hashing failed");
        Self::internal("could not process credentials")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::ProductId;

    #[test]
    fn store_failures_hide_details() {
        let err = ApiError::from(StoreError::Corrupt("users.role: nope".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("nope"));
    }

    #[test]
    fn cart_errors_map_to_client_statuses() {
        let id = ProductId::new();
        assert_eq!(ApiError::from(CartError::NotInCart(id)).status, StatusCode::NOT_FOUND);
        let err = ApiError::from(CartError::InsufficientStock {
            product_id: id,
            requested: 3,
            available: 1,
        });
        assert_eq!((err.status, err.code), (StatusCode::CONFLICT, "insufficient_stock"));
        assert_eq!(ApiError::from(CartError::LineLimit).code, "line_limit");
    }

    #[test]
    fn domain_validation_is_bad_request() {
        let err = ApiError::from(DomainError::validation("name cannot be empty"));
        assert_eq!((err.status, err.code), (StatusCode::BAD_REQUEST, "validation_error"));
    }
}
