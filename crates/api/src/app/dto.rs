use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use storefront_auth::UserProfile;
use storefront_cart::{Adjustment, CartSummary, PricedLine};
use storefront_catalog::Product;
use storefront_core::{DomainError, PageRequest, ProductId};

use crate::app::errors::ApiError;

/// `Json<T>` whose rejection renders through [`ApiError`].
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::new(rejection.status(), "invalid_body", rejection.body_text()))?;
        Ok(Self(value))
    }
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AddCartItemRequest {
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: i64,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

/// Raw `?page=&limit=`; parsed like the product query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl TryFrom<PageParams> for PageRequest {
    type Error = DomainError;

    fn try_from(params: PageParams) -> Result<Self, Self::Error> {
        let parse = |key: &str, raw: Option<String>| -> Result<Option<u32>, DomainError> {
            raw.map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(|v| {
                    v.parse::<u32>()
                        .map_err(|_| DomainError::validation(format!("{key} must be a non-negative integer")))
                })
                .transpose()
        };
        Ok(PageRequest::new(parse("page", params.page)?, parse("limit", params.limit)?))
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub token_type: &'static str,
    /// Seconds until the token expires.
    pub expires_in: i64,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct CartView {
    #[serde(flatten)]
    pub summary: CartSummary,
    pub adjustments: Vec<Adjustment>,
}

/// Checkout stub receipt. Nothing about the order is persisted.
#[derive(Debug, Serialize)]
pub struct Receipt {
    pub order_ref: String,
    pub lines: Vec<PricedLine>,
    pub subtotal_cents: i64,
    pub placed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AdminStats {
    pub users: u64,
    pub products: u64,
    pub active_products: u64,
    pub categories: u64,
    pub low_stock: Vec<Product>,
    pub inventory_value_cents: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_params_parse_and_clamp() {
        let req = PageRequest::try_from(PageParams {
            page: Some("3".into()),
            limit: Some("500".into()),
        })
        .unwrap();
        assert_eq!((req.page(), req.limit()), (3, 100));

        assert!(PageRequest::try_from(PageParams {
            page: Some("-1".into()),
            limit: None,
        })
        .is_err());
        assert_eq!(PageRequest::try_from(PageParams::default()).unwrap(), PageRequest::default());
    }

    #[test]
    fn add_item_quantity_defaults_to_one() {
        let id = ProductId::new();
        let req: AddCartItemRequest = serde_json::from_value(serde_json::json!({ "product_id": id })).unwrap();
        assert_eq!(req.quantity, 1);
        assert_eq!(req.product_id, id);
    }
}
