use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{CategoryId, DomainError, ProductId};

use crate::category::normalize_description;
use crate::slug::{resolve_slug, validate_slug};

pub const MAX_PRODUCT_NAME_LEN: usize = 120;
pub const MAX_IMAGE_URL_LEN: usize = 2_048;

/// Catalog product.
///
/// Prices are integer minor units (cents). Stock is never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unique across products.
    pub slug: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock: i32,
    pub category_id: Option<CategoryId>,
    pub image_url: Option<String>,
    pub featured: bool,
    /// Inactive products are hidden from public reads and cannot be carted.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub stock: i32,
    pub category_id: Option<CategoryId>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl NewProduct {
    pub fn into_product(self, now: DateTime<Utc>) -> Result<Product, DomainError> {
        let name = validate_name(&self.name)?;
        let slug = resolve_slug(self.slug.as_deref(), &name)?;
        Ok(Product {
            id: ProductId::new(),
            name,
            slug,
            description: normalize_description(self.description)?,
            price_cents: validate_price(self.price_cents)?,
            stock: validate_stock(self.stock)?,
            category_id: self.category_id,
            image_url: validate_image_url(self.image_url)?,
            featured: self.featured,
            active: self.active,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update. `category_id`, `image_url` and `description` accept `null` to clear.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "crate::nullable::deserialize")]
    pub description: Option<Option<String>>,
    pub price_cents: Option<i64>,
    pub stock: Option<i32>,
    #[serde(default, deserialize_with = "crate::nullable::deserialize")]
    pub category_id: Option<Option<CategoryId>>,
    #[serde(default, deserialize_with = "crate::nullable::deserialize")]
    pub image_url: Option<Option<String>>,
    pub featured: Option<bool>,
    pub active: Option<bool>,
}

impl ProductPatch {
    /// Returns the updated product; `current` is left untouched.
    ///
    /// Renaming keeps the existing slug unless a new one is supplied.
    pub fn apply(self, current: &Product, now: DateTime<Utc>) -> Result<Product, DomainError> {
        let mut next = current.clone();
        if let Some(name) = self.name {
            next.name = validate_name(&name)?;
        }
        if let Some(slug) = self.slug {
            next.slug = validate_slug(slug.trim())?;
        }
        if let Some(description) = self.description {
            next.description = normalize_description(description)?;
        }
        if let Some(price) = self.price_cents {
            next.price_cents = validate_price(price)?;
        }
        if let Some(stock) = self.stock {
            next.stock = validate_stock(stock)?;
        }
        if let Some(category_id) = self.category_id {
            next.category_id = category_id;
        }
        if let Some(image_url) = self.image_url {
            next.image_url = validate_image_url(image_url)?;
        }
        if let Some(featured) = self.featured {
            next.featured = featured;
        }
        if let Some(active) = self.active {
            next.active = active;
        }
        next.updated_at = now;
        Ok(next)
    }
}

fn validate_name(raw: &str) -> Result<String, DomainError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::validation("product name cannot be empty"));
    }
    if name.chars().count() > MAX_PRODUCT_NAME_LEN {
        return Err(DomainError::validation(format!(
            "product name must be at most {MAX_PRODUCT_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

fn validate_price(price_cents: i64) -> Result<i64, DomainError> {
    if price_cents < 0 {
        return Err(DomainError::validation("price_cents cannot be negative"));
    }
    Ok(price_cents)
}

fn validate_stock(stock: i32) -> Result<i32, DomainError> {
    if stock < 0 {
        return Err(DomainError::validation("stock cannot be negative"));
    }
    Ok(stock)
}

fn validate_image_url(raw: Option<String>) -> Result<Option<String>, DomainError> {
    let Some(url) = raw else { return Ok(None) };
    let url = url.trim();
    if url.is_empty() {
        return Ok(None);
    }
    if url.len() > MAX_IMAGE_URL_LEN {
        return Err(DomainError::validation("image_url is too long"));
    }
    let allowed = url.starts_with("https://") || url.starts_with("http://") || url.starts_with('/');
    if !allowed || url.chars().any(char::is_whitespace) {
        return Err(DomainError::validation(
            "image_url must be an http(s) URL or an absolute path",
        ));
    }
    Ok(Some(url.to_string()))
}
