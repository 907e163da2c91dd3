use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{CategoryId, DomainError};

use crate::slug::{resolve_slug, validate_slug};

pub const MAX_CATEGORY_NAME_LEN: usize = 80;
pub const MAX_DESCRIPTION_LEN: usize = 2_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// Unique across categories.
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
}

impl NewCategory {
    pub fn into_category(self, now: DateTime<Utc>) -> Result<Category, DomainError> {
        let name = validate_name(&self.name)?;
        let slug = resolve_slug(self.slug.as_deref(), &name)?;
        Ok(Category {
            id: CategoryId::new(),
            name,
            slug,
            description: normalize_description(self.description)?,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update. `description: null` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "crate::nullable::deserialize")]
    pub description: Option<Option<String>>,
}

impl CategoryPatch {
    /// Renaming keeps the existing slug unless a new one is supplied.
    pub fn apply(self, current: &Category, now: DateTime<Utc>) -> Result<Category, DomainError> {
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
        next.updated_at = now;
        Ok(next)
    }
}

fn validate_name(raw: &str) -> Result<String, DomainError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::validation("category name cannot be empty"));
    }
    if name.chars().count() > MAX_CATEGORY_NAME_LEN {
        return Err(DomainError::validation(format!(
            "category name must be at most {MAX_CATEGORY_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

pub(crate) fn normalize_description(raw: Option<String>) -> Result<Option<String>, DomainError> {
    let Some(text) = raw else { return Ok(None) };
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    if text.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(DomainError::validation(format!(
            "description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(Some(text.to_string()))
}
