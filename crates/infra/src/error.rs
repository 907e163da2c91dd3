use thiserror::Error;

use storefront_core::ProductId;

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage failure, independent of the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    /// Uniqueness or referential conflict (duplicate slug/email, category in use).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A referenced row (e.g. a product's category) does not exist.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("insufficient stock for product {0}")]
    InsufficientStock(ProductId),

    /// A stored value could not be mapped back into the domain.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
