//! `storefront-core`: shared domain building blocks.
//!
//! Pure types only: identifiers, the domain error model and pagination.

pub mod error;
pub mod id;
pub mod page;

pub use error::{DomainError, DomainResult};
pub use id::{CategoryId, ProductId, UserId};
pub use page::{Page, PageRequest, Pagination};
