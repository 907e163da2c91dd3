//! Catalog domain: categories, products and the product query builder.
//!
//! Pure domain logic (no IO, no HTTP, no storage). Stores consume
//! [`ProductFilter`] / [`ProductSort`] to answer list queries.

pub mod category;
pub mod product;
pub mod query;
pub mod slug;

mod nullable;

pub use category::{Category, CategoryPatch, NewCategory};
pub use product::{NewProduct, Product, ProductPatch};
pub use query::{ProductFilter, ProductQuery, ProductQueryParams, ProductSort};
pub use slug::{slugify, validate_slug};
