//! Postgres-backed stores.
//!
//! Rows are mapped by hand with `Row::try_get`; dynamic SQL goes through
//! `sqlx::QueryBuilder` so every user-supplied value is a bind parameter.

mod carts;
mod catalog;
pub mod migrations;
mod product_query;
mod users;

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use carts::PostgresCartStore;
pub use catalog::PostgresCatalog;
pub use users::PostgresUserStore;

use crate::StoreError;

/// Open a pool against `database_url`.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// Translate constraint violations into store-level errors.
pub(crate) fn map_db_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        let constraint = db.constraint().unwrap_or("unknown").to_string();
        if db.is_unique_violation() {
            return StoreError::Conflict(format!("duplicate value violates {constraint}"));
        }
        if db.is_foreign_key_violation() {
            return StoreError::InvalidReference(format!("reference violates {constraint}"));
        }
        if db.is_check_violation() {
            return StoreError::Corrupt(format!("row violates {constraint}"));
        }
    }
    StoreError::Database(err)
}
