//! Infrastructure layer: store traits and their in-memory / Postgres adapters.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::{CartStore, CategoryStore, ProductStats, ProductStore, StockReservation, UserStore};
