//! Persistence seams for the marketplace order system.
//!
//! Two store contracts and two implementations of each:
//!
//! - [`CatalogStore`] owns products and the atomic stock reservation /
//!   restoration contract.
//! - [`OrderStore`] owns order documents, the per-day order-number counter,
//!   compare-and-swap updates, and the statistics read models.
//!
//! [`memory`] provides in-memory implementations (tests and reference
//! semantics); [`postgres`] provides the production implementations backed
//! by sqlx.

pub mod catalog;
pub mod error;
pub mod memory;
pub mod orders;
pub mod postgres;
pub mod query;
pub mod stats;

pub use catalog::CatalogStore;
pub use error::{Result, StoreError};
pub use memory::{InMemoryCatalogStore, InMemoryOrderStore};
pub use orders::OrderStore;
pub use postgres::{PostgresCatalogStore, PostgresOrderStore};
pub use query::OrderQuery;
pub use stats::{OrderStats, ProductSales, SellerStats};
