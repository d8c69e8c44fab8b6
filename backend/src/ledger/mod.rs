//! Read-only access to the product catalog and the movement ledger
//!
//! The engine depends only on these two contracts, never on the storage
//! technology behind them.

mod memory;
mod postgres;

pub use memory::{InMemoryLedger, NewMovement};
pub use postgres::PgLedger;

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::{Movement, Product, ProductId};

use crate::error::AppResult;

/// Catalog lookup
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Fails with `NotFound` for an unknown product
    async fn get_product(&self, product_id: ProductId) -> AppResult<Product>;

    /// All catalog ids in ascending order
    async fn product_ids(&self) -> AppResult<Vec<ProductId>>;
}

/// Ledger query
#[async_trait]
pub trait MovementLedger: Send + Sync {
    /// Movements of one product ordered by (date, time, insertion order).
    ///
    /// With `as_of`, only movements dated on or before it are returned. An
    /// unknown product fails with `NotFound`; a product with no movements
    /// yields an empty vector. Every call is a fresh, independent read.
    async fn read(&self, product_id: ProductId, as_of: Option<NaiveDate>) -> AppResult<Vec<Movement>>;
}

/// Sort movements into ledger order
pub(crate) fn sort_ledger(movements: &mut [Movement]) {
    movements.sort_by_key(|m| m.ordering_key());
}
