//! Product catalog models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Catalog identifier of a product
pub type ProductId = i64;

/// A product as seen by the engine.
///
/// `stored_quantity` is a snapshot maintained by other subsystems; the engine
/// only ever reads it to reconcile against the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub code: String,
    pub name: String,
    pub unit_cost: Decimal,
    pub stored_quantity: Decimal,
}
