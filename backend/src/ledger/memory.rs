use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use shared::{Movement, MovementKind, Product, ProductId};

use super::{sort_ledger, MovementLedger, ProductCatalog};
use crate::error::{AppError, AppResult};

/// In-memory catalog and append-only ledger.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    products: RwLock<BTreeMap<ProductId, Product>>,
    movements: RwLock<HashMap<ProductId, Vec<Movement>>>,
}

/// Fields of a movement to append; the ledger assigns the id
#[derive(Debug, Clone, Default)]
pub struct NewMovement {
    pub occurred_on: Option<NaiveDate>,
    pub occurred_at: Option<NaiveTime>,
    pub quantity: Decimal,
    pub kind: Option<MovementKind>,
    pub description: Option<String>,
    pub document_ref: Option<String>,
    pub unit_value: Option<Decimal>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_product(&self, product: Product) -> AppResult<()> {
        let mut products = self
            .products
            .write()
            .map_err(|_| AppError::Internal("lock poisoned".to_string()))?;
        products.insert(product.id, product);
        Ok(())
    }

    /// Overwrite the stored quantity the way an upstream subsystem would
    pub fn set_stored_quantity(&self, product_id: ProductId, quantity: Decimal) -> AppResult<()> {
        let mut products = self
            .products
            .write()
            .map_err(|_| AppError::Internal("lock poisoned".to_string()))?;
        let product = products
            .get_mut(&product_id)
            .ok_or_else(|| AppError::product_not_found(product_id))?;
        product.stored_quantity = quantity;
        Ok(())
    }

    /// Append a movement; ids follow global insertion order
    pub fn append(&self, product_id: ProductId, new: NewMovement) -> AppResult<Movement> {
        if !self.contains(product_id)? {
            return Err(AppError::product_not_found(product_id));
        }

        let mut movements = self
            .movements
            .write()
            .map_err(|_| AppError::Internal("lock poisoned".to_string()))?;

        let next_id = movements.values().map(|v| v.len() as i64).sum::<i64>() + 1;
        let movement = Movement {
            id: next_id,
            product_id,
            occurred_on: new
                .occurred_on
                .ok_or_else(|| AppError::Internal("movement date is required".to_string()))?,
            occurred_at: new.occurred_at.unwrap_or(NaiveTime::MIN),
            quantity: new.quantity,
            kind: new.kind,
            description: new.description,
            document_ref: new.document_ref,
            unit_value: new.unit_value,
        };

        movements.entry(product_id).or_default().push(movement.clone());
        Ok(movement)
    }

    fn contains(&self, product_id: ProductId) -> AppResult<bool> {
        let products = self
            .products
            .read()
            .map_err(|_| AppError::Internal("lock poisoned".to_string()))?;
        Ok(products.contains_key(&product_id))
    }
}

#[async_trait]
impl ProductCatalog for InMemoryLedger {
    async fn get_product(&self, product_id: ProductId) -> AppResult<Product> {
        let products = self
            .products
            .read()
            .map_err(|_| AppError::Internal("lock poisoned".to_string()))?;
        products
            .get(&product_id)
            .cloned()
            .ok_or_else(|| AppError::product_not_found(product_id))
    }

    async fn product_ids(&self) -> AppResult<Vec<ProductId>> {
        let products = self
            .products
            .read()
            .map_err(|_| AppError::Internal("lock poisoned".to_string()))?;
        Ok(products.keys().copied().collect())
    }
}

#[async_trait]
impl MovementLedger for InMemoryLedger {
    async fn read(&self, product_id: ProductId, as_of: Option<NaiveDate>) -> AppResult<Vec<Movement>> {
        if !self.contains(product_id)? {
            return Err(AppError::product_not_found(product_id));
        }

        let movements = self
            .movements
            .read()
            .map_err(|_| AppError::Internal("lock poisoned".to_string()))?;

        let mut out: Vec<Movement> = movements
            .get(&product_id)
            .map(|stream| {
                stream
                    .iter()
                    .filter(|m| as_of.map_or(true, |date| m.occurred_on <= date))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        sort_ledger(&mut out);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: ProductId) -> Product {
        Product {
            id,
            code: format!("P{id}"),
            name: format!("Product {id}"),
            unit_cost: Decimal::ZERO,
            stored_quantity: Decimal::ZERO,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    #[tokio::test]
    async fn test_read_orders_by_date_then_time_then_insertion() {
        let ledger = InMemoryLedger::new();
        ledger.add_product(product(1)).unwrap();

        let noon = NaiveTime::from_hms_opt(12, 0, 0);
        ledger
            .append(1, NewMovement { occurred_on: Some(day(5)), quantity: Decimal::from(3), ..Default::default() })
            .unwrap();
        ledger
            .append(1, NewMovement { occurred_on: Some(day(2)), occurred_at: noon, quantity: Decimal::from(2), ..Default::default() })
            .unwrap();
        ledger
            .append(1, NewMovement { occurred_on: Some(day(2)), quantity: Decimal::from(1), ..Default::default() })
            .unwrap();
        ledger
            .append(1, NewMovement { occurred_on: Some(day(2)), occurred_at: noon, quantity: Decimal::from(4), ..Default::default() })
            .unwrap();

        let read = ledger.read(1, None).await.unwrap();
        let quantities: Vec<_> = read.iter().map(|m| m.quantity).collect();
        assert_eq!(
            quantities,
            vec![Decimal::from(1), Decimal::from(2), Decimal::from(4), Decimal::from(3)]
        );
    }

    #[tokio::test]
    async fn test_read_as_of_is_inclusive_on_date() {
        let ledger = InMemoryLedger::new();
        ledger.add_product(product(1)).unwrap();
        for d in [1, 5, 10] {
            ledger
                .append(1, NewMovement { occurred_on: Some(day(d)), quantity: Decimal::ONE, ..Default::default() })
                .unwrap();
        }

        assert_eq!(ledger.read(1, Some(day(5))).await.unwrap().len(), 2);
        assert_eq!(ledger.read(1, Some(day(4))).await.unwrap().len(), 1);
        assert!(ledger.read(1, Some(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_unknown_product_is_not_found() {
        let ledger = InMemoryLedger::new();
        let err = ledger.read(99, None).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_read_product_without_movements_is_empty() {
        let ledger = InMemoryLedger::new();
        ledger.add_product(product(3)).unwrap();
        assert!(ledger.read(3, None).await.unwrap().is_empty());
    }
}
