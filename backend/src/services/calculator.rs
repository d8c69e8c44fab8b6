//! Point-in-time balance calculation
//!
//! Two strategies answer "how much of P was on hand on D":
//! - Forward replays every movement dated on or before D.
//! - Reverse starts from the stored current quantity and inverts every
//!   movement dated after D, newest first. A reset after D cannot be inverted
//!   through; when one is found the walk stops and the balance is re-anchored
//!   by forward replay up to D.

use std::sync::Arc;

use chrono::NaiveDate;
use shared::{BalanceSnapshot, Movement, Product, ProductId, Strategy};

use super::cache::BalanceCache;
use super::replay::BalanceReplayer;
use crate::error::{AppError, AppResult};
use crate::ledger::{MovementLedger, ProductCatalog};

#[derive(Clone)]
pub struct PointInTimeCalculator {
    catalog: Arc<dyn ProductCatalog>,
    ledger: Arc<dyn MovementLedger>,
    replayer: BalanceReplayer,
    cache: Option<Arc<BalanceCache>>,
    default_strategy: Strategy,
}

impl PointInTimeCalculator {
    pub fn new(
        catalog: Arc<dyn ProductCatalog>,
        ledger: Arc<dyn MovementLedger>,
        replayer: BalanceReplayer,
    ) -> Self {
        Self {
            catalog,
            ledger,
            replayer,
            cache: None,
            default_strategy: Strategy::Forward,
        }
    }

    pub fn with_cache(mut self, cache: Arc<BalanceCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_default_strategy(mut self, strategy: Strategy) -> Self {
        self.default_strategy = strategy;
        self
    }

    pub fn replayer(&self) -> &BalanceReplayer {
        &self.replayer
    }

    /// Balance of `product_id` as of a `YYYY-MM-DD` date, using the default strategy
    pub async fn calculate(&self, product_id: ProductId, as_of: &str) -> AppResult<BalanceSnapshot> {
        let as_of = shared::parse_date("as_of_date", as_of)?;
        self.calculate_at(product_id, as_of, self.default_strategy).await
    }

    /// Balance of `product_id` at the end of `as_of`
    #[tracing::instrument(skip(self))]
    pub async fn calculate_at(
        &self,
        product_id: ProductId,
        as_of: NaiveDate,
        strategy: Strategy,
    ) -> AppResult<BalanceSnapshot> {
        let product = self.catalog.get_product(product_id).await?;

        // Only Forward balances are cached; Reverse depends on the mutable stored quantity
        if let Some(hit) = self
            .cache
            .as_ref()
            .filter(|_| strategy == Strategy::Forward)
            .and_then(|cache| cache.get(product_id, as_of))
        {
            tracing::trace!("balance cache hit");
            return Ok(hit);
        }

        let snapshot = match strategy {
            Strategy::Forward => self.forward(product.id, as_of).await?,
            Strategy::Reverse => self.reverse(&product, as_of).await?,
        };

        if let Some(cache) = &self.cache {
            cache.put(&snapshot);
        }
        Ok(snapshot)
    }

    /// Balance after every recorded movement
    pub async fn current(&self, product_id: ProductId) -> AppResult<BalanceSnapshot> {
        let movements = self.ledger.read(product_id, None).await?;
        Ok(self.replayer.replay(product_id, None, &movements)?)
    }

    async fn forward(&self, product_id: ProductId, as_of: NaiveDate) -> AppResult<BalanceSnapshot> {
        let movements = self.ledger.read(product_id, Some(as_of)).await?;
        Ok(self.replayer.replay(product_id, Some(as_of), &movements)?)
    }

    async fn reverse(&self, product: &Product, as_of: NaiveDate) -> AppResult<BalanceSnapshot> {
        let movements = self.ledger.read(product.id, None).await?;
        self.reverse_from_stored(product, as_of, &movements)
    }

    /// Reverse walk over an already-read ledger
    pub fn reverse_from_stored(
        &self,
        product: &Product,
        as_of: NaiveDate,
        movements: &[Movement],
    ) -> AppResult<BalanceSnapshot> {
        let split = movements.partition_point(|m| m.occurred_on <= as_of);
        let (before, after) = movements.split_at(split);

        // Counters and diagnostics describe the movements up to the target date
        let mut snapshot = self.replayer.replay(product.id, Some(as_of), before)?;
        snapshot.strategy = Strategy::Reverse;

        let classifier = self.replayer.classifier();
        let mut quantity = product.stored_quantity;
        let mut value = product
            .stored_quantity
            .checked_mul(product.unit_cost)
            .ok_or_else(|| {
                AppError::ArithmeticOverflow(format!("stored value of product {}", product.id))
            })?;

        for movement in after.iter().rev() {
            let class = classifier.classify(movement).class;
            match self.replayer.invert(quantity, value, movement, class)? {
                Some((q, v)) => {
                    quantity = q;
                    value = v;
                }
                None => {
                    tracing::debug!(
                        product_id = product.id,
                        reset_id = movement.id,
                        "reset after target date, re-anchoring by forward replay"
                    );
                    snapshot.diagnostics.reanchored_at = Some(movement.id);
                    return Ok(snapshot);
                }
            }
        }

        snapshot.quantity = quantity;
        snapshot.value = value;
        Ok(snapshot)
    }
}
