//! Reconciliation of computed balances against the stored quantity field

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    AmbiguousMovement, BalanceSnapshot, ClassificationRule, Product, ProductId, ResetPoint,
};
use uuid::Uuid;

use super::batch::{for_each_product, BatchError, BatchOutcome, CancelHandle};
use super::calculator::PointInTimeCalculator;
use crate::error::{AppError, AppResult};
use crate::ledger::ProductCatalog;

#[derive(Clone)]
pub struct DiscrepancyValidator {
    catalog: Arc<dyn ProductCatalog>,
    calculator: PointInTimeCalculator,
    epsilon: Decimal,
    worker_limit: usize,
}

/// Outcome of reconciling one product
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValidationResult {
    pub product_id: ProductId,
    pub product_code: String,
    pub calculated: Decimal,
    pub stored: Decimal,
    /// `calculated - stored`
    pub difference: Decimal,
    pub is_correct: bool,
    pub is_negative: bool,
    pub reset_info: ResetInfo,
    pub movement_info: MovementInfo,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResetInfo {
    pub reset_count: u64,
    pub last_reset: Option<ResetPoint>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MovementInfo {
    pub movement_count: u64,
    pub last_movement_at: Option<NaiveDateTime>,
    pub rule_counts: BTreeMap<ClassificationRule, u64>,
    pub ambiguities: Vec<AmbiguousMovement>,
}

/// Ranked discrepancies from a full catalog scan
#[derive(Debug, Clone, Serialize)]
pub struct DiscrepancyScan {
    pub scan_id: Uuid,
    pub threshold: Decimal,
    pub limit: usize,
    pub discrepancies: Vec<ValidationResult>,
    pub errors: Vec<BatchError>,
    pub scanned: usize,
    pub cancelled: bool,
}

/// Compare a computed snapshot with the product's stored quantity
pub fn evaluate(
    product: &Product,
    snapshot: &BalanceSnapshot,
    epsilon: Decimal,
) -> AppResult<ValidationResult> {
    let difference = snapshot
        .quantity
        .checked_sub(product.stored_quantity)
        .ok_or_else(|| {
            AppError::ArithmeticOverflow(format!("difference of product {}", product.id))
        })?;

    Ok(ValidationResult {
        product_id: product.id,
        product_code: product.code.clone(),
        calculated: snapshot.quantity,
        stored: product.stored_quantity,
        difference,
        is_correct: difference.abs() < epsilon,
        is_negative: snapshot.is_negative(),
        reset_info: ResetInfo {
            reset_count: snapshot.reset_count,
            last_reset: snapshot.last_reset.clone(),
        },
        movement_info: MovementInfo {
            movement_count: snapshot.movement_count,
            last_movement_at: snapshot.last_movement_at,
            rule_counts: snapshot.diagnostics.rule_counts.clone(),
            ambiguities: snapshot.diagnostics.ambiguities.clone(),
        },
    })
}

/// Largest absolute difference first, then ascending product id
pub fn rank(results: &mut [ValidationResult]) {
    results.sort_by(|a, b| {
        b.difference
            .abs()
            .cmp(&a.difference.abs())
            .then(a.product_id.cmp(&b.product_id))
    });
}

impl DiscrepancyValidator {
    pub fn new(
        catalog: Arc<dyn ProductCatalog>,
        calculator: PointInTimeCalculator,
        epsilon: Decimal,
        worker_limit: usize,
    ) -> Self {
        Self {
            catalog,
            calculator,
            epsilon,
            worker_limit,
        }
    }

    pub fn epsilon(&self) -> Decimal {
        self.epsilon
    }

    /// Reconcile one product
    pub async fn validate(&self, product_id: ProductId) -> AppResult<ValidationResult> {
        validate_one(self.catalog.as_ref(), &self.calculator, product_id, self.epsilon).await
    }

    /// Reconcile the given products, or the whole catalog when `None`
    pub async fn validate_many(
        &self,
        product_ids: Option<Vec<ProductId>>,
        cancel: Option<&CancelHandle>,
    ) -> AppResult<BatchOutcome<ValidationResult>> {
        let ids = match product_ids {
            Some(ids) => ids,
            None => self.catalog.product_ids().await?,
        };

        let mut outcome = self.run(ids, cancel).await;
        outcome.items.sort_by_key(|r| r.product_id);
        outcome.errors.sort_by_key(|e| e.product_id);
        Ok(outcome)
    }

    /// Scan the catalog for products whose stored quantity disagrees with the ledger
    pub async fn find_discrepancies(
        &self,
        threshold: Decimal,
        limit: usize,
        cancel: Option<&CancelHandle>,
    ) -> AppResult<DiscrepancyScan> {
        let scan_id = Uuid::new_v4();
        let ids = self.catalog.product_ids().await?;
        tracing::info!(%scan_id, products = ids.len(), %threshold, limit, "discrepancy scan started");

        let outcome = self.run(ids, cancel).await;

        let mut discrepancies: Vec<ValidationResult> = outcome
            .items
            .into_iter()
            .filter(|r| !r.is_correct && r.difference.abs() >= threshold)
            .collect();
        rank(&mut discrepancies);
        discrepancies.truncate(limit);

        let mut errors = outcome.errors;
        errors.sort_by_key(|e| e.product_id);

        tracing::info!(
            %scan_id,
            scanned = outcome.processed,
            found = discrepancies.len(),
            failed = errors.len(),
            cancelled = outcome.cancelled,
            "discrepancy scan finished"
        );

        Ok(DiscrepancyScan {
            scan_id,
            threshold,
            limit,
            discrepancies,
            errors,
            scanned: outcome.processed,
            cancelled: outcome.cancelled,
        })
    }

    async fn run(
        &self,
        ids: Vec<ProductId>,
        cancel: Option<&CancelHandle>,
    ) -> BatchOutcome<ValidationResult> {
        let catalog = self.catalog.clone();
        let calculator = self.calculator.clone();
        let epsilon = self.epsilon;

        for_each_product(ids, self.worker_limit, cancel, move |product_id| {
            let catalog = catalog.clone();
            let calculator = calculator.clone();
            async move { validate_one(catalog.as_ref(), &calculator, product_id, epsilon).await }
        })
        .await
    }
}

async fn validate_one(
    catalog: &dyn ProductCatalog,
    calculator: &PointInTimeCalculator,
    product_id: ProductId,
    epsilon: Decimal,
) -> AppResult<ValidationResult> {
    let product = catalog.get_product(product_id).await?;
    let snapshot = calculator.current(product_id).await?;
    let result = evaluate(&product, &snapshot, epsilon)?;

    if !result.is_correct {
        tracing::debug!(
            product_id,
            calculated = %result.calculated,
            stored = %result.stored,
            difference = %result.difference,
            "stored quantity disagrees with ledger"
        );
    }
    Ok(result)
}
