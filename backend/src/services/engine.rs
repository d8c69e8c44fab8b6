//! Engine facade consumed by API and CLI layers
//!
//! Inputs are validated here, before any catalog or ledger read.

use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{BalanceSnapshot, Product, ProductId, Strategy};

use super::batch::{BatchOutcome, CancelHandle};
use super::cache::BalanceCache;
use super::calculator::PointInTimeCalculator;
use super::classifier::MovementClassifier;
use super::replay::{BalanceReplayer, ReplayStep};
use super::reporting::ReportingService;
use super::validator::{evaluate, DiscrepancyScan, DiscrepancyValidator, ValidationResult};
use crate::config::{ClassifierConfig, EngineConfig};
use crate::error::AppResult;
use crate::ledger::{MovementLedger, ProductCatalog};

/// Stock balance engine
#[derive(Clone)]
pub struct StockEngine {
    catalog: Arc<dyn ProductCatalog>,
    ledger: Arc<dyn MovementLedger>,
    calculator: PointInTimeCalculator,
    validator: DiscrepancyValidator,
    reporting: ReportingService,
    cache: Option<Arc<BalanceCache>>,
}

/// Current state of a product with its recent ledger activity
#[derive(Debug, Clone, Serialize)]
pub struct ProductStockDetail {
    pub product: Product,
    pub balance: BalanceSnapshot,
    pub validation: ValidationResult,
    pub since: NaiveDate,
    /// Newest first, each with the running balance right after it
    pub recent_movements: Vec<ReplayStep>,
}

impl StockEngine {
    pub fn new(
        catalog: Arc<dyn ProductCatalog>,
        ledger: Arc<dyn MovementLedger>,
        engine: &EngineConfig,
        classifier: &ClassifierConfig,
    ) -> Self {
        let replayer = BalanceReplayer::new(MovementClassifier::new(classifier));
        let cache = engine.cache_enabled.then(|| Arc::new(BalanceCache::new()));

        let mut calculator = PointInTimeCalculator::new(catalog.clone(), ledger.clone(), replayer)
            .with_default_strategy(engine.default_strategy);
        if let Some(cache) = &cache {
            calculator = calculator.with_cache(cache.clone());
        }

        let validator = DiscrepancyValidator::new(
            catalog.clone(),
            calculator.clone(),
            engine.epsilon,
            engine.worker_limit,
        );
        let reporting = ReportingService::new(
            catalog.clone(),
            ledger.clone(),
            calculator.clone(),
            engine.worker_limit,
        );

        Self {
            catalog,
            ledger,
            calculator,
            validator,
            reporting,
            cache,
        }
    }

    pub fn calculator(&self) -> &PointInTimeCalculator {
        &self.calculator
    }

    pub fn validator(&self) -> &DiscrepancyValidator {
        &self.validator
    }

    pub fn reporting(&self) -> &ReportingService {
        &self.reporting
    }

    /// Balance of a product at the end of a `YYYY-MM-DD` date
    pub async fn calculate_historical_stock(
        &self,
        product_id: ProductId,
        date: &str,
    ) -> AppResult<BalanceSnapshot> {
        self.calculator.calculate(product_id, date).await
    }

    /// Same as `calculate_historical_stock` with an explicit strategy
    pub async fn calculate_historical_stock_with(
        &self,
        product_id: ProductId,
        date: &str,
        strategy: Strategy,
    ) -> AppResult<BalanceSnapshot> {
        let as_of = shared::parse_date("date", date)?;
        self.calculator.calculate_at(product_id, as_of, strategy).await
    }

    /// Reconcile the listed products, or the whole catalog
    pub async fn validate_current_stock(
        &self,
        product_ids: Option<Vec<ProductId>>,
        cancel: Option<&CancelHandle>,
    ) -> AppResult<BatchOutcome<ValidationResult>> {
        self.validator.validate_many(product_ids, cancel).await
    }

    /// Ranked list of products whose stored quantity disagrees with the ledger
    pub async fn find_stock_discrepancies(
        &self,
        threshold: Decimal,
        limit: i64,
        cancel: Option<&CancelHandle>,
    ) -> AppResult<DiscrepancyScan> {
        let threshold = shared::validate_threshold("threshold", threshold)?;
        let limit = shared::validate_limit("limit", limit)?;
        self.validator.find_discrepancies(threshold, limit, cancel).await
    }

    /// Current balance, reconciliation and the last `days_history` days of movements
    pub async fn product_stock_detail(
        &self,
        product_id: ProductId,
        days_history: i64,
    ) -> AppResult<ProductStockDetail> {
        self.product_stock_detail_at(product_id, days_history, Utc::now().date_naive())
            .await
    }

    /// `product_stock_detail` with an explicit reference day
    pub async fn product_stock_detail_at(
        &self,
        product_id: ProductId,
        days_history: i64,
        today: NaiveDate,
    ) -> AppResult<ProductStockDetail> {
        let days = shared::validate_limit("days_history", days_history)?;
        let since = today
            .checked_sub_days(Days::new(days as u64))
            .unwrap_or(NaiveDate::MIN);

        let product = self.catalog.get_product(product_id).await?;
        let movements = self.ledger.read(product_id, None).await?;
        let (balance, steps) = self
            .calculator
            .replayer()
            .replay_with_trace(product_id, &movements)?;
        let validation = evaluate(&product, &balance, self.validator.epsilon())?;

        let recent_movements = steps
            .into_iter()
            .rev()
            .take_while(|step| step.movement.occurred_on >= since)
            .collect();

        Ok(ProductStockDetail {
            product,
            balance,
            validation,
            since,
            recent_movements,
        })
    }

    /// Tell the engine a movement was appended upstream
    pub fn record_appended(&self, product_id: ProductId, movement_date: NaiveDate) {
        if let Some(cache) = &self.cache {
            let dropped = cache.invalidate(product_id, movement_date);
            if dropped > 0 {
                tracing::debug!(product_id, %movement_date, dropped, "balance cache invalidated");
            }
        }
    }
}
