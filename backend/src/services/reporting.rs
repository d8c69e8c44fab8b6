//! Reporting service for stock dashboards
//! Provides top positions, critical stock, movement activity and period summaries

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{ArithmeticOverflow, DateRange, Movement, MovementClass, Product, ProductId};

use super::batch::{for_each_product, BatchOutcome, CancelHandle};
use super::calculator::PointInTimeCalculator;
use super::classifier::MovementClassifier;
use crate::error::{AppError, AppResult};
use crate::ledger::{MovementLedger, ProductCatalog};

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    catalog: Arc<dyn ProductCatalog>,
    ledger: Arc<dyn MovementLedger>,
    calculator: PointInTimeCalculator,
    worker_limit: usize,
}

/// Computed stock position of one product
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StockPosition {
    pub product_id: ProductId,
    pub code: String,
    pub name: String,
    pub quantity: Decimal,
    pub value: Decimal,
    pub movement_count: u64,
}

/// Movement activity of one product inside a period
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MovementActivity {
    pub product_id: ProductId,
    pub code: String,
    pub movement_count: u64,
    pub entries: u64,
    pub exits: u64,
    pub reversals: u64,
    pub resets: u64,
}

/// Entry/exit summary of one product inside a period
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PeriodSummary {
    pub product_id: ProductId,
    pub code: String,
    pub opening_quantity: Decimal,
    pub closing_quantity: Decimal,
    pub entry_quantity: Decimal,
    pub entry_value: Decimal,
    pub exit_quantity: Decimal,
    pub exit_value: Decimal,
    pub net_quantity: Decimal,
    pub last_entry_price: Option<Decimal>,
    pub exit_price: Option<Decimal>,
    pub margin: Option<Decimal>,
    pub margin_percent: Option<Decimal>,
}

/// Total valuation of the catalog at a date
#[derive(Debug, Clone, Serialize)]
pub struct PeriodValuation {
    pub as_of: NaiveDate,
    pub total_quantity: Decimal,
    pub total_value: Decimal,
    pub positions: BatchOutcome<StockPosition>,
}

impl ReportingService {
    pub fn new(
        catalog: Arc<dyn ProductCatalog>,
        ledger: Arc<dyn MovementLedger>,
        calculator: PointInTimeCalculator,
        worker_limit: usize,
    ) -> Self {
        Self {
            catalog,
            ledger,
            calculator,
            worker_limit,
        }
    }

    /// Products with the highest computed stock value
    pub async fn top_by_value(
        &self,
        top_n: usize,
        cancel: Option<&CancelHandle>,
    ) -> AppResult<BatchOutcome<StockPosition>> {
        let mut outcome = self.positions(None, cancel).await?;
        outcome
            .items
            .sort_by(|a, b| b.value.cmp(&a.value).then(a.product_id.cmp(&b.product_id)));
        outcome.items.truncate(top_n);
        Ok(outcome)
    }

    /// Products whose computed quantity is below `critical_quantity`
    pub async fn critical_stock(
        &self,
        critical_quantity: Decimal,
        cancel: Option<&CancelHandle>,
    ) -> AppResult<BatchOutcome<StockPosition>> {
        let mut outcome = self.positions(None, cancel).await?;
        outcome.items.retain(|p| p.quantity < critical_quantity);
        outcome
            .items
            .sort_by(|a, b| a.quantity.cmp(&b.quantity).then(a.product_id.cmp(&b.product_id)));
        Ok(outcome)
    }

    /// Products with the most movements inside `range`
    pub async fn most_movements(
        &self,
        range: DateRange,
        top_n: usize,
        cancel: Option<&CancelHandle>,
    ) -> AppResult<BatchOutcome<MovementActivity>> {
        shared::validate_range(&range)?;
        let ids = self.catalog.product_ids().await?;
        let catalog = self.catalog.clone();
        let ledger = self.ledger.clone();
        let classifier = self.calculator.replayer().classifier().clone();

        let mut outcome = for_each_product(ids, self.worker_limit, cancel, move |product_id| {
            let catalog = catalog.clone();
            let ledger = ledger.clone();
            let classifier = classifier.clone();
            async move {
                let product = catalog.get_product(product_id).await?;
                let movements = ledger.read(product_id, Some(range.end)).await?;
                Ok(activity(&product, range, &movements, &classifier))
            }
        })
        .await;

        outcome.items.retain(|a| a.movement_count > 0);
        outcome.items.sort_by(|a, b| {
            b.movement_count
                .cmp(&a.movement_count)
                .then(a.product_id.cmp(&b.product_id))
        });
        outcome.items.truncate(top_n);
        Ok(outcome)
    }

    /// Entry/exit/net/margin summary per product for `range`
    pub async fn period_summary(
        &self,
        range: DateRange,
        cancel: Option<&CancelHandle>,
    ) -> AppResult<BatchOutcome<PeriodSummary>> {
        shared::validate_range(&range)?;
        let ids = self.catalog.product_ids().await?;
        let catalog = self.catalog.clone();
        let ledger = self.ledger.clone();
        let classifier = self.calculator.replayer().classifier().clone();

        let mut outcome = for_each_product(ids, self.worker_limit, cancel, move |product_id| {
            let catalog = catalog.clone();
            let ledger = ledger.clone();
            let classifier = classifier.clone();
            async move {
                let product = catalog.get_product(product_id).await?;
                let movements = ledger.read(product_id, Some(range.end)).await?;
                summarize_period(&product, range, &movements, &classifier)
            }
        })
        .await;

        outcome.items.sort_by_key(|s| s.product_id);
        Ok(outcome)
    }

    /// Catalog valuation from ledger balances at the end of `as_of`
    pub async fn period_valuation(
        &self,
        as_of: NaiveDate,
        cancel: Option<&CancelHandle>,
    ) -> AppResult<PeriodValuation> {
        let mut positions = self.positions(Some(as_of), cancel).await?;
        positions.items.sort_by_key(|p| p.product_id);

        let (total_quantity, total_value) = positions.items.iter().try_fold(
            (Decimal::ZERO, Decimal::ZERO),
            |(quantity, value), p| {
                Some((quantity.checked_add(p.quantity)?, value.checked_add(p.value)?))
            },
        )
        .ok_or_else(|| AppError::ArithmeticOverflow(format!("valuation as of {}", as_of)))?;

        Ok(PeriodValuation {
            as_of,
            total_quantity,
            total_value,
            positions,
        })
    }

    async fn positions(
        &self,
        as_of: Option<NaiveDate>,
        cancel: Option<&CancelHandle>,
    ) -> AppResult<BatchOutcome<StockPosition>> {
        let ids = self.catalog.product_ids().await?;
        let catalog = self.catalog.clone();
        let calculator = self.calculator.clone();

        Ok(for_each_product(ids, self.worker_limit, cancel, move |product_id| {
            let catalog = catalog.clone();
            let calculator = calculator.clone();
            async move {
                let product = catalog.get_product(product_id).await?;
                let snapshot = match as_of {
                    Some(date) => calculator.calculate_at(product_id, date, shared::Strategy::Forward).await?,
                    None => calculator.current(product_id).await?,
                };
                Ok(StockPosition {
                    product_id,
                    code: product.code,
                    name: product.name,
                    quantity: snapshot.quantity,
                    value: snapshot.value,
                    movement_count: snapshot.movement_count,
                })
            }
        })
        .await)
    }
}

/// Count classified movements dated inside `range`
pub fn activity(
    product: &Product,
    range: DateRange,
    movements: &[Movement],
    classifier: &MovementClassifier,
) -> MovementActivity {
    let mut activity = MovementActivity {
        product_id: product.id,
        code: product.code.clone(),
        movement_count: 0,
        entries: 0,
        exits: 0,
        reversals: 0,
        resets: 0,
    };

    for movement in movements.iter().filter(|m| range.contains(m.occurred_on)) {
        activity.movement_count += 1;
        match classifier.classify(movement).class {
            class if class.is_reversal() => activity.reversals += 1,
            MovementClass::Reset => activity.resets += 1,
            MovementClass::Entry => activity.entries += 1,
            _ => activity.exits += 1,
        }
    }

    activity
}

/// Summarize one product's movements for `range`.
///
/// `movements` must be in ledger order and may start before the period; the
/// earlier ones set the opening balance and the last known entry price.
pub fn summarize_period(
    product: &Product,
    range: DateRange,
    movements: &[Movement],
    classifier: &MovementClassifier,
) -> AppResult<PeriodSummary> {
    let mut opening = Decimal::ZERO;
    let mut closing = Decimal::ZERO;
    let mut entry_quantity = Decimal::ZERO;
    let mut entry_value = Decimal::ZERO;
    let mut exit_quantity = Decimal::ZERO;
    let mut exit_value = Decimal::ZERO;
    let mut last_entry_price: Option<Decimal> = None;

    for movement in movements.iter().filter(|m| m.occurred_on <= range.end) {
        let class = classifier.classify(movement).class;
        let in_period = movement.occurred_on >= range.start;
        let overflow = ArithmeticOverflow {
            movement_id: movement.id,
        };

        closing = match class.direction() {
            None => movement.quantity,
            Some(sign) => closing
                .checked_add(sign * movement.abs_quantity())
                .ok_or(overflow)?,
        };
        if !in_period {
            opening = closing;
        }

        if class == MovementClass::Entry {
            if let Some(price) = movement.unit_value {
                last_entry_price = Some(price.abs());
            }
        }

        if !in_period {
            continue;
        }
        let (quantity, value, sign) = match class {
            MovementClass::Entry => (&mut entry_quantity, &mut entry_value, Decimal::ONE),
            MovementClass::ReversalOfEntry => {
                (&mut entry_quantity, &mut entry_value, Decimal::NEGATIVE_ONE)
            }
            MovementClass::Exit => (&mut exit_quantity, &mut exit_value, Decimal::ONE),
            MovementClass::ReversalOfExit => {
                (&mut exit_quantity, &mut exit_value, Decimal::NEGATIVE_ONE)
            }
            MovementClass::Reset => continue,
        };
        *quantity = quantity
            .checked_add(sign * movement.abs_quantity())
            .ok_or(overflow)?;
        *value = value
            .checked_add(sign * movement.abs_value()?)
            .ok_or(overflow)?;
    }

    let overflow =
        || AppError::ArithmeticOverflow(format!("period summary of product {}", product.id));

    let last_entry_price = last_entry_price
        .or_else(|| (product.unit_cost > Decimal::ZERO).then_some(product.unit_cost));
    let exit_price = if exit_quantity > Decimal::ZERO && exit_value > Decimal::ZERO {
        Some(exit_value.checked_div(exit_quantity).ok_or_else(overflow)?)
    } else {
        None
    };

    let (margin, margin_percent) = match (exit_price, last_entry_price) {
        (Some(exit), Some(entry)) => {
            let spread = exit.checked_sub(entry).ok_or_else(overflow)?;
            let margin = spread.checked_mul(exit_quantity).ok_or_else(overflow)?;
            let percent = if entry > Decimal::ZERO {
                let ratio = spread
                    .checked_div(entry)
                    .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
                    .ok_or_else(overflow)?;
                Some(ratio.round_dp(2))
            } else {
                None
            };
            (Some(margin), percent)
        }
        _ => (None, None),
    };
    let net_quantity = entry_quantity
        .checked_sub(exit_quantity)
        .ok_or_else(overflow)?;

    Ok(PeriodSummary {
        product_id: product.id,
        code: product.code.clone(),
        opening_quantity: opening,
        closing_quantity: closing,
        entry_quantity,
        entry_value,
        exit_quantity,
        exit_value,
        net_quantity,
        last_entry_price,
        exit_price,
        margin,
        margin_percent,
    })
}
