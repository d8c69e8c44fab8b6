//! Balance replay: the ordered fold of classified movements

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    AmbiguousMovement, ArithmeticOverflow, BalanceSnapshot, Classification, Movement,
    MovementClass, ProductId, ReplayDiagnostics, ResetPoint,
};

use super::classifier::MovementClassifier;

/// Folds movements of a single product, strictly in ledger order
#[derive(Debug, Clone, Default)]
pub struct BalanceReplayer {
    classifier: MovementClassifier,
}

/// Running state of a replay
#[derive(Debug, Clone)]
pub struct ReplayState {
    snapshot: BalanceSnapshot,
}

/// One folded movement with the balance right after it
#[derive(Debug, Clone, Serialize)]
pub struct ReplayStep {
    pub movement: Movement,
    pub classification: Classification,
    pub quantity_after: Decimal,
    pub value_after: Decimal,
}

impl ReplayState {
    pub fn new(product_id: ProductId, as_of_date: Option<NaiveDate>) -> Self {
        Self {
            snapshot: BalanceSnapshot::empty(product_id, as_of_date),
        }
    }

    /// Apply one classified movement. On overflow the state is left untouched.
    pub fn apply(
        &mut self,
        movement: &Movement,
        classification: &Classification,
    ) -> Result<(), ArithmeticOverflow> {
        let snapshot = &mut self.snapshot;

        match classification.class.direction() {
            None => {
                let value = movement.value()?;
                snapshot.quantity = movement.quantity;
                if let Some(value) = value {
                    snapshot.value = value;
                }
                snapshot.reset_count += 1;
                snapshot.last_reset = Some(ResetPoint {
                    movement_id: movement.id,
                    at: movement.timestamp(),
                    quantity: movement.quantity,
                });
            }
            Some(sign) => {
                let (quantity, value) =
                    shift(snapshot.quantity, snapshot.value, sign, movement)?;
                snapshot.quantity = quantity;
                snapshot.value = value;
            }
        }

        snapshot.movement_count += 1;
        snapshot.last_movement_at = Some(movement.timestamp());
        record(&mut snapshot.diagnostics, movement, classification);
        Ok(())
    }

    pub fn quantity(&self) -> Decimal {
        self.snapshot.quantity
    }

    pub fn value(&self) -> Decimal {
        self.snapshot.value
    }

    pub fn finish(self) -> BalanceSnapshot {
        self.snapshot
    }
}

/// Move a running balance by `sign` times the movement's magnitude
fn shift(
    quantity: Decimal,
    value: Decimal,
    sign: Decimal,
    movement: &Movement,
) -> Result<(Decimal, Decimal), ArithmeticOverflow> {
    let overflow = ArithmeticOverflow {
        movement_id: movement.id,
    };
    let quantity = quantity
        .checked_add(sign * movement.abs_quantity())
        .ok_or(overflow)?;
    let value = value
        .checked_add(sign * movement.abs_value()?)
        .ok_or(overflow)?;
    Ok((quantity, value))
}

/// Count a classification into the diagnostics without touching the balance
pub(crate) fn record(
    diagnostics: &mut ReplayDiagnostics,
    movement: &Movement,
    classification: &Classification,
) {
    *diagnostics.rule_counts.entry(classification.rule).or_default() += 1;
    *diagnostics.class_counts.entry(classification.class).or_default() += 1;
    if let Some(ambiguity) = classification.ambiguity {
        diagnostics.ambiguities.push(AmbiguousMovement {
            movement_id: movement.id,
            ambiguity,
            resolved_as: classification.class,
        });
    }
}

impl BalanceReplayer {
    pub fn new(classifier: MovementClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &MovementClassifier {
        &self.classifier
    }

    /// Replay ordered movements into a snapshot
    pub fn replay(
        &self,
        product_id: ProductId,
        as_of_date: Option<NaiveDate>,
        movements: &[Movement],
    ) -> Result<BalanceSnapshot, ArithmeticOverflow> {
        let mut state = ReplayState::new(product_id, as_of_date);
        for movement in movements {
            let classification = self.classifier.classify(movement);
            state.apply(movement, &classification)?;
        }

        let snapshot = state.finish();
        if snapshot.is_negative() {
            tracing::debug!(product_id, quantity = %snapshot.quantity, "replay ended below zero");
        }
        Ok(snapshot)
    }

    /// Replay and keep the running balance after every movement
    pub fn replay_with_trace(
        &self,
        product_id: ProductId,
        movements: &[Movement],
    ) -> Result<(BalanceSnapshot, Vec<ReplayStep>), ArithmeticOverflow> {
        let mut state = ReplayState::new(product_id, None);
        let mut steps = Vec::with_capacity(movements.len());

        for movement in movements {
            let classification = self.classifier.classify(movement);
            state.apply(movement, &classification)?;
            steps.push(ReplayStep {
                movement: movement.clone(),
                classification,
                quantity_after: state.quantity(),
                value_after: state.value(),
            });
        }

        Ok((state.finish(), steps))
    }

    /// Reverse the effect of a non-reset movement on a running balance.
    /// Returns `Ok(None)` for resets, which cannot be inverted.
    pub fn invert(
        &self,
        quantity: Decimal,
        value: Decimal,
        movement: &Movement,
        class: MovementClass,
    ) -> Result<Option<(Decimal, Decimal)>, ArithmeticOverflow> {
        match class.direction() {
            None => Ok(None),
            Some(sign) => shift(quantity, value, -sign, movement).map(Some),
        }
    }
}
