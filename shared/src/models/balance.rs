//! Computed balance snapshots and replay diagnostics

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Ambiguity, ClassificationRule, MovementClass, MovementId, ProductId};

/// Point-in-time balance of one product, computed from its ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub product_id: ProductId,
    pub quantity: Decimal,
    pub value: Decimal,
    /// `None` when every recorded movement was replayed
    pub as_of_date: Option<NaiveDate>,
    pub movement_count: u64,
    pub reset_count: u64,
    pub last_movement_at: Option<NaiveDateTime>,
    pub last_reset: Option<ResetPoint>,
    pub strategy: Strategy,
    pub diagnostics: ReplayDiagnostics,
}

impl BalanceSnapshot {
    pub fn empty(product_id: ProductId, as_of_date: Option<NaiveDate>) -> Self {
        Self {
            product_id,
            quantity: Decimal::ZERO,
            value: Decimal::ZERO,
            as_of_date,
            movement_count: 0,
            reset_count: 0,
            last_movement_at: None,
            last_reset: None,
            strategy: Strategy::Forward,
            diagnostics: ReplayDiagnostics::default(),
        }
    }

    /// Negative stock is a reportable business state, not an error
    pub fn is_negative(&self) -> bool {
        self.quantity < Decimal::ZERO
    }
}

/// The most recent reset folded into a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetPoint {
    pub movement_id: MovementId,
    pub at: NaiveDateTime,
    pub quantity: Decimal,
}

/// How a point-in-time balance was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Replay the ledger from the beginning up to the target date
    #[default]
    Forward,
    /// Start from the stored quantity and invert later movements
    Reverse,
}

/// Audit trail of how the classifier resolved the replayed movements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayDiagnostics {
    pub rule_counts: BTreeMap<ClassificationRule, u64>,
    pub class_counts: BTreeMap<MovementClass, u64>,
    pub ambiguities: Vec<AmbiguousMovement>,
    /// Set when a reverse walk hit a reset and fell back to forward replay
    pub reanchored_at: Option<MovementId>,
}

impl ReplayDiagnostics {
    pub fn ambiguity_count(&self) -> usize {
        self.ambiguities.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbiguousMovement {
    pub movement_id: MovementId,
    pub ambiguity: Ambiguity,
    pub resolved_as: MovementClass,
}
