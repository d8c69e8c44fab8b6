//! Stock movement models

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ProductId;

/// Ledger identifier of a movement; also its insertion order
pub type MovementId = i64;

/// A single append-only stock movement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movement {
    pub id: MovementId,
    pub product_id: ProductId,
    pub occurred_on: NaiveDate,
    pub occurred_at: NaiveTime,
    /// Signed or unsigned depending on the upstream source
    pub quantity: Decimal,
    pub kind: Option<MovementKind>,
    /// Free text written by operators
    pub description: Option<String>,
    pub document_ref: Option<String>,
    pub unit_value: Option<Decimal>,
}

impl Movement {
    /// Total ordering key within one product's ledger
    pub fn ordering_key(&self) -> (NaiveDate, NaiveTime, MovementId) {
        (self.occurred_on, self.occurred_at, self.id)
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.occurred_on.and_time(self.occurred_at)
    }

    pub fn abs_quantity(&self) -> Decimal {
        self.quantity.abs()
    }

    /// Monetary value carried by the movement, when a unit value was recorded
    pub fn value(&self) -> Result<Option<Decimal>, ArithmeticOverflow> {
        match self.unit_value {
            None => Ok(None),
            Some(unit) => unit
                .checked_mul(self.quantity)
                .map(Some)
                .ok_or(ArithmeticOverflow { movement_id: self.id }),
        }
    }

    pub fn abs_value(&self) -> Result<Decimal, ArithmeticOverflow> {
        Ok(self.value()?.map(|v| v.abs()).unwrap_or(Decimal::ZERO))
    }
}

/// A quantity or value derived from a movement left the `Decimal` range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("arithmetic overflow at movement {movement_id}")]
pub struct ArithmeticOverflow {
    pub movement_id: MovementId,
}

/// Structured kind code recorded by some upstream sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Entry,
    Exit,
}

impl MovementKind {
    /// Parse a legacy kind code. Unknown codes carry no structured kind.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "E" | "ENTRADA" | "ENTRY" | "IN" => Some(MovementKind::Entry),
            "S" | "SAIDA" | "EXIT" | "OUT" => Some(MovementKind::Exit),
            _ => None,
        }
    }
}

/// Outcome of classifying a movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementClass {
    Reset,
    Entry,
    Exit,
    ReversalOfEntry,
    ReversalOfExit,
}

impl MovementClass {
    /// Sign applied to the absolute quantity when folding.
    /// `None` for resets, which replace the balance instead.
    pub fn direction(&self) -> Option<Decimal> {
        match self {
            MovementClass::Reset => None,
            MovementClass::Entry | MovementClass::ReversalOfExit => Some(Decimal::ONE),
            MovementClass::Exit | MovementClass::ReversalOfEntry => Some(Decimal::NEGATIVE_ONE),
        }
    }

    pub fn is_reversal(&self) -> bool {
        matches!(
            self,
            MovementClass::ReversalOfEntry | MovementClass::ReversalOfExit
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementClass::Reset => "RESET",
            MovementClass::Entry => "ENTRY",
            MovementClass::Exit => "EXIT",
            MovementClass::ReversalOfEntry => "REVERSAL_OF_ENTRY",
            MovementClass::ReversalOfExit => "REVERSAL_OF_EXIT",
        }
    }
}

impl std::fmt::Display for MovementClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of the decision table that produced a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationRule {
    ResetSentinel,
    ResetPhrase,
    CancelledPurchase,
    CancelledSale,
    PurchaseMarker,
    EntryKind,
    SaleMarker,
    ExitKind,
    PositiveQuantity,
    NegativeQuantity,
}

/// Conflicting signals found while classifying a movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ambiguity {
    /// Text carries both purchase and sale markers
    PurchaseAndSaleMarkers,
    /// A text marker points the other way from the structured kind
    TextContradictsKind,
    /// Cancellation marker with nothing saying what was cancelled
    DanglingCancellation,
    /// Reset marker alongside entry/exit/cancellation markers
    ResetWithOtherMarkers,
}

/// Classification of one movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub class: MovementClass,
    pub rule: ClassificationRule,
    pub ambiguity: Option<Ambiguity>,
}
