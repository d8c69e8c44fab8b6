//! Movement classification decision table
//!
//! Rows are evaluated top to bottom and the first match wins:
//!
//! | # | condition                                             | class             |
//! |---|-------------------------------------------------------|-------------------|
//! | 1 | document ref is the reset sentinel                    | RESET             |
//! | 1 | text has a reset phrase                               | RESET             |
//! | 2 | text has a cancellation marker and a purchase marker  | REVERSAL_OF_ENTRY |
//! | 3 | text has a cancellation marker and a sale marker      | REVERSAL_OF_EXIT  |
//! | 4 | text has a purchase marker, or kind is ENTRY          | ENTRY             |
//! | 5 | text has a sale marker, or kind is EXIT               | EXIT              |
//! | 6 | quantity >= 0                                         | ENTRY             |
//! | 6 | quantity < 0                                          | EXIT              |
//!
//! Cancellation rows precede the plain purchase/sale rows because a
//! cancellation's text also names the operation it cancels.

use rust_decimal::Decimal;
use shared::{Ambiguity, Classification, ClassificationRule, Movement, MovementClass, MovementKind};

use crate::config::ClassifierConfig;

/// Pure classifier over a movement's own fields
#[derive(Debug, Clone)]
pub struct MovementClassifier {
    reset_sentinel: String,
    reset_phrases: Vec<String>,
    cancellation_markers: Vec<String>,
    purchase_markers: Vec<String>,
    sale_markers: Vec<String>,
}

/// Which marker families a description mentions
#[derive(Debug, Default, Clone, Copy)]
struct Markers {
    reset: bool,
    cancellation: bool,
    purchase: bool,
    sale: bool,
}

impl Default for MovementClassifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}

impl MovementClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        let fold_all = |items: &[String]| -> Vec<String> {
            items
                .iter()
                .map(|s| fold_text(s))
                .filter(|s| !s.is_empty())
                .collect()
        };

        Self {
            reset_sentinel: config.reset_sentinel.trim().to_uppercase(),
            reset_phrases: fold_all(&config.reset_phrases),
            cancellation_markers: fold_all(&config.cancellation_markers),
            purchase_markers: fold_all(&config.purchase_markers),
            sale_markers: fold_all(&config.sale_markers),
        }
    }

    /// Classify a movement. Total: every movement resolves to exactly one class.
    pub fn classify(&self, movement: &Movement) -> Classification {
        let markers = self.scan(movement.description.as_deref());
        let sentinel = movement
            .document_ref
            .as_deref()
            .map(|doc| doc.trim().to_uppercase() == self.reset_sentinel)
            .unwrap_or(false);

        if sentinel || markers.reset {
            let rule = if sentinel {
                ClassificationRule::ResetSentinel
            } else {
                ClassificationRule::ResetPhrase
            };
            let ambiguity = (markers.cancellation || markers.purchase || markers.sale)
                .then_some(Ambiguity::ResetWithOtherMarkers);
            return resolved(MovementClass::Reset, rule, ambiguity);
        }

        let both = markers.purchase && markers.sale;

        if markers.cancellation && markers.purchase {
            let ambiguity = both.then_some(Ambiguity::PurchaseAndSaleMarkers);
            return resolved(
                MovementClass::ReversalOfEntry,
                ClassificationRule::CancelledPurchase,
                ambiguity,
            );
        }

        if markers.cancellation && markers.sale {
            return resolved(
                MovementClass::ReversalOfExit,
                ClassificationRule::CancelledSale,
                None,
            );
        }

        let dangling = markers.cancellation.then_some(Ambiguity::DanglingCancellation);

        if markers.purchase || movement.kind == Some(MovementKind::Entry) {
            let rule = if markers.purchase {
                ClassificationRule::PurchaseMarker
            } else {
                ClassificationRule::EntryKind
            };
            let ambiguity = if both {
                Some(Ambiguity::PurchaseAndSaleMarkers)
            } else if markers.purchase && movement.kind == Some(MovementKind::Exit) {
                Some(Ambiguity::TextContradictsKind)
            } else if !markers.purchase && markers.sale {
                // kind says entry, text says sale
                Some(Ambiguity::TextContradictsKind)
            } else {
                dangling
            };
            return resolved(MovementClass::Entry, rule, ambiguity);
        }

        if markers.sale || movement.kind == Some(MovementKind::Exit) {
            let rule = if markers.sale {
                ClassificationRule::SaleMarker
            } else {
                ClassificationRule::ExitKind
            };
            return resolved(MovementClass::Exit, rule, dangling);
        }

        if movement.quantity >= Decimal::ZERO {
            resolved(MovementClass::Entry, ClassificationRule::PositiveQuantity, dangling)
        } else {
            resolved(MovementClass::Exit, ClassificationRule::NegativeQuantity, dangling)
        }
    }

    fn scan(&self, description: Option<&str>) -> Markers {
        let Some(text) = description.map(fold_text).filter(|t| !t.is_empty()) else {
            return Markers::default();
        };
        let any = |markers: &[String]| markers.iter().any(|m| text.contains(m.as_str()));

        Markers {
            reset: any(&self.reset_phrases),
            cancellation: any(&self.cancellation_markers),
            purchase: any(&self.purchase_markers),
            sale: any(&self.sale_markers),
        }
    }
}

fn resolved(
    class: MovementClass,
    rule: ClassificationRule,
    ambiguity: Option<Ambiguity>,
) -> Classification {
    Classification {
        class,
        rule,
        ambiguity,
    }
}

/// Upper-case and strip Portuguese diacritics so "Exclusão" matches "EXCLUSAO"
pub fn fold_text(text: &str) -> String {
    text.trim()
        .chars()
        .flat_map(char::to_uppercase)
        .map(|c| match c {
            'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}
