//! Movement classifier tests
//!
//! Covers every row of the decision table, the row precedence, and the
//! ambiguity audit trail.

mod common;

use chrono::NaiveTime;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{Ambiguity, ClassificationRule, Movement, MovementClass, MovementKind};
use stock_balance_engine::config::ClassifierConfig;
use stock_balance_engine::services::MovementClassifier;

use common::{dec, jan, RESET_DOC};

fn movement(quantity: &str, description: Option<&str>, document_ref: Option<&str>) -> Movement {
    Movement {
        id: 1,
        product_id: 1,
        occurred_on: jan(1),
        occurred_at: NaiveTime::MIN,
        quantity: dec(quantity),
        kind: None,
        description: description.map(str::to_string),
        document_ref: document_ref.map(str::to_string),
        unit_value: None,
    }
}

fn classify(m: &Movement) -> (MovementClass, ClassificationRule, Option<Ambiguity>) {
    let c = MovementClassifier::default().classify(m);
    (c.class, c.rule, c.ambiguity)
}

// ============================================================================
// Decision table rows
// ============================================================================

#[test]
fn test_reset_by_sentinel_document() {
    let m = movement("100", None, Some(RESET_DOC));
    assert_eq!(classify(&m), (MovementClass::Reset, ClassificationRule::ResetSentinel, None));
}

#[test]
fn test_reset_sentinel_is_case_insensitive() {
    let m = movement("100", None, Some(" saldo_inicial "));
    assert_eq!(classify(&m).0, MovementClass::Reset);
}

#[test]
fn test_reset_by_phrase() {
    let m = movement("40", Some("Saldo inicial do produto"), None);
    assert_eq!(classify(&m).1, ClassificationRule::ResetPhrase);
}

#[test]
fn test_cancelled_purchase_is_reversal_of_entry() {
    let m = movement("20", Some("EXCLUSAO COMPRA NF 123"), None);
    assert_eq!(
        classify(&m),
        (MovementClass::ReversalOfEntry, ClassificationRule::CancelledPurchase, None)
    );
}

#[test]
fn test_cancelled_sale_is_reversal_of_exit() {
    let m = movement("30", Some("EXCLUSAO VENDA"), None);
    assert_eq!(
        classify(&m),
        (MovementClass::ReversalOfExit, ClassificationRule::CancelledSale, None)
    );
}

#[test]
fn test_accented_cancellation_text() {
    let m = movement("30", Some("Exclusão de venda"), None);
    assert_eq!(classify(&m).0, MovementClass::ReversalOfExit);
}

#[test]
fn test_purchase_marker_is_entry() {
    let m = movement("-5", Some("compra fornecedor"), None);
    assert_eq!(classify(&m), (MovementClass::Entry, ClassificationRule::PurchaseMarker, None));
}

#[test]
fn test_sale_marker_is_exit() {
    let m = movement("5", Some("VENDA balcão"), None);
    assert_eq!(classify(&m), (MovementClass::Exit, ClassificationRule::SaleMarker, None));
}

#[test]
fn test_structured_kind_without_text() {
    let mut m = movement("-3", None, None);
    m.kind = Some(MovementKind::Entry);
    assert_eq!(classify(&m), (MovementClass::Entry, ClassificationRule::EntryKind, None));

    m.kind = Some(MovementKind::Exit);
    m.quantity = dec("3");
    assert_eq!(classify(&m), (MovementClass::Exit, ClassificationRule::ExitKind, None));
}

#[test]
fn test_sign_default() {
    assert_eq!(
        classify(&movement("0", None, None)).1,
        ClassificationRule::PositiveQuantity
    );
    assert_eq!(
        classify(&movement("12.5", Some("ajuste"), None)).0,
        MovementClass::Entry
    );
    assert_eq!(
        classify(&movement("-12.5", Some("ajuste"), None)),
        (MovementClass::Exit, ClassificationRule::NegativeQuantity, None)
    );
}

// ============================================================================
// Precedence and ambiguity
// ============================================================================

#[test]
fn test_reset_wins_over_everything_and_is_flagged() {
    let m = movement("10", Some("VENDA"), Some(RESET_DOC));
    assert_eq!(
        classify(&m),
        (
            MovementClass::Reset,
            ClassificationRule::ResetSentinel,
            Some(Ambiguity::ResetWithOtherMarkers)
        )
    );
}

#[test]
fn test_cancellation_precedes_plain_markers() {
    // The text of a cancellation also contains the keyword it cancels
    let mut m = movement("10", Some("ESTORNO DE VENDA"), None);
    m.kind = Some(MovementKind::Exit);
    assert_eq!(classify(&m).0, MovementClass::ReversalOfExit);
}

#[test]
fn test_cancellation_with_both_markers_prefers_purchase() {
    let m = movement("10", Some("CANCELAMENTO COMPRA/VENDA"), None);
    assert_eq!(
        classify(&m),
        (
            MovementClass::ReversalOfEntry,
            ClassificationRule::CancelledPurchase,
            Some(Ambiguity::PurchaseAndSaleMarkers)
        )
    );
}

#[test]
fn test_purchase_and_sale_markers_resolve_as_entry() {
    let m = movement("10", Some("COMPRA PARA VENDA"), None);
    assert_eq!(
        classify(&m),
        (
            MovementClass::Entry,
            ClassificationRule::PurchaseMarker,
            Some(Ambiguity::PurchaseAndSaleMarkers)
        )
    );
}

#[test]
fn test_text_contradicting_kind_is_flagged() {
    let mut m = movement("10", Some("COMPRA"), None);
    m.kind = Some(MovementKind::Exit);
    assert_eq!(classify(&m).2, Some(Ambiguity::TextContradictsKind));
    assert_eq!(classify(&m).0, MovementClass::Entry);

    let mut m = movement("10", Some("VENDA"), None);
    m.kind = Some(MovementKind::Entry);
    assert_eq!(classify(&m).2, Some(Ambiguity::TextContradictsKind));
}

#[test]
fn test_dangling_cancellation_falls_back_to_sign() {
    let m = movement("-4", Some("EXCLUSAO"), None);
    assert_eq!(
        classify(&m),
        (
            MovementClass::Exit,
            ClassificationRule::NegativeQuantity,
            Some(Ambiguity::DanglingCancellation)
        )
    );
}

#[test]
fn test_custom_markers() {
    let config = ClassifierConfig {
        reset_sentinel: "INV".into(),
        reset_phrases: vec!["STOCKTAKE".into()],
        cancellation_markers: vec!["VOID".into()],
        purchase_markers: vec!["PURCHASE".into()],
        sale_markers: vec!["SALE".into()],
    };
    let classifier = MovementClassifier::new(&config);

    assert_eq!(
        classifier.classify(&movement("1", Some("void purchase"), None)).class,
        MovementClass::ReversalOfEntry
    );
    assert_eq!(
        classifier.classify(&movement("1", None, Some("inv"))).class,
        MovementClass::Reset
    );
    // Default markers no longer apply
    assert_eq!(
        classifier.classify(&movement("-1", Some("COMPRA"), None)).class,
        MovementClass::Exit
    );
}

// ============================================================================
// Property Tests
// ============================================================================

fn arb_description() -> impl Strategy<Value = Option<String>> {
    let words = prop::sample::select(vec![
        "COMPRA", "VENDA", "EXCLUSAO", "ESTORNO", "SALDO INICIAL", "AJUSTE", "NF", "saída", "entrada",
    ]);
    prop::option::of(prop::collection::vec(words, 0..4).prop_map(|w| w.join(" ")))
}

fn arb_movement() -> impl Strategy<Value = Movement> {
    (
        -1_000i64..1_000,
        arb_description(),
        prop::option::of(prop::sample::select(vec![RESET_DOC, "NF-1", "PED-9"])),
        prop::option::of(prop::sample::select(vec![MovementKind::Entry, MovementKind::Exit])),
    )
        .prop_map(|(q, description, document_ref, kind)| Movement {
            id: 1,
            product_id: 1,
            occurred_on: jan(1),
            occurred_at: NaiveTime::MIN,
            quantity: Decimal::new(q, 1),
            kind,
            description,
            document_ref: document_ref.map(str::to_string),
            unit_value: None,
        })
}

proptest! {
    /// Classification depends only on the movement's own fields
    #[test]
    fn prop_classification_is_deterministic(m in arb_movement()) {
        let classifier = MovementClassifier::default();
        prop_assert_eq!(classifier.classify(&m), classifier.classify(&m.clone()));
    }

    /// Ids, dates and unit values never change the class
    #[test]
    fn prop_classification_ignores_position(m in arb_movement(), id in 1i64..10_000, d in 1u32..28) {
        let classifier = MovementClassifier::default();
        let mut moved = m.clone();
        moved.id = id;
        moved.occurred_on = jan(d);
        moved.unit_value = Some(Decimal::ONE);
        prop_assert_eq!(classifier.classify(&m), classifier.classify(&moved));
    }

    /// Sentinel document always resets, whatever the text says
    #[test]
    fn prop_sentinel_always_resets(mut m in arb_movement()) {
        m.document_ref = Some(RESET_DOC.to_string());
        prop_assert_eq!(MovementClassifier::default().classify(&m).class, MovementClass::Reset);
    }
}
