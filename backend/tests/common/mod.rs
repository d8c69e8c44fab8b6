//! Fixtures shared by the engine integration tests

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use shared::{MovementKind, Product, ProductId};
use stock_balance_engine::config::{ClassifierConfig, EngineConfig};
use stock_balance_engine::ledger::{InMemoryLedger, NewMovement};
use stock_balance_engine::StockEngine;

pub const RESET_DOC: &str = "SALDO_INICIAL";

// Helper to create Decimal from string
pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn day(year: i32, month: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, d).unwrap()
}

pub fn jan(d: u32) -> NaiveDate {
    day(2025, 1, d)
}

pub fn product(id: ProductId, stored: &str) -> Product {
    Product {
        id,
        code: format!("SKU-{id:04}"),
        name: format!("Product {id}"),
        unit_cost: Decimal::ZERO,
        stored_quantity: dec(stored),
    }
}

pub fn reset(on: NaiveDate, quantity: &str) -> NewMovement {
    NewMovement {
        occurred_on: Some(on),
        quantity: dec(quantity),
        document_ref: Some(RESET_DOC.to_string()),
        ..Default::default()
    }
}

pub fn text(on: NaiveDate, quantity: &str, description: &str) -> NewMovement {
    NewMovement {
        occurred_on: Some(on),
        quantity: dec(quantity),
        description: Some(description.to_string()),
        ..Default::default()
    }
}

pub fn priced(on: NaiveDate, quantity: &str, description: &str, unit_value: &str) -> NewMovement {
    NewMovement {
        unit_value: Some(dec(unit_value)),
        ..text(on, quantity, description)
    }
}

pub fn kind(on: NaiveDate, quantity: &str, kind: MovementKind) -> NewMovement {
    NewMovement {
        occurred_on: Some(on),
        quantity: dec(quantity),
        kind: Some(kind),
        ..Default::default()
    }
}

pub fn at(mut movement: NewMovement, h: u32, m: u32) -> NewMovement {
    movement.occurred_at = NaiveTime::from_hms_opt(h, m, 0);
    movement
}

pub fn ledger_with(products: &[Product]) -> Arc<InMemoryLedger> {
    let ledger = Arc::new(InMemoryLedger::new());
    for p in products {
        ledger.add_product(p.clone()).unwrap();
    }
    ledger
}

pub fn append_all(ledger: &InMemoryLedger, product_id: ProductId, movements: Vec<NewMovement>) {
    for movement in movements {
        ledger.append(product_id, movement).unwrap();
    }
}

/// RESET 100 on Jan 1, "COMPRA" 20 on Jan 5, "VENDA" 30 on Jan 10
pub fn scenario_a() -> Vec<NewMovement> {
    vec![
        reset(jan(1), "100"),
        text(jan(5), "20", "COMPRA"),
        text(jan(10), "30", "VENDA"),
    ]
}

pub fn engine_config() -> EngineConfig {
    EngineConfig {
        worker_limit: 4,
        ..EngineConfig::default()
    }
}

pub fn engine_for(ledger: &Arc<InMemoryLedger>) -> StockEngine {
    engine_with(ledger, &engine_config())
}

pub fn engine_with(ledger: &Arc<InMemoryLedger>, config: &EngineConfig) -> StockEngine {
    StockEngine::new(
        ledger.clone(),
        ledger.clone(),
        config,
        &ClassifierConfig::default(),
    )
}
