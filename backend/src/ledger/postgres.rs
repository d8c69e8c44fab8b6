//! PostgreSQL-backed catalog and ledger reader

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use shared::{Movement, MovementKind, Product, ProductId};
use sqlx::{FromRow, PgPool};

use super::{MovementLedger, ProductCatalog};
use crate::error::{AppError, AppResult};

/// Reads `products` and `stock_movements`. Each call borrows a pooled
/// connection for a single statement; no transaction outlives a read.
#[derive(Clone)]
pub struct PgLedger {
    db: PgPool,
}

/// Row for product lookup
#[derive(Debug, FromRow)]
struct ProductRow {
    id: i64,
    code: String,
    name: String,
    unit_cost: Option<Decimal>,
    stock_quantity: Option<Decimal>,
}

/// Row for movement query
#[derive(Debug, FromRow)]
struct MovementRow {
    id: i64,
    product_id: i64,
    movement_date: NaiveDate,
    movement_time: Option<NaiveTime>,
    quantity: Decimal,
    kind_code: Option<String>,
    description: Option<String>,
    document_ref: Option<String>,
    unit_value: Option<Decimal>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            code: row.code,
            name: row.name,
            unit_cost: row.unit_cost.unwrap_or(Decimal::ZERO),
            stored_quantity: row.stock_quantity.unwrap_or(Decimal::ZERO),
        }
    }
}

impl From<MovementRow> for Movement {
    fn from(row: MovementRow) -> Self {
        Movement {
            id: row.id,
            product_id: row.product_id,
            occurred_on: row.movement_date,
            occurred_at: row.movement_time.unwrap_or(NaiveTime::MIN),
            quantity: row.quantity,
            kind: row.kind_code.as_deref().and_then(MovementKind::from_code),
            description: row.description,
            document_ref: row.document_ref,
            unit_value: row.unit_value,
        }
    }
}

impl PgLedger {
    /// Create a new PgLedger instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn product_exists(&self, product_id: ProductId) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
            .bind(product_id)
            .fetch_one(&self.db)
            .await?;
        Ok(exists)
    }
}

#[async_trait]
impl ProductCatalog for PgLedger {
    async fn get_product(&self, product_id: ProductId) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, code, name, unit_cost, stock_quantity
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::product_not_found(product_id))?;

        Ok(row.into())
    }

    async fn product_ids(&self) -> AppResult<Vec<ProductId>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM products ORDER BY id")
            .fetch_all(&self.db)
            .await?;
        Ok(ids)
    }
}

#[async_trait]
impl MovementLedger for PgLedger {
    async fn read(&self, product_id: ProductId, as_of: Option<NaiveDate>) -> AppResult<Vec<Movement>> {
        if !self.product_exists(product_id).await? {
            return Err(AppError::product_not_found(product_id));
        }

        let rows = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT id, product_id, movement_date, movement_time, quantity,
                   kind_code, description, document_ref, unit_value
            FROM stock_movements
            WHERE product_id = $1
              AND ($2::date IS NULL OR movement_date <= $2)
            ORDER BY movement_date ASC, movement_time ASC NULLS FIRST, id ASC
            "#,
        )
        .bind(product_id)
        .bind(as_of)
        .fetch_all(&self.db)
        .await?;

        tracing::debug!(product_id, rows = rows.len(), ?as_of, "ledger read");

        Ok(rows.into_iter().map(Movement::from).collect())
    }
}
