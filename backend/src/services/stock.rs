//! Stock ledger
//!
//! One row per (ingredient, branch) holds the on-hand quantity; every change
//! also appends a `stock_movements` row. The increment and decrement helpers
//! run on the caller's connection so they join the caller's transaction.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::models::{
    AdjustStockInput, Stock, StockListQuery, StockMovement, StockMovementQuery,
    StockMovementReason, StockView,
};
use shared::types::{PaginatedResponse, Pagination};

use crate::error::{AppError, AppResult};

const STOCK_COLUMNS: &str = "id, ingredient_id, branch_id, quantity_in_stock, unit, updated_at";

const STOCK_VIEW_SELECT: &str = r#"
    SELECT s.id, s.ingredient_id, s.branch_id, s.quantity_in_stock, s.unit, s.updated_at,
           i.name AS ingredient_name, i.sku, i.stock_alert,
           (s.quantity_in_stock <= i.stock_alert) AS low_stock
    FROM stock s
    JOIN ingredients i ON i.id = s.ingredient_id
"#;

/// A stock change to append to the ledger
pub struct MovementRecord<'a> {
    pub ingredient_id: Uuid,
    pub branch_id: Uuid,
    pub quantity_changed: Decimal,
    pub quantity_after: Decimal,
    pub reason: StockMovementReason,
    pub reference_id: Option<Uuid>,
    pub notes: Option<&'a str>,
    pub created_by: Option<Uuid>,
}

/// Add `quantity` to the (ingredient, branch) row, creating it on first use.
///
/// `unit` is copied from the ingredient on every call.
pub async fn upsert_increment(
    conn: &mut PgConnection,
    ingredient_id: Uuid,
    branch_id: Uuid,
    quantity: Decimal,
    unit: &str,
    purchase_id: Uuid,
    user_id: Option<Uuid>,
) -> AppResult<Stock> {
    let stock = sqlx::query_as::<_, Stock>(&format!(
        r#"
        INSERT INTO stock (ingredient_id, branch_id, quantity_in_stock, unit)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (ingredient_id, branch_id) DO UPDATE
        SET quantity_in_stock = stock.quantity_in_stock + EXCLUDED.quantity_in_stock,
            unit = EXCLUDED.unit,
            updated_at = NOW()
        RETURNING {STOCK_COLUMNS}
        "#
    ))
    .bind(ingredient_id)
    .bind(branch_id)
    .bind(quantity)
    .bind(unit)
    .fetch_one(&mut *conn)
    .await?;

    record_movement(
        conn,
        MovementRecord {
            ingredient_id,
            branch_id,
            quantity_changed: quantity,
            quantity_after: stock.quantity_in_stock,
            reason: StockMovementReason::Purchase,
            reference_id: Some(purchase_id),
            notes: None,
            created_by: user_id,
        },
    )
    .await?;

    tracing::debug!(
        %ingredient_id,
        %branch_id,
        %quantity,
        on_hand = %stock.quantity_in_stock,
        "Stock incremented"
    );

    Ok(stock)
}

/// Take back `quantity` received by a purchase.
///
/// Fails with `InsufficientStock` when less than `quantity` is on hand.
pub async fn decrement(
    conn: &mut PgConnection,
    ingredient_id: Uuid,
    branch_id: Uuid,
    quantity: Decimal,
    purchase_id: Uuid,
    user_id: Option<Uuid>,
) -> AppResult<Stock> {
    let stock = sqlx::query_as::<_, Stock>(&format!(
        r#"
        UPDATE stock
        SET quantity_in_stock = quantity_in_stock - $3, updated_at = NOW()
        WHERE ingredient_id = $1 AND branch_id = $2 AND quantity_in_stock >= $3
        RETURNING {STOCK_COLUMNS}
        "#
    ))
    .bind(ingredient_id)
    .bind(branch_id)
    .bind(quantity)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| {
        AppError::InsufficientStock(format!(
            "Ingredient {} has less than {} on hand; the purchase cannot be reversed",
            ingredient_id, quantity
        ))
    })?;

    record_movement(
        conn,
        MovementRecord {
            ingredient_id,
            branch_id,
            quantity_changed: -quantity,
            quantity_after: stock.quantity_in_stock,
            reason: StockMovementReason::PurchaseReversal,
            reference_id: Some(purchase_id),
            notes: None,
            created_by: user_id,
        },
    )
    .await?;

    Ok(stock)
}

pub async fn record_movement(
    conn: &mut PgConnection,
    movement: MovementRecord<'_>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            ingredient_id, branch_id, quantity_changed, quantity_after,
            reason, reference_id, notes, created_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(movement.ingredient_id)
    .bind(movement.branch_id)
    .bind(movement.quantity_changed)
    .bind(movement.quantity_after)
    .bind(movement.reason)
    .bind(movement.reference_id)
    .bind(movement.notes)
    .bind(movement.created_by)
    .execute(conn)
    .await?;

    Ok(())
}

/// Stock service for listings and manual corrections
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

impl StockService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Overwrite the on-hand quantity of an existing stock row
    pub async fn adjust(
        &self,
        branch_id: Uuid,
        user_id: Uuid,
        input: AdjustStockInput,
    ) -> AppResult<Stock> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let current = sqlx::query_as::<_, Stock>(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock WHERE ingredient_id = $1 AND branch_id = $2 FOR UPDATE"
        ))
        .bind(input.ingredient_id)
        .bind(branch_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Stock record"))?;

        let stock = sqlx::query_as::<_, Stock>(&format!(
            r#"
            UPDATE stock SET quantity_in_stock = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {STOCK_COLUMNS}
            "#
        ))
        .bind(current.id)
        .bind(input.new_quantity)
        .fetch_one(&mut *tx)
        .await?;

        let difference = input.new_quantity - current.quantity_in_stock;
        record_movement(
            &mut *tx,
            MovementRecord {
                ingredient_id: input.ingredient_id,
                branch_id,
                quantity_changed: difference,
                quantity_after: stock.quantity_in_stock,
                reason: StockMovementReason::Adjustment,
                reference_id: None,
                notes: input.notes.as_deref(),
                created_by: Some(user_id),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            ingredient_id = %input.ingredient_id,
            %branch_id,
            from = %current.quantity_in_stock,
            to = %stock.quantity_in_stock,
            "Stock adjusted"
        );

        Ok(stock)
    }

    /// Stock rows of a branch with ingredient details
    pub async fn list(
        &self,
        branch_id: Uuid,
        query: StockListQuery,
    ) -> AppResult<PaginatedResponse<StockView>> {
        let pagination = Pagination::new(query.page, query.per_page);

        let rows = sqlx::query_as::<_, StockView>(&format!(
            "{STOCK_VIEW_SELECT} WHERE s.branch_id = $1 ORDER BY i.name LIMIT $2 OFFSET $3"
        ))
        .bind(branch_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM stock WHERE branch_id = $1")
            .bind(branch_id)
            .fetch_one(&self.db)
            .await?;

        Ok(PaginatedResponse::new(rows, pagination, total))
    }

    /// Active ingredients at or below their alert threshold
    pub async fn low_stock(&self, branch_id: Uuid) -> AppResult<Vec<StockView>> {
        let rows = sqlx::query_as::<_, StockView>(&format!(
            r#"{STOCK_VIEW_SELECT}
            WHERE s.branch_id = $1 AND i.is_active AND s.quantity_in_stock <= i.stock_alert
            ORDER BY (s.quantity_in_stock - i.stock_alert), i.name
            "#
        ))
        .bind(branch_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Ledger history, newest first
    pub async fn movements(
        &self,
        branch_id: Uuid,
        query: StockMovementQuery,
    ) -> AppResult<PaginatedResponse<StockMovement>> {
        let pagination = Pagination::new(query.page, query.per_page);

        let rows = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, ingredient_id, branch_id, quantity_changed, quantity_after,
                   reason, reference_id, notes, created_by, created_at
            FROM stock_movements
            WHERE branch_id = $1 AND ($2::uuid IS NULL OR ingredient_id = $2)
            ORDER BY created_at DESC, seq DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(branch_id)
        .bind(query.ingredient_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM stock_movements
            WHERE branch_id = $1 AND ($2::uuid IS NULL OR ingredient_id = $2)
            "#,
        )
        .bind(branch_id)
        .bind(query.ingredient_id)
        .fetch_one(&self.db)
        .await?;

        Ok(PaginatedResponse::new(rows, pagination, total))
    }
}
