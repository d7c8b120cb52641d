//! Purchase recorder
//!
//! Recording a purchase inserts the purchase and its items, adds every line to
//! the stock ledger and writes the shadow expense, all in one transaction.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::models::{
    CreatePurchaseInput, OutstandingEntry, OutstandingSummary, Purchase, PurchaseDetail,
    PurchaseItem, PurchaseListQuery, PurchaseSummary, UpdatePurchaseInput,
};
use shared::pricing::{price_lines, resolve_initial_payment, stock_increments};
use shared::types::{PaginatedResponse, Pagination};

use crate::error::{AppError, AppResult};
use crate::services::{expense, stock, vendor};

const PURCHASE_COLUMNS: &str = "id, branch_id, vendor_id, purchase_date, invoice_number, \
    grand_total, paid_amount, payment_status, payment_method, notes, created_by, created_at, \
    updated_at";

const SUMMARY_SELECT: &str = r#"
    SELECT p.id, p.branch_id, p.vendor_id, p.purchase_date, p.invoice_number, p.grand_total,
           p.paid_amount, p.payment_status, p.payment_method, p.notes, p.created_by,
           p.created_at, p.updated_at, v.name AS vendor_name
    FROM purchases p
    JOIN vendors v ON v.id = p.vendor_id
"#;

const ITEM_SELECT: &str = r#"
    SELECT pi.id, pi.purchase_id, pi.line_no, pi.ingredient_id, i.name AS ingredient_name,
           i.unit, pi.quantity, pi.unit_price, pi.total_price
    FROM purchase_items pi
    JOIN ingredients i ON i.id = pi.ingredient_id
"#;

/// Ingredient fields needed to receive goods
#[derive(Debug, FromRow)]
struct IngredientRef {
    id: Uuid,
    name: String,
    unit: String,
    is_active: bool,
}

#[derive(Debug, FromRow)]
struct ReceivedLine {
    ingredient_id: Uuid,
    quantity: Decimal,
}

#[derive(Clone)]
pub struct PurchaseService {
    db: PgPool,
}

impl PurchaseService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a delivery and receive its goods into stock
    pub async fn create(&self, user_id: Uuid, input: CreatePurchaseInput) -> AppResult<PurchaseDetail> {
        input.validate()?;

        let priced = price_lines(&input.items, input.grand_total)?;
        let (paid_amount, payment_status) =
            resolve_initial_payment(input.payment_status, input.paid_amount, priced.grand_total)?;
        let increments = stock_increments(&priced.lines);

        let mut tx = self.db.begin().await?;

        let vendor = vendor::find_in_branch(&mut *tx, input.vendor_id, input.branch_id).await?;

        let ingredient_ids: Vec<Uuid> = increments.keys().copied().collect();
        let ingredients: HashMap<Uuid, IngredientRef> = sqlx::query_as::<_, IngredientRef>(
            "SELECT id, name, unit, is_active FROM ingredients WHERE branch_id = $1 AND id = ANY($2)",
        )
        .bind(input.branch_id)
        .bind(&ingredient_ids)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|i| (i.id, i))
        .collect();

        for id in &ingredient_ids {
            let ingredient = ingredients
                .get(id)
                .ok_or_else(|| AppError::NotFound(format!("Ingredient {}", id)))?;
            if !ingredient.is_active {
                return Err(AppError::validation(
                    "items",
                    format!("Ingredient {} is inactive", ingredient.name),
                ));
            }
        }

        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            r#"
            INSERT INTO purchases (
                branch_id, vendor_id, purchase_date, invoice_number, grand_total, paid_amount,
                payment_status, payment_method, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PURCHASE_COLUMNS}
            "#
        ))
        .bind(input.branch_id)
        .bind(vendor.id)
        .bind(input.purchase_date.unwrap_or_else(Utc::now))
        .bind(&input.invoice_number)
        .bind(priced.grand_total)
        .bind(paid_amount)
        .bind(payment_status)
        .bind(input.payment_method)
        .bind(&input.notes)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        for line in &priced.lines {
            sqlx::query(
                r#"
                INSERT INTO purchase_items (purchase_id, line_no, ingredient_id, quantity, unit_price, total_price)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(purchase.id)
            .bind(line.line_no)
            .bind(line.ingredient_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.total_price)
            .execute(&mut *tx)
            .await?;
        }

        // BTreeMap order: stock rows are always locked in ingredient id order
        for (ingredient_id, quantity) in &increments {
            let unit = ingredients
                .get(ingredient_id)
                .map(|i| i.unit.as_str())
                .unwrap_or_default();
            stock::upsert_increment(
                &mut *tx,
                *ingredient_id,
                input.branch_id,
                *quantity,
                unit,
                purchase.id,
                Some(user_id),
            )
            .await?;
        }

        expense::insert_purchase_shadow(&mut *tx, &purchase, &vendor.name).await?;

        tx.commit().await?;

        tracing::info!(
            purchase_id = %purchase.id,
            vendor_id = %vendor.id,
            branch_id = %purchase.branch_id,
            grand_total = %purchase.grand_total,
            status = purchase.payment_status.as_str(),
            lines = priced.lines.len(),
            "Purchase recorded"
        );

        self.get(purchase.id).await
    }

    /// Purchase with its vendor name and ingredient-populated items
    pub async fn get(&self, purchase_id: Uuid) -> AppResult<PurchaseDetail> {
        let summary = sqlx::query_as::<_, PurchaseSummary>(&format!("{SUMMARY_SELECT} WHERE p.id = $1"))
            .bind(purchase_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Purchase"))?;

        let items = sqlx::query_as::<_, PurchaseItem>(&format!(
            "{ITEM_SELECT} WHERE pi.purchase_id = $1 ORDER BY pi.line_no"
        ))
        .bind(purchase_id)
        .fetch_all(&self.db)
        .await?;

        Ok(PurchaseDetail {
            purchase: summary.purchase,
            vendor_name: summary.vendor_name,
            items,
        })
    }

    /// Purchases of a branch, newest first
    pub async fn list(
        &self,
        branch_id: Uuid,
        query: PurchaseListQuery,
    ) -> AppResult<PaginatedResponse<PurchaseDetail>> {
        let pagination = Pagination::new(query.page, query.per_page);

        let summaries = sqlx::query_as::<_, PurchaseSummary>(&format!(
            r#"{SUMMARY_SELECT}
            WHERE p.branch_id = $1
              AND ($2::uuid IS NULL OR p.vendor_id = $2)
              AND ($3::varchar IS NULL OR p.payment_status = $3)
            ORDER BY p.purchase_date DESC, p.created_at DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(branch_id)
        .bind(query.vendor_id)
        .bind(query.payment_status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM purchases
            WHERE branch_id = $1
              AND ($2::uuid IS NULL OR vendor_id = $2)
              AND ($3::varchar IS NULL OR payment_status = $3)
            "#,
        )
        .bind(branch_id)
        .bind(query.vendor_id)
        .bind(query.payment_status)
        .fetch_one(&self.db)
        .await?;

        let ids: Vec<Uuid> = summaries.iter().map(|s| s.purchase.id).collect();
        let mut items_by_purchase: HashMap<Uuid, Vec<PurchaseItem>> = HashMap::new();
        for item in sqlx::query_as::<_, PurchaseItem>(&format!(
            "{ITEM_SELECT} WHERE pi.purchase_id = ANY($1) ORDER BY pi.purchase_id, pi.line_no"
        ))
        .bind(&ids)
        .fetch_all(&self.db)
        .await?
        {
            items_by_purchase.entry(item.purchase_id).or_default().push(item);
        }

        let details = summaries
            .into_iter()
            .map(|s| PurchaseDetail {
                items: items_by_purchase.remove(&s.purchase.id).unwrap_or_default(),
                purchase: s.purchase,
                vendor_name: s.vendor_name,
            })
            .collect();

        Ok(PaginatedResponse::new(details, pagination, total))
    }

    /// Edit the non-financial fields of a purchase and its shadow expense
    pub async fn update(&self, existing: Purchase, input: UpdatePurchaseInput) -> AppResult<PurchaseDetail> {
        input.validate()?;

        let invoice_number = input.invoice_number.or(existing.invoice_number);
        let purchase_date = input.purchase_date.unwrap_or(existing.purchase_date);
        let payment_method = input.payment_method.or(existing.payment_method);
        let notes = input.notes.or(existing.notes);

        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            UPDATE purchases
            SET invoice_number = $2, purchase_date = $3, payment_method = $4, notes = $5,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(existing.id)
        .bind(&invoice_number)
        .bind(purchase_date)
        .bind(payment_method)
        .bind(&notes)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE expenses
            SET expense_date = $2, payment_method = $3, updated_at = NOW()
            WHERE purchase_id = $1
            "#,
        )
        .bind(existing.id)
        .bind(purchase_date)
        .bind(payment_method)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get(existing.id).await
    }

    /// Delete an unpaid purchase and take its goods back out of stock
    pub async fn delete(&self, purchase_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = $1 FOR UPDATE"
        ))
        .bind(purchase_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Purchase"))?;

        let allocated = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM vendor_payment_allocations WHERE purchase_id = $1)",
        )
        .bind(purchase_id)
        .fetch_one(&mut *tx)
        .await?;

        if purchase.paid_amount > Decimal::ZERO || allocated {
            return Err(AppError::Conflict(
                "Purchase has payments applied; reverse them before deleting".to_string(),
            ));
        }

        let mut received: BTreeMap<Uuid, Decimal> = BTreeMap::new();
        for line in sqlx::query_as::<_, ReceivedLine>(
            "SELECT ingredient_id, quantity FROM purchase_items WHERE purchase_id = $1",
        )
        .bind(purchase_id)
        .fetch_all(&mut *tx)
        .await?
        {
            *received.entry(line.ingredient_id).or_insert(Decimal::ZERO) += line.quantity;
        }

        for (ingredient_id, quantity) in received {
            stock::decrement(
                &mut *tx,
                ingredient_id,
                purchase.branch_id,
                quantity,
                purchase_id,
                Some(user_id),
            )
            .await?;
        }

        sqlx::query("DELETE FROM expenses WHERE purchase_id = $1")
            .bind(purchase_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM purchases WHERE id = $1")
            .bind(purchase_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(%purchase_id, %user_id, "Purchase deleted and stock reversed");
        Ok(())
    }

    /// Unpaid and partially paid purchases of a vendor, oldest first
    pub async fn outstanding(&self, vendor_id: Uuid, branch_id: Uuid) -> AppResult<OutstandingSummary> {
        let purchases = sqlx::query_as::<_, OutstandingEntry>(
            r#"
            SELECT id AS purchase_id, invoice_number, purchase_date, grand_total, paid_amount,
                   (grand_total - paid_amount) AS due, payment_status
            FROM purchases
            WHERE vendor_id = $1 AND branch_id = $2 AND payment_status IN ('Unpaid', 'Partial')
            ORDER BY purchase_date, created_at
            "#,
        )
        .bind(vendor_id)
        .bind(branch_id)
        .fetch_all(&self.db)
        .await?;

        Ok(OutstandingSummary::new(vendor_id, branch_id, purchases))
    }
}
