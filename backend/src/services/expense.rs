//! Expense service and expense mirrors
//!
//! Purchases and vendor payments keep a mirror expense in sync through the
//! helpers at the top of this module. The guard rules deciding what may be
//! edited or deleted live in `shared::expense_link`.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::expense_link::{
    check_delete, check_update, contains_payment_reference, format_payment_note,
    resolve_amounts, strip_payment_reference, DeleteRoute, ExpenseGuardError, UpdateRoute,
};
use shared::models::{
    CreateExpenseInput, Expense, ExpenseCategory, ExpenseListQuery, Purchase,
    UpdateExpenseInput, VendorPayment,
};
use shared::settlement::PaymentStatus;
use shared::types::{PaginatedResponse, Pagination};

use crate::error::{AppError, AppResult};
use crate::services::{branch, vendor_payment};

const EXPENSE_COLUMNS: &str = "id, branch_id, title, category, vendor_name, total_amount, \
    paid_amount, payment_status, payment_method, expense_date, note, purchase_id, \
    vendor_payment_id, created_by, created_at, updated_at";

// ============================================================================
// Mirrors
// ============================================================================

/// Shadow expense of a newly recorded purchase
pub async fn insert_purchase_shadow(
    conn: &mut PgConnection,
    purchase: &Purchase,
    vendor_name: &str,
) -> AppResult<Expense> {
    let title = match purchase.invoice_number.as_deref() {
        Some(invoice) => format!("Purchase {} from {}", invoice, vendor_name),
        None => format!("Purchase from {}", vendor_name),
    };

    let expense = sqlx::query_as::<_, Expense>(&format!(
        r#"
        INSERT INTO expenses (
            branch_id, title, category, vendor_name, total_amount, paid_amount,
            payment_status, payment_method, expense_date, note, purchase_id, created_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING {EXPENSE_COLUMNS}
        "#
    ))
    .bind(purchase.branch_id)
    .bind(&title)
    .bind(ExpenseCategory::Vendor)
    .bind(vendor_name)
    .bind(purchase.grand_total)
    .bind(purchase.paid_amount)
    .bind(purchase.payment_status)
    .bind(purchase.payment_method)
    .bind(purchase.purchase_date)
    .bind(&purchase.notes)
    .bind(purchase.id)
    .bind(purchase.created_by)
    .fetch_one(conn)
    .await?;

    Ok(expense)
}

/// Copy a purchase's settlement state onto its shadow expense
pub async fn sync_purchase_shadow(
    conn: &mut PgConnection,
    purchase_id: Uuid,
    paid_amount: Decimal,
    payment_status: PaymentStatus,
) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE expenses
        SET paid_amount = $2, payment_status = $3, updated_at = NOW()
        WHERE purchase_id = $1
        "#,
    )
    .bind(purchase_id)
    .bind(paid_amount)
    .bind(payment_status)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        tracing::warn!(%purchase_id, "Purchase has no shadow expense to update");
    }
    Ok(())
}

/// Mirror expense of a vendor payment: fully paid, amount equal to the payment
pub async fn insert_payment_mirror(
    conn: &mut PgConnection,
    payment: &VendorPayment,
    vendor_name: &str,
) -> AppResult<Expense> {
    let note = format_payment_note(payment.notes.as_deref(), payment.id);

    let expense = sqlx::query_as::<_, Expense>(&format!(
        r#"
        INSERT INTO expenses (
            branch_id, title, category, vendor_name, total_amount, paid_amount,
            payment_status, payment_method, expense_date, note, vendor_payment_id, created_by
        )
        VALUES ($1, $2, $3, $4, $5, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {EXPENSE_COLUMNS}
        "#
    ))
    .bind(payment.branch_id)
    .bind(format!("Payment to {}", vendor_name))
    .bind(ExpenseCategory::Vendor)
    .bind(vendor_name)
    .bind(payment.amount_paid)
    .bind(PaymentStatus::Paid)
    .bind(payment.payment_method)
    .bind(payment.payment_date)
    .bind(&note)
    .bind(payment.id)
    .bind(payment.created_by)
    .fetch_one(conn)
    .await?;

    Ok(expense)
}

// ============================================================================
// Expense service
// ============================================================================

#[derive(Clone)]
pub struct ExpenseService {
    db: PgPool,
}

impl ExpenseService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a free expense
    pub async fn create(&self, user_id: Uuid, input: CreateExpenseInput) -> AppResult<Expense> {
        input.validate()?;
        if input.note.as_deref().is_some_and(contains_payment_reference) {
            return Err(ExpenseGuardError::ReservedReference.into());
        }
        branch::ensure_exists(&self.db, input.branch_id).await?;

        let (total, paid, status) = resolve_amounts(input.total_amount, input.paid_amount)?;

        let expense = sqlx::query_as::<_, Expense>(&format!(
            r#"
            INSERT INTO expenses (
                branch_id, title, category, vendor_name, total_amount, paid_amount,
                payment_status, payment_method, expense_date, note, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {EXPENSE_COLUMNS}
            "#
        ))
        .bind(input.branch_id)
        .bind(input.title.trim())
        .bind(input.category)
        .bind(&input.vendor_name)
        .bind(total)
        .bind(paid)
        .bind(status)
        .bind(input.payment_method)
        .bind(input.expense_date.unwrap_or_else(Utc::now))
        .bind(&input.note)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(expense)
    }

    pub async fn get(&self, expense_id: Uuid) -> AppResult<Expense> {
        sqlx::query_as::<_, Expense>(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = $1"
        ))
        .bind(expense_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Expense"))
    }

    pub async fn list(
        &self,
        branch_id: Uuid,
        query: ExpenseListQuery,
    ) -> AppResult<PaginatedResponse<Expense>> {
        let pagination = Pagination::new(query.page, query.per_page);

        let expenses = sqlx::query_as::<_, Expense>(&format!(
            r#"
            SELECT {EXPENSE_COLUMNS} FROM expenses
            WHERE branch_id = $1 AND ($2::varchar IS NULL OR category = $2)
            ORDER BY expense_date DESC, created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(branch_id)
        .bind(query.category)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM expenses WHERE branch_id = $1 AND ($2::varchar IS NULL OR category = $2)",
        )
        .bind(branch_id)
        .bind(query.category)
        .fetch_one(&self.db)
        .await?;

        Ok(PaginatedResponse::new(expenses, pagination, total))
    }

    /// Apply an update allowed by the expense guard
    pub async fn update(&self, expense_id: Uuid, patch: UpdateExpenseInput) -> AppResult<Expense> {
        patch.validate()?;

        let mut tx = self.db.begin().await?;
        let existing = lock_expense(&mut *tx, expense_id).await?;

        let expense = match check_update(&existing, &patch)? {
            UpdateRoute::Free => {
                let total = patch.total_amount.unwrap_or(existing.total_amount);
                let paid = patch.paid_amount.unwrap_or(existing.paid_amount);
                let (total, paid, status) = resolve_amounts(total, Some(paid))?;

                sqlx::query_as::<_, Expense>(&format!(
                    r#"
                    UPDATE expenses
                    SET title = $2, category = $3, vendor_name = $4, total_amount = $5,
                        paid_amount = $6, payment_status = $7, payment_method = $8,
                        expense_date = $9, note = $10, updated_at = NOW()
                    WHERE id = $1
                    RETURNING {EXPENSE_COLUMNS}
                    "#
                ))
                .bind(existing.id)
                .bind(patch.title.as_deref().map(str::trim).unwrap_or(&existing.title))
                .bind(patch.category.unwrap_or(existing.category))
                .bind(patch.vendor_name.as_ref().or(existing.vendor_name.as_ref()))
                .bind(total)
                .bind(paid)
                .bind(status)
                .bind(patch.payment_method.or(existing.payment_method))
                .bind(patch.expense_date.unwrap_or(existing.expense_date))
                .bind(patch.note.as_ref().or(existing.note.as_ref()))
                .fetch_one(&mut *tx)
                .await?
            }
            UpdateRoute::SyncVendorPayment(payment_id) => {
                self.update_payment_mirror(&mut *tx, &existing, patch, payment_id)
                    .await?
            }
        };

        tx.commit().await?;
        Ok(expense)
    }

    /// Date, method and notes of a payment mirror, copied to the payment itself.
    ///
    /// The reference suffix of the note is always rebuilt.
    async fn update_payment_mirror(
        &self,
        conn: &mut PgConnection,
        existing: &Expense,
        patch: UpdateExpenseInput,
        payment_id: Uuid,
    ) -> AppResult<Expense> {
        let user_notes = match patch.note.as_deref() {
            Some(note) => strip_payment_reference(note),
            None => existing.note.as_deref().and_then(strip_payment_reference),
        };
        let note = format_payment_note(user_notes.as_deref(), payment_id);
        let expense_date = patch.expense_date.unwrap_or(existing.expense_date);
        let payment_method = patch.payment_method.or(existing.payment_method);

        let expense = sqlx::query_as::<_, Expense>(&format!(
            r#"
            UPDATE expenses
            SET title = $2, payment_method = $3, expense_date = $4, note = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {EXPENSE_COLUMNS}
            "#
        ))
        .bind(existing.id)
        .bind(patch.title.as_deref().map(str::trim).unwrap_or(&existing.title))
        .bind(payment_method)
        .bind(expense_date)
        .bind(&note)
        .fetch_one(&mut *conn)
        .await?;

        let synced = sqlx::query(
            r#"
            UPDATE vendor_payments
            SET payment_date = $2, payment_method = COALESCE($3, payment_method), notes = $4
            WHERE id = $1
            "#,
        )
        .bind(payment_id)
        .bind(expense_date)
        .bind(payment_method)
        .bind(&user_notes)
        .execute(&mut *conn)
        .await?;

        if synced.rows_affected() == 0 {
            tracing::warn!(
                expense_id = %existing.id,
                %payment_id,
                "Vendor payment referenced by expense no longer exists"
            );
        } else {
            tracing::info!(expense_id = %existing.id, %payment_id, "Vendor payment synced from expense");
        }

        Ok(expense)
    }

    /// Delete an expense allowed by the expense guard.
    ///
    /// Deleting a payment mirror reverses the payment's allocations and
    /// removes the payment in the same transaction.
    pub async fn delete(&self, expense_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        let existing = lock_expense(&mut *tx, expense_id).await?;
        let route = check_delete(&existing)?;

        sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(existing.id)
            .execute(&mut *tx)
            .await?;

        if let DeleteRoute::CascadeVendorPayment(payment_id) = route {
            match vendor_payment::reverse_and_delete(&mut *tx, payment_id).await? {
                Some(lines) => tracing::info!(
                    %expense_id,
                    %payment_id,
                    purchases = lines.len(),
                    %user_id,
                    "Vendor payment reversed through its expense"
                ),
                None => tracing::warn!(
                    %expense_id,
                    %payment_id,
                    "Vendor payment referenced by expense no longer exists; deleted expense only"
                ),
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

async fn lock_expense(conn: &mut PgConnection, expense_id: Uuid) -> AppResult<Expense> {
    sqlx::query_as::<_, Expense>(&format!(
        "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = $1 FOR UPDATE"
    ))
    .bind(expense_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::not_found("Expense"))
}

