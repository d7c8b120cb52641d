//! Vendor payment allocator
//!
//! A payment is spread over the vendor's outstanding purchases oldest first.
//! The vendor row and the outstanding purchases are locked for the whole
//! transaction, so two payments to the same vendor are applied one after
//! the other.

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::models::{
    CreateVendorPaymentInput, PaymentAllocation, Vendor, VendorPayment, VendorPaymentDetail,
    VendorPaymentListQuery, VendorPaymentResponse,
};
use shared::settlement::{
    allocate_fifo, plan_reversal, AppliedAmount, OutstandingPurchase, PurchaseBalance,
    ReversalLine,
};
use shared::types::{PaginatedResponse, Pagination};

use crate::error::{AppError, AppResult};
use crate::services::expense;
use crate::services::vendor::VENDOR_COLUMNS;

const PAYMENT_COLUMNS: &str = "id, vendor_id, branch_id, payment_date, amount_paid, \
    payment_method, notes, created_by, created_at";

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    #[sqlx(flatten)]
    payment: VendorPayment,
    vendor_name: String,
}

#[derive(Clone)]
pub struct VendorPaymentService {
    db: PgPool,
}

impl VendorPaymentService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a payment and settle outstanding purchases with it
    pub async fn pay(
        &self,
        user_id: Uuid,
        input: CreateVendorPaymentInput,
    ) -> AppResult<VendorPaymentResponse> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        // Serializes payments per vendor
        let vendor = sqlx::query_as::<_, Vendor>(&format!(
            "SELECT {VENDOR_COLUMNS} FROM vendors WHERE id = $1 AND branch_id = $2 FOR UPDATE"
        ))
        .bind(input.vendor_id)
        .bind(input.branch_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Vendor"))?;

        let outstanding = sqlx::query_as::<_, OutstandingPurchase>(
            r#"
            SELECT id AS purchase_id, purchase_date, grand_total, paid_amount
            FROM purchases
            WHERE vendor_id = $1 AND branch_id = $2 AND payment_status IN ('Unpaid', 'Partial')
            ORDER BY purchase_date, created_at
            FOR UPDATE
            "#,
        )
        .bind(vendor.id)
        .bind(input.branch_id)
        .fetch_all(&mut *tx)
        .await?;

        let plan = allocate_fifo(&outstanding, input.amount_paid)?;

        let payment = sqlx::query_as::<_, VendorPayment>(&format!(
            r#"
            INSERT INTO vendor_payments (
                vendor_id, branch_id, payment_date, amount_paid, payment_method, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(vendor.id)
        .bind(input.branch_id)
        .bind(input.payment_date.unwrap_or_else(Utc::now))
        .bind(input.amount_paid)
        .bind(input.payment_method)
        .bind(&input.notes)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        for (position, line) in plan.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO vendor_payment_allocations (vendor_payment_id, purchase_id, position, amount_applied)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(payment.id)
            .bind(line.purchase_id)
            .bind(position as i32)
            .bind(line.amount_applied)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                UPDATE purchases
                SET paid_amount = $2, payment_status = $3, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(line.purchase_id)
            .bind(line.paid_after)
            .bind(line.status_after)
            .execute(&mut *tx)
            .await?;

            expense::sync_purchase_shadow(&mut *tx, line.purchase_id, line.paid_after, line.status_after)
                .await?;
        }

        expense::insert_payment_mirror(&mut *tx, &payment, &vendor.name).await?;

        tx.commit().await?;

        tracing::info!(
            payment_id = %payment.id,
            vendor_id = %vendor.id,
            amount = %payment.amount_paid,
            purchases = plan.lines.len(),
            outstanding_before = %plan.outstanding_before,
            "Vendor payment allocated"
        );

        let detail = self.get(payment.id).await?;
        Ok(VendorPaymentResponse {
            message: format!(
                "Payment of {} applied to {} purchase(s)",
                detail.total_applied(),
                detail.applied_to_purchases.len()
            ),
            payment: detail,
        })
    }

    pub async fn get(&self, payment_id: Uuid) -> AppResult<VendorPaymentDetail> {
        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT vp.id, vp.vendor_id, vp.branch_id, vp.payment_date, vp.amount_paid,
                   vp.payment_method, vp.notes, vp.created_by, vp.created_at,
                   v.name AS vendor_name
            FROM vendor_payments vp
            JOIN vendors v ON v.id = vp.vendor_id
            WHERE vp.id = $1
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Vendor payment"))?;

        let allocations = sqlx::query_as::<_, PaymentAllocation>(
            r#"
            SELECT a.purchase_id, p.invoice_number, a.amount_applied, a.position
            FROM vendor_payment_allocations a
            JOIN purchases p ON p.id = a.purchase_id
            WHERE a.vendor_payment_id = $1
            ORDER BY a.position
            "#,
        )
        .bind(payment_id)
        .fetch_all(&self.db)
        .await?;

        Ok(VendorPaymentDetail {
            payment: row.payment,
            vendor_name: row.vendor_name,
            applied_to_purchases: allocations,
        })
    }

    pub async fn list(
        &self,
        branch_id: Uuid,
        query: VendorPaymentListQuery,
    ) -> AppResult<PaginatedResponse<VendorPayment>> {
        let pagination = Pagination::new(query.page, query.per_page);

        let payments = sqlx::query_as::<_, VendorPayment>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS} FROM vendor_payments
            WHERE branch_id = $1 AND ($2::uuid IS NULL OR vendor_id = $2)
            ORDER BY payment_date DESC, created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(branch_id)
        .bind(query.vendor_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM vendor_payments WHERE branch_id = $1 AND ($2::uuid IS NULL OR vendor_id = $2)",
        )
        .bind(branch_id)
        .bind(query.vendor_id)
        .fetch_one(&self.db)
        .await?;

        Ok(PaginatedResponse::new(payments, pagination, total))
    }
}

/// Undo a payment's allocations and delete the payment.
///
/// Returns `None` when the payment does not exist. Runs on the caller's
/// transaction; the payment's mirror expense must already be gone.
/// Locks are taken vendor first, then purchases, the same order as `pay`.
pub async fn reverse_and_delete(
    conn: &mut PgConnection,
    payment_id: Uuid,
) -> AppResult<Option<Vec<ReversalLine>>> {
    let vendor_id = sqlx::query_scalar::<_, Uuid>("SELECT vendor_id FROM vendor_payments WHERE id = $1")
        .bind(payment_id)
        .fetch_optional(&mut *conn)
        .await?;
    let Some(vendor_id) = vendor_id else {
        return Ok(None);
    };

    sqlx::query("SELECT id FROM vendors WHERE id = $1 FOR UPDATE")
        .bind(vendor_id)
        .execute(&mut *conn)
        .await?;

    let locked = sqlx::query_scalar::<_, Uuid>("SELECT id FROM vendor_payments WHERE id = $1 FOR UPDATE")
        .bind(payment_id)
        .fetch_optional(&mut *conn)
        .await?;
    if locked.is_none() {
        return Ok(None);
    }

    let applied = sqlx::query_as::<_, AppliedAmount>(
        r#"
        SELECT purchase_id, amount_applied
        FROM vendor_payment_allocations
        WHERE vendor_payment_id = $1
        ORDER BY position
        "#,
    )
    .bind(payment_id)
    .fetch_all(&mut *conn)
    .await?;

    let purchase_ids: Vec<Uuid> = applied.iter().map(|a| a.purchase_id).collect();
    let balances = sqlx::query_as::<_, PurchaseBalance>(
        r#"
        SELECT id AS purchase_id, grand_total, paid_amount
        FROM purchases
        WHERE id = ANY($1)
        ORDER BY id
        FOR UPDATE
        "#,
    )
    .bind(&purchase_ids)
    .fetch_all(&mut *conn)
    .await?;

    let lines = plan_reversal(&applied, &balances)?;

    for line in &lines {
        sqlx::query(
            r#"
            UPDATE purchases
            SET paid_amount = $2, payment_status = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(line.purchase_id)
        .bind(line.paid_after)
        .bind(line.status_after)
        .execute(&mut *conn)
        .await?;

        expense::sync_purchase_shadow(&mut *conn, line.purchase_id, line.paid_after, line.status_after)
            .await?;
    }

    sqlx::query("DELETE FROM vendor_payment_allocations WHERE vendor_payment_id = $1")
        .bind(payment_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM vendor_payments WHERE id = $1")
        .bind(payment_id)
        .execute(&mut *conn)
        .await?;

    Ok(Some(lines))
}
