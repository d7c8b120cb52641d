//! Vendor service

use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::models::{
    generate_vendor_code, CreateVendorInput, UpdateVendorInput, Vendor, VendorListQuery,
};
use shared::types::{PaginatedResponse, Pagination};

use crate::error::{AppError, AppResult};
use crate::services::branch;

pub(crate) const VENDOR_COLUMNS: &str = "id, branch_id, vendor_code, name, contact_person, phone, email, address, created_at, updated_at";

/// Vendor of a branch, 404 otherwise
pub async fn find_in_branch<'e>(
    db: impl PgExecutor<'e>,
    vendor_id: Uuid,
    branch_id: Uuid,
) -> AppResult<Vendor> {
    sqlx::query_as::<_, Vendor>(&format!(
        "SELECT {VENDOR_COLUMNS} FROM vendors WHERE id = $1 AND branch_id = $2"
    ))
    .bind(vendor_id)
    .bind(branch_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::not_found("Vendor"))
}

#[derive(Clone)]
pub struct VendorService {
    db: PgPool,
}

impl VendorService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: CreateVendorInput) -> AppResult<Vendor> {
        input.validate()?;
        branch::ensure_exists(&self.db, input.branch_id).await?;

        let id = Uuid::new_v4();
        let vendor_code = input
            .vendor_code
            .map(|c| c.trim().to_uppercase())
            .unwrap_or_else(|| generate_vendor_code(id));

        let vendor = sqlx::query_as::<_, Vendor>(&format!(
            r#"
            INSERT INTO vendors (id, branch_id, vendor_code, name, contact_person, phone, email, address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {VENDOR_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(input.branch_id)
        .bind(&vendor_code)
        .bind(input.name.trim())
        .bind(&input.contact_person)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(vendor_id = %vendor.id, code = %vendor.vendor_code, "Vendor created");
        Ok(vendor)
    }

    pub async fn get(&self, vendor_id: Uuid) -> AppResult<Vendor> {
        sqlx::query_as::<_, Vendor>(&format!(
            "SELECT {VENDOR_COLUMNS} FROM vendors WHERE id = $1"
        ))
        .bind(vendor_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Vendor"))
    }

    pub async fn list(
        &self,
        branch_id: Uuid,
        query: VendorListQuery,
    ) -> AppResult<PaginatedResponse<Vendor>> {
        let pagination = Pagination::new(query.page, query.per_page);

        let vendors = sqlx::query_as::<_, Vendor>(&format!(
            "SELECT {VENDOR_COLUMNS} FROM vendors WHERE branch_id = $1 ORDER BY name LIMIT $2 OFFSET $3"
        ))
        .bind(branch_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM vendors WHERE branch_id = $1")
            .bind(branch_id)
            .fetch_one(&self.db)
            .await?;

        Ok(PaginatedResponse::new(vendors, pagination, total))
    }

    pub async fn update(&self, existing: Vendor, input: UpdateVendorInput) -> AppResult<Vendor> {
        input.validate()?;

        let name = input
            .name
            .map(|n| n.trim().to_string())
            .unwrap_or(existing.name);
        let contact_person = input.contact_person.or(existing.contact_person);
        let phone = input.phone.or(existing.phone);
        let email = input.email.or(existing.email);
        let address = input.address.or(existing.address);

        let vendor = sqlx::query_as::<_, Vendor>(&format!(
            r#"
            UPDATE vendors
            SET name = $2, contact_person = $3, phone = $4, email = $5, address = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {VENDOR_COLUMNS}
            "#
        ))
        .bind(existing.id)
        .bind(&name)
        .bind(&contact_person)
        .bind(&phone)
        .bind(&email)
        .bind(&address)
        .fetch_one(&self.db)
        .await?;

        Ok(vendor)
    }

    /// Delete a vendor that no purchase references
    pub async fn delete(&self, vendor_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query("SELECT id FROM vendors WHERE id = $1 FOR UPDATE")
            .bind(vendor_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("Vendor"))?;

        let purchases = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM purchases WHERE vendor_id = $1",
        )
        .bind(vendor_id)
        .fetch_one(&mut *tx)
        .await?;

        if purchases > 0 {
            return Err(AppError::Forbidden(format!(
                "Vendor is referenced by {} purchase(s) and cannot be deleted",
                purchases
            )));
        }

        sqlx::query("DELETE FROM vendors WHERE id = $1")
            .bind(vendor_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(%vendor_id, "Vendor deleted");
        Ok(())
    }
}
