//! Branch service

use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::models::{Branch, CreateBranchInput};

use crate::error::{AppError, AppResult};

/// Fail with 404 unless the branch exists
pub async fn ensure_exists<'e>(db: impl PgExecutor<'e>, branch_id: Uuid) -> AppResult<()> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM branches WHERE id = $1)")
            .bind(branch_id)
            .fetch_one(db)
            .await?;

    if exists {
        Ok(())
    } else {
        Err(AppError::not_found("Branch"))
    }
}

#[derive(Clone)]
pub struct BranchService {
    db: PgPool,
}

impl BranchService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: CreateBranchInput) -> AppResult<Branch> {
        input.validate()?;

        let branch = sqlx::query_as::<_, Branch>(
            r#"
            INSERT INTO branches (name, address, phone)
            VALUES ($1, $2, $3)
            RETURNING id, name, address, phone, created_at, updated_at
            "#,
        )
        .bind(input.name.trim())
        .bind(&input.address)
        .bind(&input.phone)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(branch_id = %branch.id, name = %branch.name, "Branch created");
        Ok(branch)
    }

    /// Branches visible to the caller; `None` means all of them
    pub async fn list(&self, only: Option<&[Uuid]>) -> AppResult<Vec<Branch>> {
        let branches = sqlx::query_as::<_, Branch>(
            r#"
            SELECT id, name, address, phone, created_at, updated_at
            FROM branches
            WHERE $1::uuid[] IS NULL OR id = ANY($1)
            ORDER BY name
            "#,
        )
        .bind(only)
        .fetch_all(&self.db)
        .await?;

        Ok(branches)
    }
}
