//! Ingredient catalogue service: categories and ingredients

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use shared::models::{
    CreateCategoryInput, CreateIngredientInput, Ingredient, IngredientCategory,
    IngredientListQuery, UpdateIngredientInput,
};
use shared::types::{PaginatedResponse, Pagination};

use crate::error::{AppError, AppResult};
use crate::services::branch;

const INGREDIENT_COLUMNS: &str =
    "id, branch_id, category_id, name, sku, unit, stock_alert, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct IngredientService {
    db: PgPool,
}

impl IngredientService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ========================================================================
    // Categories
    // ========================================================================

    pub async fn create_category(&self, input: CreateCategoryInput) -> AppResult<IngredientCategory> {
        input.validate()?;
        branch::ensure_exists(&self.db, input.branch_id).await?;

        let category = sqlx::query_as::<_, IngredientCategory>(
            r#"
            INSERT INTO ingredient_categories (branch_id, name)
            VALUES ($1, $2)
            RETURNING id, branch_id, name, created_at
            "#,
        )
        .bind(input.branch_id)
        .bind(input.name.trim())
        .fetch_one(&self.db)
        .await?;

        Ok(category)
    }

    pub async fn list_categories(&self, branch_id: Uuid) -> AppResult<Vec<IngredientCategory>> {
        let categories = sqlx::query_as::<_, IngredientCategory>(
            "SELECT id, branch_id, name, created_at FROM ingredient_categories WHERE branch_id = $1 ORDER BY name",
        )
        .bind(branch_id)
        .fetch_all(&self.db)
        .await?;

        Ok(categories)
    }

    async fn ensure_category(&self, branch_id: Uuid, category_id: Uuid) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM ingredient_categories WHERE id = $1 AND branch_id = $2)",
        )
        .bind(category_id)
        .bind(branch_id)
        .fetch_one(&self.db)
        .await?;

        if exists {
            Ok(())
        } else {
            Err(AppError::not_found("Ingredient category"))
        }
    }

    // ========================================================================
    // Ingredients
    // ========================================================================

    pub async fn create(&self, input: CreateIngredientInput) -> AppResult<Ingredient> {
        input.validate()?;
        branch::ensure_exists(&self.db, input.branch_id).await?;
        if let Some(category_id) = input.category_id {
            self.ensure_category(input.branch_id, category_id).await?;
        }

        let ingredient = sqlx::query_as::<_, Ingredient>(&format!(
            r#"
            INSERT INTO ingredients (branch_id, category_id, name, sku, unit, stock_alert)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {INGREDIENT_COLUMNS}
            "#
        ))
        .bind(input.branch_id)
        .bind(input.category_id)
        .bind(input.name.trim())
        .bind(&input.sku)
        .bind(input.unit.trim())
        .bind(input.stock_alert.unwrap_or(Decimal::ZERO))
        .fetch_one(&self.db)
        .await?;

        tracing::info!(ingredient_id = %ingredient.id, sku = %ingredient.sku, "Ingredient created");
        Ok(ingredient)
    }

    pub async fn get(&self, ingredient_id: Uuid) -> AppResult<Ingredient> {
        sqlx::query_as::<_, Ingredient>(&format!(
            "SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE id = $1"
        ))
        .bind(ingredient_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Ingredient"))
    }

    pub async fn list(
        &self,
        branch_id: Uuid,
        query: IngredientListQuery,
    ) -> AppResult<PaginatedResponse<Ingredient>> {
        let pagination = Pagination::new(query.page, query.per_page);

        let ingredients = sqlx::query_as::<_, Ingredient>(&format!(
            r#"
            SELECT {INGREDIENT_COLUMNS} FROM ingredients
            WHERE branch_id = $1 AND ($2::boolean IS NULL OR is_active = $2)
            ORDER BY name
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(branch_id)
        .bind(query.active)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM ingredients WHERE branch_id = $1 AND ($2::boolean IS NULL OR is_active = $2)",
        )
        .bind(branch_id)
        .bind(query.active)
        .fetch_one(&self.db)
        .await?;

        Ok(PaginatedResponse::new(ingredients, pagination, total))
    }

    pub async fn update(
        &self,
        existing: Ingredient,
        input: UpdateIngredientInput,
    ) -> AppResult<Ingredient> {
        input.validate()?;
        if let Some(category_id) = input.category_id {
            self.ensure_category(existing.branch_id, category_id).await?;
        }

        let name = input
            .name
            .map(|n| n.trim().to_string())
            .unwrap_or(existing.name);
        let category_id = input.category_id.or(existing.category_id);
        let stock_alert = input.stock_alert.unwrap_or(existing.stock_alert);
        let is_active = input.is_active.unwrap_or(existing.is_active);

        let ingredient = sqlx::query_as::<_, Ingredient>(&format!(
            r#"
            UPDATE ingredients
            SET name = $2, category_id = $3, stock_alert = $4, is_active = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {INGREDIENT_COLUMNS}
            "#
        ))
        .bind(existing.id)
        .bind(&name)
        .bind(category_id)
        .bind(stock_alert)
        .bind(is_active)
        .fetch_one(&self.db)
        .await?;

        Ok(ingredient)
    }

    /// Delete an ingredient nobody bought and nobody holds.
    ///
    /// Empty stock rows and their movements go with it.
    pub async fn delete(&self, ingredient_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let purchased = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM purchase_items WHERE ingredient_id = $1)",
        )
        .bind(ingredient_id)
        .fetch_one(&mut *tx)
        .await?;
        if purchased {
            return Err(AppError::Conflict(
                "Ingredient is referenced by purchases; deactivate it instead".to_string(),
            ));
        }

        let on_hand = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM stock WHERE ingredient_id = $1 AND quantity_in_stock > 0)",
        )
        .bind(ingredient_id)
        .fetch_one(&mut *tx)
        .await?;
        if on_hand {
            return Err(AppError::Conflict(
                "Ingredient still has stock on hand".to_string(),
            ));
        }

        sqlx::query("DELETE FROM stock_movements WHERE ingredient_id = $1")
            .bind(ingredient_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM stock WHERE ingredient_id = $1")
            .bind(ingredient_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM ingredients WHERE id = $1")
            .bind(ingredient_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Ingredient"));
        }

        tx.commit().await?;
        tracing::info!(%ingredient_id, "Ingredient deleted");
        Ok(())
    }
}
