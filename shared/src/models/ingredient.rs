//! Ingredient catalogue models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Grouping for ingredients within a branch (dairy, produce, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct IngredientCategory {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryInput {
    pub branch_id: Uuid,
    #[validate(length(min = 1, max = 80, message = "Category name is required"))]
    pub name: String,
}

/// A stock-keeping ingredient.
///
/// Branch, SKU and unit are fixed at creation; stock levels live in
/// [`crate::Stock`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub sku: String,
    pub unit: String,
    /// Quantity at or below which the ingredient is reported as low stock
    pub stock_alert: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateIngredientInput {
    pub branch_id: Uuid,
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, max = 120, message = "Ingredient name is required"))]
    pub name: String,
    #[validate(custom = "crate::validation::sku")]
    pub sku: String,
    #[validate(length(min = 1, max = 16, message = "Unit is required"))]
    pub unit: String,
    #[validate(custom = "crate::validation::stock_level")]
    pub stock_alert: Option<Decimal>,
}

/// Staff-editable fields; identity fields are rejected
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateIngredientInput {
    #[validate(length(min = 1, max = 120, message = "Ingredient name cannot be empty"))]
    pub name: Option<String>,
    pub category_id: Option<Uuid>,
    #[validate(custom = "crate::validation::stock_level")]
    pub stock_alert: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientListQuery {
    pub active: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}
