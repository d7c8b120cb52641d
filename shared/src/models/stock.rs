//! Stock ledger models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// On-hand quantity of one ingredient at one branch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Stock {
    pub id: Uuid,
    pub ingredient_id: Uuid,
    pub branch_id: Uuid,
    pub quantity_in_stock: Decimal,
    /// Copy of the ingredient's unit at the time of the last purchase
    pub unit: String,
    pub updated_at: DateTime<Utc>,
}

/// Stock row joined with its ingredient for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct StockView {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub stock: Stock,
    pub ingredient_name: String,
    pub sku: String,
    pub stock_alert: Decimal,
    pub low_stock: bool,
}

/// Why a stock quantity changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "VARCHAR"))]
pub enum StockMovementReason {
    Purchase,
    Adjustment,
    PurchaseReversal,
}

/// Append-only record of a stock change
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: Uuid,
    pub ingredient_id: Uuid,
    pub branch_id: Uuid,
    pub quantity_changed: Decimal,
    pub quantity_after: Decimal,
    pub reason: StockMovementReason,
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Manual correction of an on-hand quantity
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockInput {
    pub ingredient_id: Uuid,
    #[validate(custom = "crate::validation::stock_level")]
    pub new_quantity: Decimal,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMovementQuery {
    pub ingredient_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}
