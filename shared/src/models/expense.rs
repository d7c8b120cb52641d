//! Expense models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::PaymentMethod;
use crate::settlement::PaymentStatus;

/// Expense categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "VARCHAR"))]
pub enum ExpenseCategory {
    /// Goods and payments owed to suppliers
    Vendor,
    Rent,
    Utilities,
    Salaries,
    Maintenance,
    Supplies,
    Marketing,
    Other,
}

/// A money outflow.
///
/// Expenses carrying `purchase_id` or `vendor_payment_id` mirror other
/// records; see [`crate::expense_link`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub title: String,
    pub category: ExpenseCategory,
    pub vendor_name: Option<String>,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    #[serde(rename = "date")]
    pub expense_date: DateTime<Utc>,
    pub note: Option<String>,
    pub purchase_id: Option<Uuid>,
    pub vendor_payment_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpenseInput {
    pub branch_id: Uuid,
    #[validate(length(min = 1, max = 160, message = "Title is required"))]
    pub title: String,
    pub category: ExpenseCategory,
    pub vendor_name: Option<String>,
    #[validate(custom = "crate::validation::money")]
    pub total_amount: Decimal,
    /// Defaults to the full amount
    #[validate(custom = "crate::validation::money")]
    pub paid_amount: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
    #[serde(rename = "date")]
    pub expense_date: Option<DateTime<Utc>>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

/// Partial update of an expense.
///
/// `paymentStatus` is not accepted; it follows from the amounts.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateExpenseInput {
    #[validate(length(min = 1, max = 160, message = "Title cannot be empty"))]
    pub title: Option<String>,
    pub category: Option<ExpenseCategory>,
    pub vendor_name: Option<String>,
    #[validate(custom = "crate::validation::money")]
    pub total_amount: Option<Decimal>,
    #[validate(custom = "crate::validation::money")]
    pub paid_amount: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
    #[serde(rename = "date")]
    pub expense_date: Option<DateTime<Utc>>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseListQuery {
    pub category: Option<ExpenseCategory>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}
