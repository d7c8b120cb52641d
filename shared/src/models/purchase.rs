//! Purchase (vendor delivery) models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::PaymentMethod;
use crate::settlement::PaymentStatus;

/// A delivery received from a vendor.
///
/// `payment_status` always equals `PaymentStatus::derive(paid_amount, grand_total)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub vendor_id: Uuid,
    pub purchase_date: DateTime<Utc>,
    pub invoice_number: Option<String>,
    pub grand_total: Decimal,
    pub paid_amount: Decimal,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Purchase row with the vendor name, for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct PurchaseSummary {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub purchase: Purchase,
    pub vendor_name: String,
}

/// A purchase line populated with its ingredient
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItem {
    pub id: Uuid,
    pub purchase_id: Uuid,
    pub line_no: i32,
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub unit: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseDetail {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub vendor_name: String,
    pub items: Vec<PurchaseItem>,
}

/// A line as submitted by the client.
///
/// `total_price` is optional; when present it must match the computed
/// `quantity * unit_price`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLineInput {
    pub ingredient_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_price: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePurchaseInput {
    pub vendor_id: Uuid,
    pub branch_id: Uuid,
    pub purchase_date: Option<DateTime<Utc>>,
    #[validate(length(max = 64))]
    pub invoice_number: Option<String>,
    #[validate(length(min = 1, message = "A purchase needs at least one item"))]
    pub items: Vec<PurchaseLineInput>,
    /// Only a hint for the initial payment; the stored status is derived
    pub payment_status: Option<PaymentStatus>,
    #[validate(custom = "crate::validation::money")]
    pub paid_amount: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
    /// Client-side total, checked against the computed one
    pub grand_total: Option<Decimal>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Editable purchase fields.
///
/// Items, totals and payment fields are not part of this type, so a body
/// trying to set them is rejected during deserialization.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdatePurchaseInput {
    #[validate(length(max = 64))]
    pub invoice_number: Option<String>,
    pub purchase_date: Option<DateTime<Utc>>,
    pub payment_method: Option<PaymentMethod>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseListQuery {
    pub vendor_id: Option<Uuid>,
    pub payment_status: Option<PaymentStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}
