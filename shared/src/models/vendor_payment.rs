//! Vendor payment models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::PaymentMethod;

/// A single payment made to a vendor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct VendorPayment {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub branch_id: Uuid,
    pub payment_date: DateTime<Utc>,
    pub amount_paid: Decimal,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// How much of a payment went to one purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct PaymentAllocation {
    #[serde(rename = "purchase")]
    pub purchase_id: Uuid,
    pub invoice_number: Option<String>,
    pub amount_applied: Decimal,
    pub position: i32,
}

/// A payment together with its audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorPaymentDetail {
    #[serde(flatten)]
    pub payment: VendorPayment,
    pub vendor_name: String,
    pub applied_to_purchases: Vec<PaymentAllocation>,
}

impl VendorPaymentDetail {
    pub fn total_applied(&self) -> Decimal {
        self.applied_to_purchases.iter().map(|a| a.amount_applied).sum()
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateVendorPaymentInput {
    pub vendor_id: Uuid,
    pub branch_id: Uuid,
    #[validate(custom = "crate::validation::positive_money")]
    pub amount_paid: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_date: Option<DateTime<Utc>>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorPaymentResponse {
    pub message: String,
    pub payment: VendorPaymentDetail,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorPaymentListQuery {
    pub vendor_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}
