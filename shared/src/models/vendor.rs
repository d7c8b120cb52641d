//! Vendor (supplier) models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::settlement::PaymentStatus;

/// A supplier delivering to a branch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    pub id: Uuid,
    pub branch_id: Uuid,
    /// Human-facing unique code, e.g. `VND-1A2B3C4D`
    #[serde(rename = "vendorID")]
    pub vendor_code: String,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Code assigned to vendors registered without one
pub fn generate_vendor_code(id: Uuid) -> String {
    let simple = id.simple().to_string().to_uppercase();
    format!("VND-{}", &simple[..8])
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateVendorInput {
    pub branch_id: Uuid,
    #[serde(rename = "vendorID")]
    #[validate(length(min = 3, max = 32, message = "Vendor ID must be 3-32 characters"))]
    pub vendor_code: Option<String>,
    #[validate(length(min = 1, max = 120, message = "Vendor name is required"))]
    pub name: String,
    pub contact_person: Option<String>,
    #[validate(custom = "crate::validation::phone")]
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Contact details only; branch and vendor ID are fixed
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateVendorInput {
    #[validate(length(min = 1, max = 120, message = "Vendor name cannot be empty"))]
    pub name: Option<String>,
    pub contact_person: Option<String>,
    #[validate(custom = "crate::validation::phone")]
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// An unpaid or partially paid purchase with its remaining due
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct OutstandingEntry {
    pub purchase_id: Uuid,
    pub invoice_number: Option<String>,
    pub purchase_date: DateTime<Utc>,
    pub grand_total: Decimal,
    pub paid_amount: Decimal,
    pub due: Decimal,
    pub payment_status: PaymentStatus,
}

/// What a vendor is still owed at a branch, oldest purchase first
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutstandingSummary {
    pub vendor_id: Uuid,
    pub branch_id: Uuid,
    pub total_due: Decimal,
    pub purchases: Vec<OutstandingEntry>,
}

impl OutstandingSummary {
    pub fn new(vendor_id: Uuid, branch_id: Uuid, purchases: Vec<OutstandingEntry>) -> Self {
        let total_due = purchases.iter().map(|p| p.due).sum();
        Self {
            vendor_id,
            branch_id,
            total_due,
            purchases,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_vendor_code() {
        let id = Uuid::parse_str("1a2b3c4d-0000-4000-8000-000000000000").unwrap();
        assert_eq!(generate_vendor_code(id), "VND-1A2B3C4D");
    }
}
