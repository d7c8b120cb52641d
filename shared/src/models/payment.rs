//! Payment method shared by purchases, vendor payments and expenses

use serde::{Deserialize, Serialize};

/// How money left the restaurant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "VARCHAR"))]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Cheque,
    MobileWallet,
    Other,
}
