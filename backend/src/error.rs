//! Error handling for the restaurant back office server
//!
//! Every failure is rendered as `{"error": {"code", "message", "field"?}}`.
//! Database and internal details are logged, never returned to clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared::expense_link::ExpenseGuardError;
use shared::pricing::PricingError;
use shared::settlement::SettlementError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions: {0}")]
    InsufficientPermissions(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Total mismatch: {0}")]
    TotalMismatch(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // Reconciliation errors
    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("No outstanding balance: {0}")]
    NoOutstandingBalance(String),

    #[error("Overpayment: {0}")]
    Overpayment(String),

    #[error("Payment not applied: {0}")]
    PaymentNotApplied(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    // Internal errors
    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
        }
    }

    fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl AppError {
    pub fn not_found(resource: &str) -> Self {
        AppError::NotFound(resource.to_string())
    }

    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::InsufficientPermissions(_) | AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Validation { .. }
            | AppError::ValidationError(_)
            | AppError::TotalMismatch(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateEntry(_)
            | AppError::Conflict(_)
            | AppError::InsufficientStock(_)
            | AppError::NoOutstandingBalance(_) => StatusCode::CONFLICT,
            AppError::Overpayment(_) | AppError::PaymentNotApplied(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::DatabaseError(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn detail(&self) -> ErrorDetail {
        match self {
            AppError::Unauthorized(msg) => ErrorDetail::new("UNAUTHORIZED", msg.clone()),
            AppError::InvalidToken => ErrorDetail::new("INVALID_TOKEN", "Invalid or expired token"),
            AppError::InsufficientPermissions(msg) => {
                ErrorDetail::new("INSUFFICIENT_PERMISSIONS", msg.clone())
            }
            AppError::Forbidden(msg) => ErrorDetail::new("FORBIDDEN", msg.clone()),
            AppError::Validation { field, message } => {
                ErrorDetail::new("VALIDATION_ERROR", message.clone()).with_field(field.clone())
            }
            AppError::ValidationError(msg) => ErrorDetail::new("VALIDATION_ERROR", msg.clone()),
            AppError::TotalMismatch(msg) => {
                ErrorDetail::new("TOTAL_MISMATCH", msg.clone()).with_field("items")
            }
            AppError::NotFound(resource) => {
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource))
            }
            AppError::DuplicateEntry(field) => ErrorDetail::new(
                "DUPLICATE_ENTRY",
                format!("A record with this {} already exists", field),
            )
            .with_field(field.clone()),
            AppError::Conflict(msg) => ErrorDetail::new("CONFLICT", msg.clone()),
            AppError::InsufficientStock(msg) => ErrorDetail::new("INSUFFICIENT_STOCK", msg.clone()),
            AppError::NoOutstandingBalance(msg) => {
                ErrorDetail::new("NO_OUTSTANDING_BALANCE", msg.clone())
            }
            AppError::Overpayment(msg) => {
                ErrorDetail::new("OVERPAYMENT", msg.clone()).with_field("amountPaid")
            }
            AppError::PaymentNotApplied(msg) => {
                ErrorDetail::new("PAYMENT_NOT_APPLIED", msg.clone())
            }
            AppError::DatabaseError(_) => {
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred")
            }
            AppError::InternalError(_) => {
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        (status, Json(ErrorResponse { error: self.detail() })).into_response()
    }
}

/// Constraint violations become client errors; everything else is a 500
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let field = db_err
                    .constraint()
                    .map(constraint_field)
                    .unwrap_or("value")
                    .to_string();
                return AppError::DuplicateEntry(field);
            }
            if db_err.is_foreign_key_violation() {
                return AppError::Conflict(
                    "The record is referenced by or references another record".to_string(),
                );
            }
        }
        AppError::DatabaseError(err)
    }
}

/// Human field name for a unique constraint
fn constraint_field(constraint: &str) -> &'static str {
    match constraint {
        "ingredients_sku_key" => "sku",
        "vendors_vendor_code_key" => "vendorID",
        "branches_name_key" => "name",
        "ingredient_categories_branch_id_name_key" => "name",
        _ => "value",
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let first = field_errors
            .iter()
            .min_by_key(|(field, _)| **field)
            .and_then(|(field, errs)| errs.first().map(|e| (*field, e)));

        match first {
            Some((field, err)) => {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({})", err.code));
                AppError::validation(&camel_case(field), message)
            }
            None => AppError::ValidationError(errors.to_string()),
        }
    }
}

/// Payload field name as the client sent it
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        if err.is_total_mismatch() {
            return AppError::TotalMismatch(err.to_string());
        }
        let field = match err {
            PricingError::InvalidPaidAmount(_) | PricingError::PaidExceedsTotal { .. } => {
                "paidAmount"
            }
            PricingError::PartialWithoutAmount | PricingError::StatusMismatch { .. } => {
                "paymentStatus"
            }
            PricingError::GrandTotalTooLarge => "grandTotal",
            _ => "items",
        };
        AppError::validation(field, err.to_string())
    }
}

impl From<SettlementError> for AppError {
    fn from(err: SettlementError) -> Self {
        match err {
            SettlementError::NonPositiveAmount => AppError::validation("amountPaid", err.to_string()),
            SettlementError::NoOutstandingBalance => AppError::NoOutstandingBalance(err.to_string()),
            SettlementError::Overpayment { .. } => AppError::Overpayment(err.to_string()),
            SettlementError::NothingApplied => AppError::PaymentNotApplied(err.to_string()),
            SettlementError::MissingPurchase(_) => AppError::Conflict(err.to_string()),
        }
    }
}

impl From<ExpenseGuardError> for AppError {
    fn from(err: ExpenseGuardError) -> Self {
        match err {
            ExpenseGuardError::PurchaseMirrorLocked
            | ExpenseGuardError::PurchaseMirrorUndeletable
            | ExpenseGuardError::AmountLocked(_) => AppError::Forbidden(err.to_string()),
            ExpenseGuardError::ReservedReference => AppError::validation("note", err.to_string()),
            ExpenseGuardError::PaidExceedsTotal { .. } => {
                AppError::validation("paidAmount", err.to_string())
            }
        }
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_settlement_errors_map_to_statuses() {
        let overpay: AppError = SettlementError::Overpayment {
            amount: Decimal::from(10),
            outstanding: Decimal::from(5),
        }
        .into();
        assert_eq!(overpay.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let nothing: AppError = SettlementError::NoOutstandingBalance.into();
        assert_eq!(nothing.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_guard_errors_are_forbidden() {
        let err: AppError = ExpenseGuardError::PurchaseMirrorUndeletable.into();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_total_mismatch_is_bad_request() {
        let err: AppError = PricingError::GrandTotalMismatch {
            supplied: Decimal::from(1),
            computed: Decimal::from(2),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.detail().code, "TOTAL_MISMATCH");
    }

    #[test]
    fn test_oversized_totals_are_validation_errors() {
        let err: AppError = PricingError::LineTotalTooLarge { line: 1 }.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.detail().code, "VALIDATION_ERROR");

        let err: AppError = PricingError::GrandTotalTooLarge.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.detail().field.as_deref(), Some("grandTotal"));
    }

    #[test]
    fn test_validation_fields_reported_in_camel_case() {
        assert_eq!(camel_case("amount_paid"), "amountPaid");
        assert_eq!(camel_case("items"), "items");
        assert_eq!(camel_case("new_quantity"), "newQuantity");
    }
}
