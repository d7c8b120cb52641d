//! HTTP handlers for vendor payments

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use shared::models::{
    Action, CreateVendorPaymentInput, Resource, VendorPayment, VendorPaymentDetail,
    VendorPaymentListQuery, VendorPaymentResponse,
};
use shared::types::PaginatedResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::VendorPaymentService;
use crate::AppState;

/// Pay a vendor; the amount settles outstanding purchases oldest first
pub async fn create_vendor_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateVendorPaymentInput>,
) -> AppResult<(StatusCode, Json<VendorPaymentResponse>)> {
    user.authorize(Resource::VendorPayments, Action::Write, input.branch_id)?;
    let response = VendorPaymentService::new(state.db)
        .pay(user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn list_vendor_payments(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(branch_id): Path<Uuid>,
    Query(query): Query<VendorPaymentListQuery>,
) -> AppResult<Json<PaginatedResponse<VendorPayment>>> {
    user.authorize(Resource::VendorPayments, Action::Read, branch_id)?;
    let payments = VendorPaymentService::new(state.db)
        .list(branch_id, query)
        .await?;
    Ok(Json(payments))
}

pub async fn get_vendor_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(payment_id): Path<Uuid>,
) -> AppResult<Json<VendorPaymentDetail>> {
    let payment = VendorPaymentService::new(state.db).get(payment_id).await?;
    user.authorize(Resource::VendorPayments, Action::Read, payment.payment.branch_id)?;
    Ok(Json(payment))
}
