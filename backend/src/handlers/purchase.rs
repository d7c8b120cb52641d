//! HTTP handlers for purchases

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use shared::models::{
    Action, CreatePurchaseInput, PurchaseDetail, PurchaseListQuery, Resource, UpdatePurchaseInput,
};
use shared::types::PaginatedResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::PurchaseService;
use crate::AppState;

/// Record a purchase, receive its stock and open its shadow expense
pub async fn create_purchase(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreatePurchaseInput>,
) -> AppResult<(StatusCode, Json<PurchaseDetail>)> {
    user.authorize(Resource::Purchases, Action::Write, input.branch_id)?;
    let purchase = PurchaseService::new(state.db)
        .create(user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

pub async fn list_purchases(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(branch_id): Path<Uuid>,
    Query(query): Query<PurchaseListQuery>,
) -> AppResult<Json<PaginatedResponse<PurchaseDetail>>> {
    user.authorize(Resource::Purchases, Action::Read, branch_id)?;
    let purchases = PurchaseService::new(state.db).list(branch_id, query).await?;
    Ok(Json(purchases))
}

pub async fn get_purchase(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(purchase_id): Path<Uuid>,
) -> AppResult<Json<PurchaseDetail>> {
    let purchase = PurchaseService::new(state.db).get(purchase_id).await?;
    user.authorize(Resource::Purchases, Action::Read, purchase.purchase.branch_id)?;
    Ok(Json(purchase))
}

/// Descriptive fields only; amounts and items are fixed once recorded
pub async fn update_purchase(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(purchase_id): Path<Uuid>,
    Json(input): Json<UpdatePurchaseInput>,
) -> AppResult<Json<PurchaseDetail>> {
    let service = PurchaseService::new(state.db);
    let existing = service.get(purchase_id).await?;
    user.authorize(Resource::Purchases, Action::Write, existing.purchase.branch_id)?;
    let purchase = service.update(existing.purchase, input).await?;
    Ok(Json(purchase))
}

/// Only unpaid purchases without allocations can be deleted
pub async fn delete_purchase(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(purchase_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = PurchaseService::new(state.db);
    let existing = service.get(purchase_id).await?;
    user.authorize(Resource::Purchases, Action::Write, existing.purchase.branch_id)?;
    service.delete(purchase_id, user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
