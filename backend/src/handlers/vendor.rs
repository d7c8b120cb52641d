//! HTTP handlers for vendors

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use shared::models::{
    Action, CreateVendorInput, OutstandingSummary, Resource, UpdateVendorInput, Vendor,
    VendorListQuery,
};
use shared::types::PaginatedResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::{PurchaseService, VendorService};
use crate::AppState;

pub async fn create_vendor(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateVendorInput>,
) -> AppResult<(StatusCode, Json<Vendor>)> {
    user.authorize(Resource::Vendors, Action::Write, input.branch_id)?;
    let vendor = VendorService::new(state.db).create(input).await?;
    Ok((StatusCode::CREATED, Json(vendor)))
}

pub async fn list_vendors(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(branch_id): Path<Uuid>,
    Query(query): Query<VendorListQuery>,
) -> AppResult<Json<PaginatedResponse<Vendor>>> {
    user.authorize(Resource::Vendors, Action::Read, branch_id)?;
    let vendors = VendorService::new(state.db).list(branch_id, query).await?;
    Ok(Json(vendors))
}

pub async fn get_vendor(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(vendor_id): Path<Uuid>,
) -> AppResult<Json<Vendor>> {
    let vendor = VendorService::new(state.db).get(vendor_id).await?;
    user.authorize(Resource::Vendors, Action::Read, vendor.branch_id)?;
    Ok(Json(vendor))
}

pub async fn update_vendor(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(vendor_id): Path<Uuid>,
    Json(input): Json<UpdateVendorInput>,
) -> AppResult<Json<Vendor>> {
    let service = VendorService::new(state.db);
    let existing = service.get(vendor_id).await?;
    user.authorize(Resource::Vendors, Action::Write, existing.branch_id)?;
    let vendor = service.update(existing, input).await?;
    Ok(Json(vendor))
}

/// Refused with 403 while purchases reference the vendor
pub async fn delete_vendor(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(vendor_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = VendorService::new(state.db);
    let existing = service.get(vendor_id).await?;
    user.authorize(Resource::Vendors, Action::Write, existing.branch_id)?;
    service.delete(vendor_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// What the vendor is still owed at its branch
pub async fn get_vendor_outstanding(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(vendor_id): Path<Uuid>,
) -> AppResult<Json<OutstandingSummary>> {
    let vendor = VendorService::new(state.db.clone()).get(vendor_id).await?;
    user.authorize(Resource::Purchases, Action::Read, vendor.branch_id)?;
    let summary = PurchaseService::new(state.db)
        .outstanding(vendor.id, vendor.branch_id)
        .await?;
    Ok(Json(summary))
}
