//! HTTP handlers for the stock ledger

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use shared::models::{
    Action, AdjustStockInput, Resource, Stock, StockListQuery, StockMovement, StockMovementQuery,
    StockView,
};
use shared::types::PaginatedResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::StockService;
use crate::AppState;

pub async fn list_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(branch_id): Path<Uuid>,
    Query(query): Query<StockListQuery>,
) -> AppResult<Json<PaginatedResponse<StockView>>> {
    user.authorize(Resource::Stock, Action::Read, branch_id)?;
    let stock = StockService::new(state.db).list(branch_id, query).await?;
    Ok(Json(stock))
}

pub async fn list_low_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(branch_id): Path<Uuid>,
) -> AppResult<Json<Vec<StockView>>> {
    user.authorize(Resource::Stock, Action::Read, branch_id)?;
    let stock = StockService::new(state.db).low_stock(branch_id).await?;
    Ok(Json(stock))
}

/// Manual stock count correction
pub async fn adjust_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(branch_id): Path<Uuid>,
    Json(input): Json<AdjustStockInput>,
) -> AppResult<Json<Stock>> {
    user.authorize(Resource::Stock, Action::Write, branch_id)?;
    let stock = StockService::new(state.db)
        .adjust(branch_id, user.user_id, input)
        .await?;
    Ok(Json(stock))
}

pub async fn list_stock_movements(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(branch_id): Path<Uuid>,
    Query(query): Query<StockMovementQuery>,
) -> AppResult<Json<PaginatedResponse<StockMovement>>> {
    user.authorize(Resource::Stock, Action::Read, branch_id)?;
    let movements = StockService::new(state.db).movements(branch_id, query).await?;
    Ok(Json(movements))
}
