//! HTTP handlers for expenses
//!
//! Mirror expenses (created for purchases and vendor payments) go through the
//! same endpoints; the service decides what each kind may change.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use shared::models::{
    Action, CreateExpenseInput, Expense, ExpenseListQuery, Resource, UpdateExpenseInput,
};
use shared::types::PaginatedResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::ExpenseService;
use crate::AppState;

pub async fn create_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateExpenseInput>,
) -> AppResult<(StatusCode, Json<Expense>)> {
    user.authorize(Resource::Expenses, Action::Write, input.branch_id)?;
    let expense = ExpenseService::new(state.db)
        .create(user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

pub async fn list_expenses(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(branch_id): Path<Uuid>,
    Query(query): Query<ExpenseListQuery>,
) -> AppResult<Json<PaginatedResponse<Expense>>> {
    user.authorize(Resource::Expenses, Action::Read, branch_id)?;
    let expenses = ExpenseService::new(state.db).list(branch_id, query).await?;
    Ok(Json(expenses))
}

pub async fn get_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(expense_id): Path<Uuid>,
) -> AppResult<Json<Expense>> {
    let expense = ExpenseService::new(state.db).get(expense_id).await?;
    user.authorize(Resource::Expenses, Action::Read, expense.branch_id)?;
    Ok(Json(expense))
}

pub async fn update_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(expense_id): Path<Uuid>,
    Json(input): Json<UpdateExpenseInput>,
) -> AppResult<Json<Expense>> {
    let service = ExpenseService::new(state.db);
    let existing = service.get(expense_id).await?;
    user.authorize(Resource::Expenses, Action::Write, existing.branch_id)?;
    let expense = service.update(expense_id, input).await?;
    Ok(Json(expense))
}

/// Deleting a vendor payment's mirror also reverses the payment
pub async fn delete_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(expense_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = ExpenseService::new(state.db);
    let existing = service.get(expense_id).await?;
    user.authorize(Resource::Expenses, Action::Write, existing.branch_id)?;
    service.delete(expense_id, user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
