//! HTTP handlers for branches

use axum::{extract::State, http::StatusCode, Json};

use shared::models::{Action, Branch, CreateBranchInput, Resource};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::BranchService;
use crate::AppState;

/// Register a branch (admins and holders of `branches:write`)
pub async fn create_branch(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateBranchInput>,
) -> AppResult<(StatusCode, Json<Branch>)> {
    user.require_permission(Resource::Branches, Action::Write)?;
    let branch = BranchService::new(state.db).create(input).await?;
    Ok((StatusCode::CREATED, Json(branch)))
}

/// Branches the caller can access
pub async fn list_branches(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Branch>>> {
    user.require_permission(Resource::Branches, Action::Read)?;
    let only = (!user.is_admin()).then_some(user.branches.as_slice());
    let branches = BranchService::new(state.db).list(only).await?;
    Ok(Json(branches))
}
