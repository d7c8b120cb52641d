//! HTTP handlers for ingredient categories and ingredients

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use shared::models::{
    Action, CreateCategoryInput, CreateIngredientInput, Ingredient, IngredientCategory,
    IngredientListQuery, Resource, UpdateIngredientInput,
};
use shared::types::PaginatedResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::IngredientService;
use crate::AppState;

pub async fn create_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateCategoryInput>,
) -> AppResult<(StatusCode, Json<IngredientCategory>)> {
    user.authorize(Resource::Ingredients, Action::Write, input.branch_id)?;
    let category = IngredientService::new(state.db).create_category(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn list_categories(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(branch_id): Path<Uuid>,
) -> AppResult<Json<Vec<IngredientCategory>>> {
    user.authorize(Resource::Ingredients, Action::Read, branch_id)?;
    let categories = IngredientService::new(state.db).list_categories(branch_id).await?;
    Ok(Json(categories))
}

pub async fn create_ingredient(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateIngredientInput>,
) -> AppResult<(StatusCode, Json<Ingredient>)> {
    user.authorize(Resource::Ingredients, Action::Write, input.branch_id)?;
    let ingredient = IngredientService::new(state.db).create(input).await?;
    Ok((StatusCode::CREATED, Json(ingredient)))
}

pub async fn list_ingredients(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(branch_id): Path<Uuid>,
    Query(query): Query<IngredientListQuery>,
) -> AppResult<Json<PaginatedResponse<Ingredient>>> {
    user.authorize(Resource::Ingredients, Action::Read, branch_id)?;
    let ingredients = IngredientService::new(state.db).list(branch_id, query).await?;
    Ok(Json(ingredients))
}

pub async fn get_ingredient(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(ingredient_id): Path<Uuid>,
) -> AppResult<Json<Ingredient>> {
    let ingredient = IngredientService::new(state.db).get(ingredient_id).await?;
    user.authorize(Resource::Ingredients, Action::Read, ingredient.branch_id)?;
    Ok(Json(ingredient))
}

pub async fn update_ingredient(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(ingredient_id): Path<Uuid>,
    Json(input): Json<UpdateIngredientInput>,
) -> AppResult<Json<Ingredient>> {
    let service = IngredientService::new(state.db);
    let existing = service.get(ingredient_id).await?;
    user.authorize(Resource::Ingredients, Action::Write, existing.branch_id)?;
    let ingredient = service.update(existing, input).await?;
    Ok(Json(ingredient))
}

pub async fn delete_ingredient(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(ingredient_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = IngredientService::new(state.db);
    let existing = service.get(ingredient_id).await?;
    user.authorize(Resource::Ingredients, Action::Write, existing.branch_id)?;
    service.delete(ingredient_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
