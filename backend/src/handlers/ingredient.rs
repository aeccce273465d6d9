//! HTTP handlers for the ingredient catalog

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::ingredient::{
    CreateIngredientInput, Ingredient, IngredientService, UpdateIngredientInput,
};
use crate::AppState;

/// List all ingredients
pub async fn list_ingredients(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Ingredient>>> {
    let service = IngredientService::new(state.db);
    let ingredients = service.list(current_user.0.user_id).await?;
    Ok(Json(ingredients))
}

/// Get one ingredient
pub async fn get_ingredient(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(ingredient_id): Path<Uuid>,
) -> AppResult<Json<Ingredient>> {
    let service = IngredientService::new(state.db);
    let ingredient = service.get(current_user.0.user_id, ingredient_id).await?;
    Ok(Json(ingredient))
}

/// Create an ingredient
pub async fn create_ingredient(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateIngredientInput>,
) -> AppResult<(StatusCode, Json<Ingredient>)> {
    let service = IngredientService::new(state.db);
    let ingredient = service.create(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(ingredient)))
}

/// Update an ingredient
pub async fn update_ingredient(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(ingredient_id): Path<Uuid>,
    Json(input): Json<UpdateIngredientInput>,
) -> AppResult<Json<Ingredient>> {
    let service = IngredientService::new(state.db);
    let ingredient = service.update(&current_user.0, ingredient_id, input).await?;
    Ok(Json(ingredient))
}

/// Delete an unreferenced ingredient
pub async fn delete_ingredient(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(ingredient_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = IngredientService::new(state.db);
    service.delete(&current_user.0, ingredient_id).await?;
    Ok(Json(()))
}
