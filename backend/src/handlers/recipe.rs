//! HTTP handlers for recipes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::recipe::{
    CreateRecipeInput, Recipe, RecipeService, RecipeWithLines, UpdateRecipeInput,
};
use crate::AppState;

/// List all recipes
pub async fn list_recipes(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Recipe>>> {
    let service = RecipeService::new(state.db);
    let recipes = service.list(current_user.0.user_id).await?;
    Ok(Json(recipes))
}

/// Get a recipe with its ingredient lines
pub async fn get_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(recipe_id): Path<Uuid>,
) -> AppResult<Json<RecipeWithLines>> {
    let service = RecipeService::new(state.db);
    let recipe = service
        .get_with_lines(current_user.0.user_id, recipe_id)
        .await?;
    Ok(Json(recipe))
}

/// The recipe linked to a product, if any
pub async fn get_recipe_for_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Option<Recipe>>> {
    let service = RecipeService::new(state.db);
    let recipe = service
        .find_for_product(current_user.0.user_id, product_id)
        .await?;
    Ok(Json(recipe))
}

/// Create a recipe with its lines
pub async fn create_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateRecipeInput>,
) -> AppResult<(StatusCode, Json<RecipeWithLines>)> {
    let service = RecipeService::new(state.db);
    let recipe = service.create(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

/// Update a recipe, reconciling its lines when given
pub async fn update_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(recipe_id): Path<Uuid>,
    Json(input): Json<UpdateRecipeInput>,
) -> AppResult<Json<RecipeWithLines>> {
    let service = RecipeService::new(state.db);
    let recipe = service.update(&current_user.0, recipe_id, input).await?;
    Ok(Json(recipe))
}

/// Delete a recipe without production history
pub async fn delete_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(recipe_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = RecipeService::new(state.db);
    service.delete(&current_user.0, recipe_id).await?;
    Ok(Json(()))
}
