//! HTTP handlers for warehouse lots and inventory movements

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::warehouse::{
    CreateLotInput, IngredientLot, InventoryMovement, LotValidation, StockLevel, UpdateLotInput,
    WarehouseService,
};
use crate::AppState;

/// Register a delivered lot
pub async fn create_lot(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateLotInput>,
) -> AppResult<(StatusCode, Json<IngredientLot>)> {
    let service = WarehouseService::new(state.db);
    let lot = service.create_lot(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(lot)))
}

/// List all lots
pub async fn list_lots(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<IngredientLot>>> {
    let service = WarehouseService::new(state.db);
    let lots = service.list_lots(current_user.0.user_id).await?;
    Ok(Json(lots))
}

/// Get one lot
pub async fn get_lot(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(lot_id): Path<Uuid>,
) -> AppResult<Json<IngredientLot>> {
    let service = WarehouseService::new(state.db);
    let lot = service.get_lot(current_user.0.user_id, lot_id).await?;
    Ok(Json(lot))
}

/// Available lots of an ingredient, earliest expiry first
pub async fn get_available_lots(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(ingredient_id): Path<Uuid>,
) -> AppResult<Json<Vec<IngredientLot>>> {
    let service = WarehouseService::new(state.db);
    let lots = service
        .available_lots(current_user.0.user_id, ingredient_id)
        .await?;
    Ok(Json(lots))
}

/// Update lot metadata
pub async fn update_lot(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(lot_id): Path<Uuid>,
    Json(input): Json<UpdateLotInput>,
) -> AppResult<Json<IngredientLot>> {
    let service = WarehouseService::new(state.db);
    let lot = service.update_lot(&current_user.0, lot_id, input).await?;
    Ok(Json(lot))
}

#[derive(Deserialize)]
pub struct ValidateLotQuery {
    pub required_quantity: Decimal,
}

/// Pre-flight validation of a draw from a lot
pub async fn validate_lot(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(lot_id): Path<Uuid>,
    Query(query): Query<ValidateLotQuery>,
) -> AppResult<Json<LotValidation>> {
    let service = WarehouseService::new(state.db);
    let validation = service
        .validate_lot(current_user.0.user_id, lot_id, query.required_quantity)
        .await?;
    Ok(Json(validation))
}

#[derive(Deserialize)]
pub struct DeductRequest {
    pub quantity: Decimal,
    pub reason: Option<String>,
}

/// Draw a quantity from a lot (manual correction / spillage path)
pub async fn deduct_from_lot(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(lot_id): Path<Uuid>,
    Json(body): Json<DeductRequest>,
) -> AppResult<Json<IngredientLot>> {
    let service = WarehouseService::new(state.db);
    let reason = body.reason.unwrap_or_else(|| "Scarico manuale".to_string());
    let lot = service
        .deduct(&current_user.0, lot_id, body.quantity, &reason)
        .await?;
    Ok(Json(lot))
}

/// Full movement ledger
pub async fn list_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<InventoryMovement>>> {
    let service = WarehouseService::new(state.db);
    let movements = service.list_movements(current_user.0.user_id).await?;
    Ok(Json(movements))
}

/// Movements touching one lot
pub async fn get_lot_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(lot_id): Path<Uuid>,
) -> AppResult<Json<Vec<InventoryMovement>>> {
    let service = WarehouseService::new(state.db);
    let movements = service
        .lot_movements(current_user.0.user_id, lot_id)
        .await?;
    Ok(Json(movements))
}

/// On-hand stock per ingredient
pub async fn get_stock_levels(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<StockLevel>>> {
    let service = WarehouseService::new(state.db);
    let levels = service.stock_levels(current_user.0.user_id).await?;
    Ok(Json(levels))
}
