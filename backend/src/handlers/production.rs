//! HTTP handlers for production batches

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::production::{
    BatchWithDetails, CreateBatchInput, ProductionBatch, ProductionService, ResumeBatchInput,
};
use crate::AppState;

/// Create a production batch (manual flow: all lots must be selected)
pub async fn create_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateBatchInput>,
) -> AppResult<(StatusCode, Json<BatchWithDetails>)> {
    let service = ProductionService::new(state.db);
    let batch = service.create_batch(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(batch)))
}

/// List production batches
pub async fn list_batches(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<ProductionBatch>>> {
    let service = ProductionService::new(state.db);
    let batches = service.list_batches(current_user.0.user_id).await?;
    Ok(Json(batches))
}

/// Batches whose cost fields were never finalized
pub async fn list_incomplete_batches(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<ProductionBatch>>> {
    let service = ProductionService::new(state.db);
    let batches = service.list_incomplete(current_user.0.user_id).await?;
    Ok(Json(batches))
}

/// Get a batch with its detail lines
pub async fn get_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<BatchWithDetails>> {
    let service = ProductionService::new(state.db);
    let batch = service.get_batch(current_user.0.user_id, batch_id).await?;
    Ok(Json(batch))
}

/// Resume an incomplete batch
pub async fn resume_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
    Json(input): Json<ResumeBatchInput>,
) -> AppResult<Json<BatchWithDetails>> {
    let service = ProductionService::new(state.db);
    let batch = service
        .resume_batch(&current_user.0, batch_id, input)
        .await?;
    Ok(Json(batch))
}
