//! HTTP handlers for HACCP compliance logs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::haccp::{
    AutoFillInput, AutoFillOutcome, HaccpCleaningLog, HaccpFilter, HaccpService,
    HaccpTemperatureLog, RecordCleaningInput, RecordTemperatureInput, VoidInput,
};
use crate::AppState;

/// Record a temperature check
pub async fn record_temperature(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecordTemperatureInput>,
) -> AppResult<(StatusCode, Json<HaccpTemperatureLog>)> {
    let service = HaccpService::new(state.db);
    let log = service.record_temperature(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(log)))
}

/// Record a cleaning task
pub async fn record_cleaning(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecordCleaningInput>,
) -> AppResult<(StatusCode, Json<HaccpCleaningLog>)> {
    let service = HaccpService::new(state.db);
    let log = service.record_cleaning(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(log)))
}

/// List temperature records
pub async fn list_temperatures(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<HaccpFilter>,
) -> AppResult<Json<Vec<HaccpTemperatureLog>>> {
    let service = HaccpService::new(state.db);
    let logs = service
        .list_temperatures(current_user.0.user_id, filter)
        .await?;
    Ok(Json(logs))
}

/// List cleaning records
pub async fn list_cleanings(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<HaccpFilter>,
) -> AppResult<Json<Vec<HaccpCleaningLog>>> {
    let service = HaccpService::new(state.db);
    let logs = service
        .list_cleanings(current_user.0.user_id, filter)
        .await?;
    Ok(Json(logs))
}

/// Void a temperature record (mandatory reason, permanent)
pub async fn void_temperature(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(log_id): Path<Uuid>,
    Json(input): Json<VoidInput>,
) -> AppResult<Json<HaccpTemperatureLog>> {
    let service = HaccpService::new(state.db);
    let log = service
        .void_temperature(&current_user.0, log_id, input)
        .await?;
    Ok(Json(log))
}

/// Void a cleaning record (mandatory reason, permanent)
pub async fn void_cleaning(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(log_id): Path<Uuid>,
    Json(input): Json<VoidInput>,
) -> AppResult<Json<HaccpCleaningLog>> {
    let service = HaccpService::new(state.db);
    let log = service
        .void_cleaning(&current_user.0, log_id, input)
        .await?;
    Ok(Json(log))
}

/// Copy a source day's records onto empty days of a range
pub async fn auto_fill(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<AutoFillInput>,
) -> AppResult<Json<AutoFillOutcome>> {
    let service = HaccpService::new(state.db);
    let outcome = service.auto_fill(&current_user.0, input).await?;
    Ok(Json(outcome))
}
