//! HTTP handlers for production templates

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::template::{
    ApplyOutcome, ApplyTemplateInput, CreateTemplateInput, ProductionTemplate, TemplateService,
    TemplateWithLines, UpdateTemplateInput, ValidationIssue,
};
use crate::AppState;

/// List templates
pub async fn list_templates(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<ProductionTemplate>>> {
    let service = TemplateService::new(state.db);
    let templates = service.list(current_user.0.user_id).await?;
    Ok(Json(templates))
}

/// Get a template with its lines
pub async fn get_template(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(template_id): Path<Uuid>,
) -> AppResult<Json<TemplateWithLines>> {
    let service = TemplateService::new(state.db);
    let template = service
        .get_with_lines(current_user.0.user_id, template_id)
        .await?;
    Ok(Json(template))
}

/// Create a template
pub async fn create_template(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateTemplateInput>,
) -> AppResult<(StatusCode, Json<TemplateWithLines>)> {
    let service = TemplateService::new(state.db);
    let template = service.create(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

/// Update a template
pub async fn update_template(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(template_id): Path<Uuid>,
    Json(input): Json<UpdateTemplateInput>,
) -> AppResult<Json<TemplateWithLines>> {
    let service = TemplateService::new(state.db);
    let template = service.update(&current_user.0, template_id, input).await?;
    Ok(Json(template))
}

/// Delete a template
pub async fn delete_template(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(template_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = TemplateService::new(state.db);
    service.delete(&current_user.0, template_id).await?;
    Ok(Json(()))
}

/// Pre-flight validation of a template application
pub async fn validate_template(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(template_id): Path<Uuid>,
) -> AppResult<Json<Vec<ValidationIssue>>> {
    let service = TemplateService::new(state.db);
    let issues = service
        .validate_application(current_user.0.user_id, template_id)
        .await?;
    Ok(Json(issues))
}

/// Apply a template across a date range
pub async fn apply_template(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(template_id): Path<Uuid>,
    Json(input): Json<ApplyTemplateInput>,
) -> AppResult<Json<ApplyOutcome>> {
    let service = TemplateService::new(state.db);
    let outcome = service.apply(&current_user.0, template_id, input).await?;
    Ok(Json(outcome))
}
