//! HTTP handlers for the audit trail (display only)

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::audit::{AuditFilter, AuditLogEntry, AuditService};
use crate::AppState;

/// List audit entries, most recent first
pub async fn list_audit_entries(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<AuditFilter>,
) -> AppResult<Json<Vec<AuditLogEntry>>> {
    let service = AuditService::new(state.db);
    let entries = service.list(current_user.0.user_id, filter).await?;
    Ok(Json(entries))
}
