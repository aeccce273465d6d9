//! Audit trail service
//!
//! Append-only record of every mutating action: who, what, when, details.
//! Recording is fire-and-forget; a failed audit write is logged locally and
//! never propagated, so it cannot mask the outcome of the primary operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppResult;
use shared::AuditAction;

/// Audit service for the append-only action trail
#[derive(Clone)]
pub struct AuditService {
    db: PgPool,
}

/// One entry in the audit trail
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub table_name: String,
    pub record_id: String,
    pub details: Option<serde_json::Value>,
    pub recorded_at: DateTime<Utc>,
}

/// Filter for listing audit entries
#[derive(Debug, Default, Deserialize)]
pub struct AuditFilter {
    pub action: Option<AuditAction>,
    pub table_name: Option<String>,
    pub limit: Option<i64>,
}

impl AuditService {
    /// Create a new AuditService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Append one audit entry. Failures are swallowed after logging.
    pub async fn record(
        &self,
        user_id: Uuid,
        action: AuditAction,
        table_name: &str,
        record_id: &str,
        details: Option<serde_json::Value>,
    ) {
        let result = sqlx::query(
            r#"
            INSERT INTO audit_log (user_id, action, table_name, record_id, details)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user_id)
        .bind(action.as_str())
        .bind(table_name)
        .bind(record_id)
        .bind(details)
        .execute(&self.db)
        .await;

        if let Err(e) = result {
            tracing::warn!(
                action = action.as_str(),
                table = table_name,
                record = record_id,
                "Failed to write audit entry: {}",
                e
            );
        }
    }

    /// List audit entries for display, most recent first
    pub async fn list(&self, user_id: Uuid, filter: AuditFilter) -> AppResult<Vec<AuditLogEntry>> {
        let limit = filter.limit.unwrap_or(200).clamp(1, 1000);

        let entries = sqlx::query_as::<_, AuditLogEntry>(
            r#"
            SELECT id, user_id, action, table_name, record_id, details, recorded_at
            FROM audit_log
            WHERE user_id = $1
              AND ($2::TEXT IS NULL OR action = $2)
              AND ($3::TEXT IS NULL OR table_name = $3)
            ORDER BY recorded_at DESC
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(filter.action.map(|a| a.as_str().to_string()))
        .bind(&filter.table_name)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }
}
