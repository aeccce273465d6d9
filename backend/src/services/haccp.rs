//! HACCP compliance log service
//!
//! Temperature and cleaning records with append-only retention: a record is
//! voided with a mandatory reason, never deleted. `recorded -> voided` is the
//! only transition and `voided` is terminal. Auto-fill copies one day's
//! records onto days of a range that have none at all.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::AuditService;
use shared::validation::{validate_date_range, validate_void_reason};
use shared::{AuditAction, HaccpStatus};

/// HACCP log service
#[derive(Clone)]
pub struct HaccpService {
    db: PgPool,
}

/// A temperature check record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct HaccpTemperatureLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub equipment: String,
    pub temperature: Decimal,
    pub limit_min: Option<Decimal>,
    pub limit_max: Option<Decimal>,
    pub recorded_at: DateTime<Utc>,
    pub reference_date: NaiveDate,
    pub operator: Option<String>,
    pub shift: Option<String>,
    pub non_conformity: Option<String>,
    pub corrective_action: Option<String>,
    pub status: String,
    pub void_reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A cleaning task record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct HaccpCleaningLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub area: String,
    pub task: String,
    pub frequency: Option<String>,
    pub completed: bool,
    pub recorded_at: DateTime<Utc>,
    pub reference_date: NaiveDate,
    pub operator: Option<String>,
    pub shift: Option<String>,
    pub status: String,
    pub void_reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for recording a temperature check
#[derive(Debug, Deserialize)]
pub struct RecordTemperatureInput {
    pub equipment: String,
    pub temperature: Decimal,
    pub limit_min: Option<Decimal>,
    pub limit_max: Option<Decimal>,
    pub recorded_at: Option<DateTime<Utc>>,
    pub operator: Option<String>,
    pub shift: Option<String>,
    pub non_conformity: Option<String>,
    pub corrective_action: Option<String>,
    pub notes: Option<String>,
}

/// Input for recording a cleaning task
#[derive(Debug, Deserialize)]
pub struct RecordCleaningInput {
    pub area: String,
    pub task: String,
    pub frequency: Option<String>,
    pub completed: Option<bool>,
    pub recorded_at: Option<DateTime<Utc>>,
    pub operator: Option<String>,
    pub shift: Option<String>,
    pub notes: Option<String>,
}

/// Input for voiding a record
#[derive(Debug, Deserialize)]
pub struct VoidInput {
    pub reason: String,
}

/// Date-range filter for listings
#[derive(Debug, Default, Deserialize)]
pub struct HaccpFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Input for auto-filling missing days from a source day
#[derive(Debug, Deserialize)]
pub struct AutoFillInput {
    pub source_date: NaiveDate,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub include_temperatures: bool,
    pub include_cleanings: bool,
}

/// Outcome of an auto-fill run
#[derive(Debug, Clone, Serialize)]
pub struct AutoFillOutcome {
    pub days_filled: Vec<NaiveDate>,
    pub temperature_count: u32,
    pub cleaning_count: u32,
}

const TEMP_COLUMNS: &str = "id, user_id, equipment, temperature, limit_min, limit_max, \
     recorded_at, reference_date, operator, shift, non_conformity, corrective_action, \
     status, void_reason, notes, created_at";

const CLEAN_COLUMNS: &str = "id, user_id, area, task, frequency, completed, recorded_at, \
     reference_date, operator, shift, status, void_reason, notes, created_at";

impl HaccpService {
    /// Create a new HaccpService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a temperature check
    pub async fn record_temperature(
        &self,
        user: &AuthUser,
        input: RecordTemperatureInput,
    ) -> AppResult<HaccpTemperatureLog> {
        if input.equipment.trim().is_empty() {
            return Err(AppError::Validation {
                field: "equipment".to_string(),
                message: "Equipment cannot be empty".to_string(),
                message_it: "L'attrezzatura non può essere vuota".to_string(),
            });
        }

        let recorded_at = input.recorded_at.unwrap_or_else(Utc::now);

        let log = sqlx::query_as::<_, HaccpTemperatureLog>(&format!(
            r#"
            INSERT INTO haccp_temperature_logs
                (user_id, equipment, temperature, limit_min, limit_max, recorded_at,
                 reference_date, operator, shift, non_conformity, corrective_action,
                 status, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            TEMP_COLUMNS
        ))
        .bind(user.user_id)
        .bind(input.equipment.trim())
        .bind(input.temperature)
        .bind(input.limit_min)
        .bind(input.limit_max)
        .bind(recorded_at)
        .bind(recorded_at.date_naive())
        .bind(&input.operator)
        .bind(&input.shift)
        .bind(&input.non_conformity)
        .bind(&input.corrective_action)
        .bind(HaccpStatus::Recorded.as_str())
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await?;

        AuditService::new(self.db.clone())
            .record(
                user.user_id,
                AuditAction::Create,
                "haccp_temperature_logs",
                &log.id.to_string(),
                Some(serde_json::json!({ "equipment": log.equipment })),
            )
            .await;

        Ok(log)
    }

    /// Record a cleaning task
    pub async fn record_cleaning(
        &self,
        user: &AuthUser,
        input: RecordCleaningInput,
    ) -> AppResult<HaccpCleaningLog> {
        if input.area.trim().is_empty() || input.task.trim().is_empty() {
            return Err(AppError::Validation {
                field: "area".to_string(),
                message: "Area and task cannot be empty".to_string(),
                message_it: "Area e compito non possono essere vuoti".to_string(),
            });
        }

        let recorded_at = input.recorded_at.unwrap_or_else(Utc::now);

        let log = sqlx::query_as::<_, HaccpCleaningLog>(&format!(
            r#"
            INSERT INTO haccp_cleaning_logs
                (user_id, area, task, frequency, completed, recorded_at,
                 reference_date, operator, shift, status, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            CLEAN_COLUMNS
        ))
        .bind(user.user_id)
        .bind(input.area.trim())
        .bind(input.task.trim())
        .bind(&input.frequency)
        .bind(input.completed.unwrap_or(true))
        .bind(recorded_at)
        .bind(recorded_at.date_naive())
        .bind(&input.operator)
        .bind(&input.shift)
        .bind(HaccpStatus::Recorded.as_str())
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await?;

        AuditService::new(self.db.clone())
            .record(
                user.user_id,
                AuditAction::Create,
                "haccp_cleaning_logs",
                &log.id.to_string(),
                Some(serde_json::json!({ "area": log.area, "task": log.task })),
            )
            .await;

        Ok(log)
    }

    /// Temperature records in a reference-date range, newest first
    pub async fn list_temperatures(
        &self,
        user_id: Uuid,
        filter: HaccpFilter,
    ) -> AppResult<Vec<HaccpTemperatureLog>> {
        let logs = sqlx::query_as::<_, HaccpTemperatureLog>(&format!(
            r#"
            SELECT {}
            FROM haccp_temperature_logs
            WHERE user_id = $1
              AND ($2::DATE IS NULL OR reference_date >= $2)
              AND ($3::DATE IS NULL OR reference_date <= $3)
            ORDER BY recorded_at DESC
            "#,
            TEMP_COLUMNS
        ))
        .bind(user_id)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.db)
        .await?;

        Ok(logs)
    }

    /// Cleaning records in a reference-date range, newest first
    pub async fn list_cleanings(
        &self,
        user_id: Uuid,
        filter: HaccpFilter,
    ) -> AppResult<Vec<HaccpCleaningLog>> {
        let logs = sqlx::query_as::<_, HaccpCleaningLog>(&format!(
            r#"
            SELECT {}
            FROM haccp_cleaning_logs
            WHERE user_id = $1
              AND ($2::DATE IS NULL OR reference_date >= $2)
              AND ($3::DATE IS NULL OR reference_date <= $3)
            ORDER BY recorded_at DESC
            "#,
            CLEAN_COLUMNS
        ))
        .bind(user_id)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.db)
        .await?;

        Ok(logs)
    }

    /// Void a temperature record. Permanent, reason mandatory.
    pub async fn void_temperature(
        &self,
        user: &AuthUser,
        log_id: Uuid,
        input: VoidInput,
    ) -> AppResult<HaccpTemperatureLog> {
        self.check_voidable(user.user_id, "haccp_temperature_logs", log_id, &input.reason)
            .await?;

        let log = sqlx::query_as::<_, HaccpTemperatureLog>(&format!(
            r#"
            UPDATE haccp_temperature_logs
            SET status = $1, void_reason = $2
            WHERE id = $3
            RETURNING {}
            "#,
            TEMP_COLUMNS
        ))
        .bind(HaccpStatus::Voided.as_str())
        .bind(input.reason.trim())
        .bind(log_id)
        .fetch_one(&self.db)
        .await?;

        AuditService::new(self.db.clone())
            .record(
                user.user_id,
                AuditAction::Cancel,
                "haccp_temperature_logs",
                &log_id.to_string(),
                Some(serde_json::json!({ "reason": input.reason.trim() })),
            )
            .await;

        Ok(log)
    }

    /// Void a cleaning record. Permanent, reason mandatory.
    pub async fn void_cleaning(
        &self,
        user: &AuthUser,
        log_id: Uuid,
        input: VoidInput,
    ) -> AppResult<HaccpCleaningLog> {
        self.check_voidable(user.user_id, "haccp_cleaning_logs", log_id, &input.reason)
            .await?;

        let log = sqlx::query_as::<_, HaccpCleaningLog>(&format!(
            r#"
            UPDATE haccp_cleaning_logs
            SET status = $1, void_reason = $2
            WHERE id = $3
            RETURNING {}
            "#,
            CLEAN_COLUMNS
        ))
        .bind(HaccpStatus::Voided.as_str())
        .bind(input.reason.trim())
        .bind(log_id)
        .fetch_one(&self.db)
        .await?;

        AuditService::new(self.db.clone())
            .record(
                user.user_id,
                AuditAction::Cancel,
                "haccp_cleaning_logs",
                &log_id.to_string(),
                Some(serde_json::json!({ "reason": input.reason.trim() })),
            )
            .await;

        Ok(log)
    }

    /// Shared void pre-checks: record exists, reason non-empty, status allows
    /// the transition
    async fn check_voidable(
        &self,
        user_id: Uuid,
        table: &str,
        log_id: Uuid,
        reason: &str,
    ) -> AppResult<()> {
        if let Err(msg) = validate_void_reason(reason) {
            return Err(AppError::Validation {
                field: "reason".to_string(),
                message: msg.to_string(),
                message_it: "Inserire un motivo".to_string(),
            });
        }

        let status = sqlx::query_scalar::<_, String>(&format!(
            "SELECT status FROM {} WHERE id = $1 AND user_id = $2",
            table
        ))
        .bind(log_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("HACCP record".to_string()))?;

        let status = HaccpStatus::from_str(&status)
            .ok_or_else(|| AppError::Internal(format!("Unknown HACCP status: {}", status)))?;

        if !status.can_void() {
            return Err(AppError::InvalidStateTransition(
                "Record is already voided".to_string(),
            ));
        }

        Ok(())
    }

    /// Copy one day's records onto every day of the range that has no records
    /// at all. Copies are marked in their notes and created as `recorded`.
    pub async fn auto_fill(
        &self,
        user: &AuthUser,
        input: AutoFillInput,
    ) -> AppResult<AutoFillOutcome> {
        if let Err(msg) = validate_date_range(input.start_date, input.end_date) {
            return Err(AppError::Validation {
                field: "end_date".to_string(),
                message: msg.to_string(),
                message_it: "La data di inizio non può essere successiva alla data di fine"
                    .to_string(),
            });
        }

        let source_temps = self
            .list_temperatures(
                user.user_id,
                HaccpFilter {
                    from: Some(input.source_date),
                    to: Some(input.source_date),
                },
            )
            .await?;
        let source_cleans = self
            .list_cleanings(
                user.user_id,
                HaccpFilter {
                    from: Some(input.source_date),
                    to: Some(input.source_date),
                },
            )
            .await?;

        let source_info = format!(
            "GENERATO DA COPIA - Sorgente: {}",
            input.source_date.format("%d/%m/%Y")
        );

        let mut days_filled = Vec::new();
        let mut temperature_count: u32 = 0;
        let mut cleaning_count: u32 = 0;

        let mut day = input.start_date;
        while day <= input.end_date {
            if self.day_has_records(user.user_id, day).await? {
                day = day
                    .succ_opt()
                    .ok_or_else(|| AppError::Internal("Date overflow".to_string()))?;
                continue;
            }

            if input.include_temperatures {
                for t in &source_temps {
                    let notes = match &t.notes {
                        Some(n) => format!("{} ({})", n, source_info),
                        None => source_info.clone(),
                    };
                    let recorded_at = day
                        .and_hms_opt(12, 0, 0)
                        .map(|dt| dt.and_utc())
                        .ok_or_else(|| AppError::Internal("Invalid time of day".to_string()))?;
                    sqlx::query(
                        r#"
                        INSERT INTO haccp_temperature_logs
                            (user_id, equipment, temperature, limit_min, limit_max,
                             recorded_at, reference_date, operator, shift, status, notes)
                        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                        "#,
                    )
                    .bind(user.user_id)
                    .bind(&t.equipment)
                    .bind(t.temperature)
                    .bind(t.limit_min)
                    .bind(t.limit_max)
                    .bind(recorded_at)
                    .bind(day)
                    .bind(&t.operator)
                    .bind(&t.shift)
                    .bind(HaccpStatus::Recorded.as_str())
                    .bind(notes)
                    .execute(&self.db)
                    .await?;
                    temperature_count += 1;
                }
            }

            if input.include_cleanings {
                for c in &source_cleans {
                    let notes = match &c.notes {
                        Some(n) => format!("{} ({})", n, source_info),
                        None => source_info.clone(),
                    };
                    let recorded_at = day
                        .and_hms_opt(18, 0, 0)
                        .map(|dt| dt.and_utc())
                        .ok_or_else(|| AppError::Internal("Invalid time of day".to_string()))?;
                    sqlx::query(
                        r#"
                        INSERT INTO haccp_cleaning_logs
                            (user_id, area, task, frequency, completed, recorded_at,
                             reference_date, operator, shift, status, notes)
                        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                        "#,
                    )
                    .bind(user.user_id)
                    .bind(&c.area)
                    .bind(&c.task)
                    .bind(&c.frequency)
                    .bind(true)
                    .bind(recorded_at)
                    .bind(day)
                    .bind(&c.operator)
                    .bind(&c.shift)
                    .bind(HaccpStatus::Recorded.as_str())
                    .bind(notes)
                    .execute(&self.db)
                    .await?;
                    cleaning_count += 1;
                }
            }

            days_filled.push(day);
            day = day
                .succ_opt()
                .ok_or_else(|| AppError::Internal("Date overflow".to_string()))?;
        }

        AuditService::new(self.db.clone())
            .record(
                user.user_id,
                AuditAction::AutoFill,
                "haccp_logs",
                "multiple",
                Some(serde_json::json!({
                    "source_date": input.source_date,
                    "days_filled": days_filled,
                    "temperature_count": temperature_count,
                    "cleaning_count": cleaning_count,
                })),
            )
            .await;

        Ok(AutoFillOutcome {
            days_filled,
            temperature_count,
            cleaning_count,
        })
    }

    /// Whether any HACCP record (temperature or cleaning) exists for a day
    async fn day_has_records(&self, user_id: Uuid, day: NaiveDate) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM haccp_temperature_logs WHERE user_id = $1 AND reference_date = $2
            ) OR EXISTS(
                SELECT 1 FROM haccp_cleaning_logs WHERE user_id = $1 AND reference_date = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(day)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }
}
