//! Reporting service for analytics and data export
//!
//! Dashboard metrics plus flat, exportable views: batch traceability (which
//! lot of which ingredient went into which batch) and HACCP registers.
//! Reports serialize to JSON or CSV; PDF rendering is a client concern.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

/// Headline numbers for the dashboard
#[derive(Debug, Serialize)]
pub struct DashboardMetrics {
    pub ingredient_count: i64,
    pub product_count: i64,
    pub recipe_count: i64,
    pub active_lot_count: i64,
    pub batches_last_30_days: i64,
    pub incomplete_batch_count: i64,
    pub low_stock_count: i64,
    pub open_non_conformities: i64,
}

/// One traceability row: batch -> ingredient -> source lot
#[derive(Debug, Serialize, FromRow)]
pub struct TraceabilityRow {
    pub batch_id: Uuid,
    pub product_name: String,
    pub produced_at: DateTime<Utc>,
    pub produced_quantity: Decimal,
    pub yield_unit: String,
    pub ingredient_name: String,
    pub quantity_used: Decimal,
    pub unit: String,
    pub lot_code: Option<String>,
    pub lot_supplier: Option<String>,
    pub lot_expiry: Option<NaiveDate>,
    pub frozen_unit_price: Decimal,
    pub line_cost: Decimal,
}

/// One HACCP temperature row for export
#[derive(Debug, Serialize, FromRow)]
pub struct TemperatureExportRow {
    pub reference_date: NaiveDate,
    pub equipment: String,
    pub temperature: Decimal,
    pub limit_min: Option<Decimal>,
    pub limit_max: Option<Decimal>,
    pub operator: Option<String>,
    pub status: String,
    pub void_reason: Option<String>,
}

impl ReportingService {
    /// Create a new ReportingService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Dashboard metrics for the account
    pub async fn dashboard_metrics(&self, user_id: Uuid) -> AppResult<DashboardMetrics> {
        let ingredient_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM ingredients WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.db)
                .await?;

        let product_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.db)
                .await?;

        let recipe_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM recipes WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.db)
                .await?;

        let active_lot_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM ingredient_lots WHERE user_id = $1 AND current_quantity > 0",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        let batches_last_30_days: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM production_batches
            WHERE user_id = $1 AND produced_at >= NOW() - INTERVAL '30 days'
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        let incomplete_batch_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM production_batches WHERE user_id = $1 AND total_cost IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        // Ingredients whose ledger balance sits at or under their threshold
        let low_stock_count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM (
                SELECT i.id
                FROM ingredients i
                LEFT JOIN inventory_movements m ON m.ingredient_id = i.id
                WHERE i.user_id = $1 AND i.min_stock_threshold IS NOT NULL
                GROUP BY i.id, i.min_stock_threshold
                HAVING COALESCE(SUM(
                    CASE WHEN m.direction = 'inbound' THEN m.quantity
                         WHEN m.direction = 'outbound' THEN -m.quantity
                         ELSE 0 END), 0) <= i.min_stock_threshold
            ) below
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        let open_non_conformities: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM haccp_temperature_logs
            WHERE user_id = $1 AND status = 'recorded'
              AND non_conformity IS NOT NULL AND corrective_action IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(DashboardMetrics {
            ingredient_count,
            product_count,
            recipe_count,
            active_lot_count,
            batches_last_30_days,
            incomplete_batch_count,
            low_stock_count,
            open_non_conformities,
        })
    }

    /// Traceability rows for one batch, or for all batches in a date range
    pub async fn batch_traceability(
        &self,
        user_id: Uuid,
        batch_id: Option<Uuid>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> AppResult<Vec<TraceabilityRow>> {
        let rows = sqlx::query_as::<_, TraceabilityRow>(
            r#"
            SELECT b.id AS batch_id, p.name AS product_name, b.produced_at,
                   b.produced_quantity, b.yield_unit,
                   i.name AS ingredient_name, d.quantity_used, d.unit,
                   l.lot_code, l.supplier AS lot_supplier, l.expiry_date AS lot_expiry,
                   d.frozen_unit_price, d.line_cost
            FROM production_batch_details d
            JOIN production_batches b ON b.id = d.batch_id
            JOIN products p ON p.id = b.product_id
            JOIN ingredients i ON i.id = d.ingredient_id
            LEFT JOIN ingredient_lots l ON l.id = d.lot_id
            WHERE b.user_id = $1
              AND ($2::UUID IS NULL OR b.id = $2)
              AND ($3::DATE IS NULL OR b.produced_at >= $3::DATE)
              AND ($4::DATE IS NULL OR b.produced_at < ($4::DATE + 1))
            ORDER BY b.produced_at DESC, i.name
            "#,
        )
        .bind(user_id)
        .bind(batch_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// HACCP temperature register rows for export
    pub async fn temperature_register(
        &self,
        user_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> AppResult<Vec<TemperatureExportRow>> {
        let rows = sqlx::query_as::<_, TemperatureExportRow>(
            r#"
            SELECT reference_date, equipment, temperature, limit_min, limit_max,
                   operator, status, void_reason
            FROM haccp_temperature_logs
            WHERE user_id = $1
              AND ($2::DATE IS NULL OR reference_date >= $2)
              AND ($3::DATE IS NULL OR reference_date <= $3)
            ORDER BY reference_date, recorded_at
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Export report data as CSV
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record).map_err(|e| {
                AppError::Internal(format!("CSV serialization error: {}", e))
            })?;
        }
        let csv_data = String::from_utf8(
            wtr.into_inner()
                .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?,
        )
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))?;
        Ok(csv_data)
    }
}
