//! Ingredient pricing service
//!
//! Purchase prices are an append-only history; the "current" price of an
//! ingredient is the newest record by purchase date. Batch costing freezes
//! whatever this service resolves at production time.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::AuditService;
use shared::validation::validate_price;
use shared::AuditAction;

/// Pricing service for purchase-price history and current-price resolution
#[derive(Clone)]
pub struct PricingService {
    db: PgPool,
}

/// One purchase-price record (append-only)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PriceRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ingredient_id: Uuid,
    pub purchase_date: NaiveDate,
    pub supplier: Option<String>,
    pub price_per_unit: Decimal,
    pub document_ref: Option<String>,
    pub document_photo_url: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of current-price resolution.
///
/// An ingredient without any price record resolves to zero with
/// `price_known = false`; that never blocks batch creation, it only marks the
/// resulting cost line as unpriced.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ResolvedPrice {
    pub unit_price: Decimal,
    pub price_known: bool,
    pub as_of: Option<NaiveDate>,
}

/// Input for recording a purchase price
#[derive(Debug, Deserialize)]
pub struct RecordPriceInput {
    pub ingredient_id: Uuid,
    pub purchase_date: NaiveDate,
    pub supplier: Option<String>,
    pub price_per_unit: Decimal,
    pub document_ref: Option<String>,
    pub document_photo_url: Option<String>,
    pub notes: Option<String>,
}

impl PricingService {
    /// Create a new PricingService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Resolve the current price of an ingredient (read-only)
    pub async fn current_price(
        &self,
        user_id: Uuid,
        ingredient_id: Uuid,
    ) -> AppResult<ResolvedPrice> {
        let latest = sqlx::query_as::<_, (Decimal, NaiveDate)>(
            r#"
            SELECT price_per_unit, purchase_date
            FROM price_records
            WHERE ingredient_id = $1 AND user_id = $2
            ORDER BY purchase_date DESC, created_at DESC
            LIMIT 1
            "#,
        )
        .bind(ingredient_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(match latest {
            Some((price, as_of)) => ResolvedPrice {
                unit_price: price,
                price_known: true,
                as_of: Some(as_of),
            },
            None => ResolvedPrice {
                unit_price: Decimal::ZERO,
                price_known: false,
                as_of: None,
            },
        })
    }

    /// Record a purchase price
    pub async fn record_price(
        &self,
        user: &AuthUser,
        input: RecordPriceInput,
    ) -> AppResult<PriceRecord> {
        if let Err(msg) = validate_price(input.price_per_unit) {
            return Err(AppError::Validation {
                field: "price_per_unit".to_string(),
                message: msg.to_string(),
                message_it: "Il prezzo non può essere negativo".to_string(),
            });
        }

        // Validate ingredient belongs to the account
        let ingredient_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM ingredients WHERE id = $1 AND user_id = $2)",
        )
        .bind(input.ingredient_id)
        .bind(user.user_id)
        .fetch_one(&self.db)
        .await?;

        if !ingredient_exists {
            return Err(AppError::NotFound("Ingredient".to_string()));
        }

        let record = sqlx::query_as::<_, PriceRecord>(
            r#"
            INSERT INTO price_records
                (user_id, ingredient_id, purchase_date, supplier, price_per_unit,
                 document_ref, document_photo_url, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, ingredient_id, purchase_date, supplier, price_per_unit,
                      document_ref, document_photo_url, notes, created_at
            "#,
        )
        .bind(user.user_id)
        .bind(input.ingredient_id)
        .bind(input.purchase_date)
        .bind(&input.supplier)
        .bind(input.price_per_unit)
        .bind(&input.document_ref)
        .bind(&input.document_photo_url)
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await?;

        AuditService::new(self.db.clone())
            .record(
                user.user_id,
                AuditAction::Create,
                "price_records",
                &record.id.to_string(),
                Some(serde_json::json!({
                    "ingredient_id": record.ingredient_id,
                    "price_per_unit": record.price_per_unit,
                })),
            )
            .await;

        Ok(record)
    }

    /// Price history for an ingredient, newest first
    pub async fn price_history(
        &self,
        user_id: Uuid,
        ingredient_id: Uuid,
    ) -> AppResult<Vec<PriceRecord>> {
        let records = sqlx::query_as::<_, PriceRecord>(
            r#"
            SELECT id, user_id, ingredient_id, purchase_date, supplier, price_per_unit,
                   document_ref, document_photo_url, notes, created_at
            FROM price_records
            WHERE ingredient_id = $1 AND user_id = $2
            ORDER BY purchase_date DESC, created_at DESC
            "#,
        )
        .bind(ingredient_id)
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(records)
    }
}
