//! Production batch service
//!
//! Orchestrates batch creation: per recipe line it resolves the current
//! ingredient price, scales the required quantity to the produced amount,
//! freezes price and line cost into a detail row, and draws the quantity from
//! the chosen lot with its paired outbound movement. Once the header's cost
//! fields are finalized they are frozen: later price changes never touch them.
//!
//! There is no cross-statement transaction around the whole workflow; a
//! failure partway through line processing leaves a batch whose header costs
//! are still NULL. Such batches are listed as incomplete and can be resumed,
//! which processes only the recipe lines that have no detail row yet.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::recipe::{Recipe, RecipeIngredient};
use crate::services::{AuditService, PricingService, RecipeService, WarehouseService};
use shared::costing;
use shared::validation::validate_positive_quantity;
use shared::AuditAction;

/// Production batch service
#[derive(Clone)]
pub struct ProductionService {
    db: PgPool,
}

/// A production batch header
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductionBatch {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub recipe_id: Uuid,
    pub produced_at: DateTime<Utc>,
    pub produced_quantity: Decimal,
    pub yield_unit: String,
    /// NULL until line processing completes, then frozen
    pub total_cost: Option<Decimal>,
    pub unit_cost: Option<Decimal>,
    pub source_template_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ProductionBatch {
    /// A batch whose cost fields were never finalized is incomplete
    pub fn is_incomplete(&self) -> bool {
        self.total_cost.is_none()
    }
}

/// One frozen detail line of a batch
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductionBatchDetail {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub ingredient_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub quantity_used: Decimal,
    pub unit: String,
    pub frozen_unit_price: Decimal,
    pub price_known: bool,
    pub line_cost: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A batch with its detail lines
#[derive(Debug, Clone, Serialize)]
pub struct BatchWithDetails {
    #[serde(flatten)]
    pub batch: ProductionBatch,
    pub details: Vec<ProductionBatchDetail>,
}

/// Lot chosen for one ingredient of a batch
#[derive(Debug, Clone, Deserialize)]
pub struct LotSelection {
    pub ingredient_id: Uuid,
    pub lot_id: Uuid,
}

/// Input for creating a batch through the manual flow
#[derive(Debug, Deserialize)]
pub struct CreateBatchInput {
    pub product_id: Uuid,
    pub produced_quantity: Decimal,
    pub produced_at: Option<DateTime<Utc>>,
    pub lot_selections: Vec<LotSelection>,
    pub notes: Option<String>,
}

/// Input for resuming an incomplete batch
#[derive(Debug, Default, Deserialize)]
pub struct ResumeBatchInput {
    #[serde(default)]
    pub lot_selections: Vec<LotSelection>,
}

/// Orchestrator request, shared by the manual flow and the template applier
#[derive(Debug)]
pub struct BatchRequest {
    pub product_id: Uuid,
    /// Explicit recipe (template path); when absent the product's recipe is
    /// resolved (manual path)
    pub recipe_id: Option<Uuid>,
    pub produced_quantity: Decimal,
    pub produced_at: DateTime<Utc>,
    /// Chosen lot per ingredient; ingredients without an entry get a
    /// NULL-lot detail row and no deduction
    pub lot_selections: HashMap<Uuid, Uuid>,
    pub source_template_id: Option<Uuid>,
    pub notes: Option<String>,
    /// Manual flow: every recipe line must have a selected lot before any
    /// write happens. Template flow: missing lots were already surfaced as
    /// pre-flight warnings.
    pub require_lot_selection: bool,
}

/// Short human-readable code for a batch, used in movement reasons
pub fn batch_code(id: Uuid) -> String {
    let hex = id.simple().to_string();
    hex[hex.len() - 6..].to_uppercase()
}

const BATCH_COLUMNS: &str = "id, user_id, product_id, recipe_id, produced_at, produced_quantity, \
     yield_unit, total_cost, unit_cost, source_template_id, notes, created_at";

const DETAIL_COLUMNS: &str = "id, batch_id, ingredient_id, lot_id, quantity_used, unit, \
     frozen_unit_price, price_known, line_cost, created_at";

impl ProductionService {
    /// Create a new ProductionService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a batch through the manual flow: a lot must be selected for
    /// every recipe ingredient
    pub async fn create_batch(
        &self,
        user: &AuthUser,
        input: CreateBatchInput,
    ) -> AppResult<BatchWithDetails> {
        let request = BatchRequest {
            product_id: input.product_id,
            recipe_id: None,
            produced_quantity: input.produced_quantity,
            produced_at: input.produced_at.unwrap_or_else(Utc::now),
            lot_selections: input
                .lot_selections
                .into_iter()
                .map(|s| (s.ingredient_id, s.lot_id))
                .collect(),
            source_template_id: None,
            notes: input.notes,
            require_lot_selection: true,
        };
        self.run_batch(user, request).await
    }

    /// Orchestrate one batch creation. Validation happens before the header
    /// is written; from there on, line processing is strictly sequential and
    /// each step is independently durable.
    pub async fn run_batch(
        &self,
        user: &AuthUser,
        request: BatchRequest,
    ) -> AppResult<BatchWithDetails> {
        if let Err(msg) = validate_positive_quantity(request.produced_quantity) {
            return Err(AppError::Validation {
                field: "produced_quantity".to_string(),
                message: msg.to_string(),
                message_it: "La quantità prodotta deve essere positiva".to_string(),
            });
        }

        // 1. A product without a valid recipe cannot produce a batch
        let recipe_service = RecipeService::new(self.db.clone());
        let recipe = match request.recipe_id {
            Some(recipe_id) => {
                recipe_service
                    .get_with_lines(user.user_id, recipe_id)
                    .await?
                    .recipe
            }
            None => recipe_service
                .find_for_product(user.user_id, request.product_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Recipe".to_string()))?,
        };

        let lines = recipe_service.lines(recipe.id).await?;

        if request.require_lot_selection {
            let missing: Vec<&RecipeIngredient> = lines
                .iter()
                .filter(|l| !request.lot_selections.contains_key(&l.ingredient_id))
                .collect();
            if !missing.is_empty() {
                return Err(AppError::Validation {
                    field: "lot_selections".to_string(),
                    message: "Select a lot for every ingredient".to_string(),
                    message_it: "Seleziona un lotto per ogni ingrediente".to_string(),
                });
            }
        }

        // 2. Header first; its id joins every detail row
        let batch = sqlx::query_as::<_, ProductionBatch>(&format!(
            r#"
            INSERT INTO production_batches
                (user_id, product_id, recipe_id, produced_at, produced_quantity,
                 yield_unit, source_template_id, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            BATCH_COLUMNS
        ))
        .bind(user.user_id)
        .bind(request.product_id)
        .bind(recipe.id)
        .bind(request.produced_at)
        .bind(request.produced_quantity)
        .bind(&recipe.yield_unit)
        .bind(request.source_template_id)
        .bind(&request.notes)
        .fetch_one(&self.db)
        .await?;

        // 3. One detail per recipe line, strictly sequential
        let mut line_costs = Vec::with_capacity(lines.len());
        for line in &lines {
            let lot_id = request.lot_selections.get(&line.ingredient_id).copied();
            let detail = self.process_line(user, &batch, &recipe, line, lot_id).await?;
            line_costs.push(detail.line_cost);
        }

        // 4. Freeze the totals
        let batch = self
            .finalize_batch(batch.id, &line_costs, request.produced_quantity)
            .await?;

        // 5. Audit trail
        AuditService::new(self.db.clone())
            .record(
                user.user_id,
                AuditAction::Create,
                "production_batches",
                &batch.id.to_string(),
                Some(serde_json::json!({
                    "product_id": batch.product_id,
                    "produced_quantity": batch.produced_quantity,
                    "source_template_id": batch.source_template_id,
                })),
            )
            .await;

        let details = self.details(batch.id).await?;
        Ok(BatchWithDetails { batch, details })
    }

    /// Process one recipe line: freeze price and cost, draw from the lot
    async fn process_line(
        &self,
        user: &AuthUser,
        batch: &ProductionBatch,
        recipe: &Recipe,
        line: &RecipeIngredient,
        lot_id: Option<Uuid>,
    ) -> AppResult<ProductionBatchDetail> {
        let price = PricingService::new(self.db.clone())
            .current_price(user.user_id, line.ingredient_id)
            .await?;

        let quantity_needed = costing::scale_quantity(
            line.quantity,
            recipe.batch_yield,
            batch.produced_quantity,
        );
        let line_cost = costing::line_cost(price.unit_price, quantity_needed);

        let detail = sqlx::query_as::<_, ProductionBatchDetail>(&format!(
            r#"
            INSERT INTO production_batch_details
                (user_id, batch_id, ingredient_id, lot_id, quantity_used, unit,
                 frozen_unit_price, price_known, line_cost)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            DETAIL_COLUMNS
        ))
        .bind(user.user_id)
        .bind(batch.id)
        .bind(line.ingredient_id)
        .bind(lot_id)
        .bind(quantity_needed)
        .bind(&line.unit)
        .bind(price.unit_price)
        .bind(price.price_known)
        .bind(line_cost)
        .fetch_one(&self.db)
        .await?;

        if let Some(lot_id) = lot_id {
            WarehouseService::new(self.db.clone())
                .deduct(
                    user,
                    lot_id,
                    quantity_needed,
                    &format!("Produzione lotto #{}", batch_code(batch.id)),
                )
                .await?;
        }

        Ok(detail)
    }

    /// Write the frozen totals onto the header
    async fn finalize_batch(
        &self,
        batch_id: Uuid,
        line_costs: &[Decimal],
        produced_quantity: Decimal,
    ) -> AppResult<ProductionBatch> {
        let totals = costing::batch_totals(line_costs, produced_quantity);

        let batch = sqlx::query_as::<_, ProductionBatch>(&format!(
            r#"
            UPDATE production_batches
            SET total_cost = $1, unit_cost = $2
            WHERE id = $3
            RETURNING {}
            "#,
            BATCH_COLUMNS
        ))
        .bind(totals.total)
        .bind(totals.per_unit)
        .bind(batch_id)
        .fetch_one(&self.db)
        .await?;

        Ok(batch)
    }

    /// Complete an incomplete batch: process recipe lines that have no detail
    /// row yet, then finalize the totals from all detail rows
    pub async fn resume_batch(
        &self,
        user: &AuthUser,
        batch_id: Uuid,
        input: ResumeBatchInput,
    ) -> AppResult<BatchWithDetails> {
        let batch = self.get_batch(user.user_id, batch_id).await?;

        if !batch.batch.is_incomplete() {
            return Err(AppError::Conflict {
                resource: "production_batch".to_string(),
                message: "Batch is already finalized; its cost is frozen".to_string(),
                message_it: "Il lotto è già finalizzato; il costo è congelato".to_string(),
            });
        }

        let recipe = sqlx::query_as::<_, Recipe>(
            r#"
            SELECT id, user_id, product_id, batch_yield, yield_unit, overhead_percent,
                   notes, created_at, updated_at
            FROM recipes
            WHERE id = $1
            "#,
        )
        .bind(batch.batch.recipe_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe".to_string()))?;

        let lines = RecipeService::new(self.db.clone()).lines(recipe.id).await?;
        let selections: HashMap<Uuid, Uuid> = input
            .lot_selections
            .into_iter()
            .map(|s| (s.ingredient_id, s.lot_id))
            .collect();

        let done: Vec<Uuid> = batch.details.iter().map(|d| d.ingredient_id).collect();

        for line in lines.iter().filter(|l| !done.contains(&l.ingredient_id)) {
            let lot_id = selections.get(&line.ingredient_id).copied();
            self.process_line(user, &batch.batch, &recipe, line, lot_id)
                .await?;
        }

        // Totals come from the detail rows, including those written before
        // the original run failed
        let line_costs: Vec<Decimal> = self
            .details(batch_id)
            .await?
            .iter()
            .map(|d| d.line_cost)
            .collect();
        let finalized = self
            .finalize_batch(batch_id, &line_costs, batch.batch.produced_quantity)
            .await?;

        AuditService::new(self.db.clone())
            .record(
                user.user_id,
                AuditAction::Update,
                "production_batches",
                &batch_id.to_string(),
                Some(serde_json::json!({ "resumed": true })),
            )
            .await;

        let details = self.details(batch_id).await?;
        Ok(BatchWithDetails {
            batch: finalized,
            details,
        })
    }

    /// List batches, newest production first
    pub async fn list_batches(&self, user_id: Uuid) -> AppResult<Vec<ProductionBatch>> {
        let batches = sqlx::query_as::<_, ProductionBatch>(&format!(
            "SELECT {} FROM production_batches WHERE user_id = $1 ORDER BY produced_at DESC",
            BATCH_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(batches)
    }

    /// Batches whose header costs were never finalized (partial state from a
    /// mid-workflow failure), oldest first for reconciliation
    pub async fn list_incomplete(&self, user_id: Uuid) -> AppResult<Vec<ProductionBatch>> {
        let batches = sqlx::query_as::<_, ProductionBatch>(&format!(
            r#"
            SELECT {}
            FROM production_batches
            WHERE user_id = $1 AND total_cost IS NULL
            ORDER BY created_at ASC
            "#,
            BATCH_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(batches)
    }

    /// Get a batch with its detail lines
    pub async fn get_batch(&self, user_id: Uuid, batch_id: Uuid) -> AppResult<BatchWithDetails> {
        let batch = sqlx::query_as::<_, ProductionBatch>(&format!(
            "SELECT {} FROM production_batches WHERE id = $1 AND user_id = $2",
            BATCH_COLUMNS
        ))
        .bind(batch_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Production batch".to_string()))?;

        let details = self.details(batch_id).await?;

        Ok(BatchWithDetails { batch, details })
    }

    /// Detail lines of a batch
    async fn details(&self, batch_id: Uuid) -> AppResult<Vec<ProductionBatchDetail>> {
        let details = sqlx::query_as::<_, ProductionBatchDetail>(&format!(
            "SELECT {} FROM production_batch_details WHERE batch_id = $1 ORDER BY created_at",
            DETAIL_COLUMNS
        ))
        .bind(batch_id)
        .fetch_all(&self.db)
        .await?;

        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_code_is_last_six_hex_uppercase() {
        let id = Uuid::parse_str("0191b2c3-d4e5-7f80-9192-a3b4c5d6e7f8").unwrap();
        assert_eq!(batch_code(id), "D6E7F8");
        assert_eq!(batch_code(id).len(), 6);
    }
}
