//! Production template service
//!
//! A template is a reusable blueprint of planned production lines (product +
//! recipe + quantity, optionally with pre-selected lots per ingredient).
//! Applying one drives the batch orchestrator once per line per day across an
//! inclusive date range, idempotently: a day that already has a batch
//! generated from the same template is skipped, so re-applying the same range
//! creates nothing new.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::production::BatchRequest;
use crate::services::{AuditService, ProductionService};
use shared::validation::{validate_date_range, validate_positive_quantity};
use shared::{AuditAction, IssueSeverity};

/// Template service
#[derive(Clone)]
pub struct TemplateService {
    db: PgPool,
}

/// A production template header
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductionTemplate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One planned production line of a template
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TemplateLine {
    pub id: Uuid,
    pub template_id: Uuid,
    pub product_id: Uuid,
    pub recipe_id: Uuid,
    pub planned_quantity: Decimal,
    pub unit: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Pre-selected (ingredient, lot) pair for a template line
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TemplateLineIngredient {
    pub id: Uuid,
    pub line_id: Uuid,
    pub ingredient_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub planned_quantity: Decimal,
}

/// A template line with its pre-selections
#[derive(Debug, Clone, Serialize)]
pub struct TemplateLineWithIngredients {
    #[serde(flatten)]
    pub line: TemplateLine,
    pub ingredients: Vec<TemplateLineIngredient>,
}

/// A template with all its lines
#[derive(Debug, Clone, Serialize)]
pub struct TemplateWithLines {
    #[serde(flatten)]
    pub template: ProductionTemplate,
    pub lines: Vec<TemplateLineWithIngredients>,
}

/// Input pre-selection for a template line
#[derive(Debug, Deserialize)]
pub struct TemplateLineIngredientInput {
    pub ingredient_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub planned_quantity: Decimal,
}

/// Input line for creating or replacing template lines
#[derive(Debug, Deserialize)]
pub struct TemplateLineInput {
    pub product_id: Uuid,
    pub recipe_id: Uuid,
    pub planned_quantity: Decimal,
    pub unit: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<TemplateLineIngredientInput>,
}

/// Input for creating a template
#[derive(Debug, Deserialize)]
pub struct CreateTemplateInput {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub lines: Vec<TemplateLineInput>,
}

/// Input for updating a template; `lines`, when present, replaces all lines
#[derive(Debug, Deserialize)]
pub struct UpdateTemplateInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub lines: Option<Vec<TemplateLineInput>>,
}

/// One pre-flight validation finding
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub message: String,
    pub message_it: String,
}

/// Input for applying a template across a date range
#[derive(Debug, Deserialize)]
pub struct ApplyTemplateInput {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub skip_existing: bool,
}

/// Outcome of a template application
#[derive(Debug, Clone, Serialize)]
pub struct ApplyOutcome {
    pub created_count: u32,
    pub skipped_count: u32,
}

impl TemplateService {
    /// Create a new TemplateService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List templates, alphabetically
    pub async fn list(&self, user_id: Uuid) -> AppResult<Vec<ProductionTemplate>> {
        let templates = sqlx::query_as::<_, ProductionTemplate>(
            r#"
            SELECT id, user_id, name, description, created_at, updated_at
            FROM production_templates
            WHERE user_id = $1
            ORDER BY name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(templates)
    }

    /// Get a template with its lines and pre-selections
    pub async fn get_with_lines(
        &self,
        user_id: Uuid,
        template_id: Uuid,
    ) -> AppResult<TemplateWithLines> {
        let template = sqlx::query_as::<_, ProductionTemplate>(
            r#"
            SELECT id, user_id, name, description, created_at, updated_at
            FROM production_templates
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(template_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Template".to_string()))?;

        let lines = self.lines_with_ingredients(template_id).await?;

        Ok(TemplateWithLines { template, lines })
    }

    async fn lines_with_ingredients(
        &self,
        template_id: Uuid,
    ) -> AppResult<Vec<TemplateLineWithIngredients>> {
        let lines = sqlx::query_as::<_, TemplateLine>(
            r#"
            SELECT id, template_id, product_id, recipe_id, planned_quantity, unit,
                   notes, created_at
            FROM template_lines
            WHERE template_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(template_id)
        .fetch_all(&self.db)
        .await?;

        let mut out = Vec::with_capacity(lines.len());
        for line in lines {
            let ingredients = sqlx::query_as::<_, TemplateLineIngredient>(
                r#"
                SELECT id, line_id, ingredient_id, lot_id, planned_quantity
                FROM template_line_ingredients
                WHERE line_id = $1
                ORDER BY id
                "#,
            )
            .bind(line.id)
            .fetch_all(&self.db)
            .await?;

            out.push(TemplateLineWithIngredients { line, ingredients });
        }

        Ok(out)
    }

    /// Create a template with its lines
    pub async fn create(
        &self,
        user: &AuthUser,
        input: CreateTemplateInput,
    ) -> AppResult<TemplateWithLines> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Template name cannot be empty".to_string(),
                message_it: "Il nome del template non può essere vuoto".to_string(),
            });
        }
        Self::validate_line_inputs(&input.lines)?;

        let mut tx = self.db.begin().await?;

        let template_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO production_templates (user_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(user.user_id)
        .bind(input.name.trim())
        .bind(&input.description)
        .fetch_one(&mut *tx)
        .await?;

        Self::insert_lines(&mut tx, user.user_id, template_id, &input.lines).await?;

        tx.commit().await?;

        AuditService::new(self.db.clone())
            .record(
                user.user_id,
                AuditAction::Create,
                "production_templates",
                &template_id.to_string(),
                Some(serde_json::json!({
                    "name": input.name.trim(),
                    "line_count": input.lines.len(),
                })),
            )
            .await;

        self.get_with_lines(user.user_id, template_id).await
    }

    /// Update a template; lines, when given, are replaced in one transaction
    pub async fn update(
        &self,
        user: &AuthUser,
        template_id: Uuid,
        input: UpdateTemplateInput,
    ) -> AppResult<TemplateWithLines> {
        let existing = self.get_with_lines(user.user_id, template_id).await?;

        let name = input.name.unwrap_or(existing.template.name);
        if name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Template name cannot be empty".to_string(),
                message_it: "Il nome del template non può essere vuoto".to_string(),
            });
        }
        let description = input.description.or(existing.template.description);
        if let Some(ref lines) = input.lines {
            Self::validate_line_inputs(lines)?;
        }

        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            UPDATE production_templates
            SET name = $1, description = $2, updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(name.trim())
        .bind(&description)
        .bind(template_id)
        .execute(&mut *tx)
        .await?;

        if let Some(lines) = &input.lines {
            sqlx::query("DELETE FROM template_lines WHERE template_id = $1")
                .bind(template_id)
                .execute(&mut *tx)
                .await?;
            Self::insert_lines(&mut tx, user.user_id, template_id, lines).await?;
        }

        tx.commit().await?;

        AuditService::new(self.db.clone())
            .record(
                user.user_id,
                AuditAction::Update,
                "production_templates",
                &template_id.to_string(),
                None,
            )
            .await;

        self.get_with_lines(user.user_id, template_id).await
    }

    /// Delete a template; batches generated from it keep their reference
    pub async fn delete(&self, user: &AuthUser, template_id: Uuid) -> AppResult<()> {
        let result =
            sqlx::query("DELETE FROM production_templates WHERE id = $1 AND user_id = $2")
                .bind(template_id)
                .bind(user.user_id)
                .execute(&self.db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Template".to_string()));
        }

        AuditService::new(self.db.clone())
            .record(
                user.user_id,
                AuditAction::Delete,
                "production_templates",
                &template_id.to_string(),
                None,
            )
            .await;

        Ok(())
    }

    fn validate_line_inputs(lines: &[TemplateLineInput]) -> AppResult<()> {
        for line in lines {
            if let Err(msg) = validate_positive_quantity(line.planned_quantity) {
                return Err(AppError::Validation {
                    field: "lines.planned_quantity".to_string(),
                    message: msg.to_string(),
                    message_it: "Le quantità previste devono essere positive".to_string(),
                });
            }
            for ing in &line.ingredients {
                if let Err(msg) = validate_positive_quantity(ing.planned_quantity) {
                    return Err(AppError::Validation {
                        field: "lines.ingredients.planned_quantity".to_string(),
                        message: msg.to_string(),
                        message_it: "Le quantità previste devono essere positive".to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    async fn insert_lines(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: Uuid,
        template_id: Uuid,
        lines: &[TemplateLineInput],
    ) -> AppResult<()> {
        for line in lines {
            let line_id = sqlx::query_scalar::<_, Uuid>(
                r#"
                INSERT INTO template_lines
                    (user_id, template_id, product_id, recipe_id, planned_quantity, unit, notes)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING id
                "#,
            )
            .bind(user_id)
            .bind(template_id)
            .bind(line.product_id)
            .bind(line.recipe_id)
            .bind(line.planned_quantity)
            .bind(line.unit.trim())
            .bind(&line.notes)
            .fetch_one(&mut **tx)
            .await?;

            for ing in &line.ingredients {
                sqlx::query(
                    r#"
                    INSERT INTO template_line_ingredients
                        (user_id, line_id, ingredient_id, lot_id, planned_quantity)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(user_id)
                .bind(line_id)
                .bind(ing.ingredient_id)
                .bind(ing.lot_id)
                .bind(ing.planned_quantity)
                .execute(&mut **tx)
                .await?;
            }
        }
        Ok(())
    }

    /// Pre-flight validation of a template application.
    ///
    /// Errors mark lines that cannot produce a usable batch (missing recipe
    /// or ingredient); warnings flag pre-selected lots that vanished, expired
    /// or hold too little stock. All findings are advisory: the operator sees
    /// them before committing, nothing here blocks the application.
    pub async fn validate_application(
        &self,
        user_id: Uuid,
        template_id: Uuid,
    ) -> AppResult<Vec<ValidationIssue>> {
        let template = self.get_with_lines(user_id, template_id).await?;
        let today = Utc::now().date_naive();

        let mut issues = Vec::new();

        for line in &template.lines {
            let product_name = sqlx::query_scalar::<_, String>(
                "SELECT name FROM products WHERE id = $1",
            )
            .bind(line.line.product_id)
            .fetch_optional(&self.db)
            .await?
            .unwrap_or_else(|| "?".to_string());

            let recipe_exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM recipes WHERE id = $1)",
            )
            .bind(line.line.recipe_id)
            .fetch_one(&self.db)
            .await?;

            if !recipe_exists {
                issues.push(ValidationIssue {
                    severity: IssueSeverity::Error,
                    message: format!("Product {} has no valid recipe", product_name),
                    message_it: format!("Il prodotto {} non ha una ricetta valida", product_name),
                });
            }

            for ing in &line.ingredients {
                let ingredient_name = sqlx::query_scalar::<_, String>(
                    "SELECT name FROM ingredients WHERE id = $1",
                )
                .bind(ing.ingredient_id)
                .fetch_optional(&self.db)
                .await?;

                let ingredient_name = match ingredient_name {
                    Some(name) => name,
                    None => {
                        issues.push(ValidationIssue {
                            severity: IssueSeverity::Error,
                            message: format!(
                                "Unknown ingredient in template for {}",
                                product_name
                            ),
                            message_it: format!(
                                "Ingrediente sconosciuto nel template per {}",
                                product_name
                            ),
                        });
                        continue;
                    }
                };

                let Some(lot_id) = ing.lot_id else {
                    issues.push(ValidationIssue {
                        severity: IssueSeverity::Warning,
                        message: format!(
                            "No lot pre-selected for {} ({})",
                            ingredient_name, product_name
                        ),
                        message_it: format!(
                            "Nessun lotto pre-selezionato per {} ({})",
                            ingredient_name, product_name
                        ),
                    });
                    continue;
                };

                let lot = sqlx::query_as::<_, (String, Decimal, Option<NaiveDate>)>(
                    "SELECT lot_code, current_quantity, expiry_date FROM ingredient_lots WHERE id = $1",
                )
                .bind(lot_id)
                .fetch_optional(&self.db)
                .await?;

                match lot {
                    None => {
                        issues.push(ValidationIssue {
                            severity: IssueSeverity::Warning,
                            message: format!(
                                "The pre-selected lot for {} ({}) no longer exists",
                                ingredient_name, product_name
                            ),
                            message_it: format!(
                                "Il lotto pre-selezionato per {} ({}) non esiste più",
                                ingredient_name, product_name
                            ),
                        });
                    }
                    Some((lot_code, current_quantity, expiry_date)) => {
                        if expiry_date.map(|d| d < today).unwrap_or(false) {
                            issues.push(ValidationIssue {
                                severity: IssueSeverity::Warning,
                                message: format!(
                                    "Lot {} for {} is expired",
                                    lot_code, ingredient_name
                                ),
                                message_it: format!(
                                    "Il lotto {} per {} è scaduto",
                                    lot_code, ingredient_name
                                ),
                            });
                        }
                        if current_quantity < ing.planned_quantity {
                            issues.push(ValidationIssue {
                                severity: IssueSeverity::Warning,
                                message: format!(
                                    "Insufficient stock in lot {} of {}",
                                    lot_code, ingredient_name
                                ),
                                message_it: format!(
                                    "Scorte insufficienti per il lotto {} di {}",
                                    lot_code, ingredient_name
                                ),
                            });
                        }
                    }
                }
            }
        }

        Ok(issues)
    }

    /// Apply a template across an inclusive date range.
    ///
    /// Idempotency key is (template, calendar day): with `skip_existing`, a
    /// day that already has a batch generated from this template is counted
    /// as skipped and left untouched. Each created batch counts once.
    pub async fn apply(
        &self,
        user: &AuthUser,
        template_id: Uuid,
        input: ApplyTemplateInput,
    ) -> AppResult<ApplyOutcome> {
        if let Err(msg) = validate_date_range(input.start_date, input.end_date) {
            return Err(AppError::Validation {
                field: "end_date".to_string(),
                message: msg.to_string(),
                message_it: "La data di inizio non può essere successiva alla data di fine"
                    .to_string(),
            });
        }

        let template = self.get_with_lines(user.user_id, template_id).await?;
        let production = ProductionService::new(self.db.clone());

        let mut created_count: u32 = 0;
        let mut skipped_count: u32 = 0;

        let mut day = input.start_date;
        while day <= input.end_date {
            if input.skip_existing && self.batch_exists_for_day(user.user_id, template_id, day).await? {
                skipped_count += 1;
                day = next_day(day)?;
                continue;
            }

            for line in &template.lines {
                // A line whose recipe vanished was flagged during validation;
                // it produces nothing here
                let recipe_exists = sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(SELECT 1 FROM recipes WHERE id = $1 AND user_id = $2)",
                )
                .bind(line.line.recipe_id)
                .bind(user.user_id)
                .fetch_one(&self.db)
                .await?;

                if !recipe_exists {
                    continue;
                }

                let lot_selections: HashMap<Uuid, Uuid> = line
                    .ingredients
                    .iter()
                    .filter_map(|i| i.lot_id.map(|lot| (i.ingredient_id, lot)))
                    .collect();

                // Batches generated from a template land at a standard time
                let produced_at = at_hour(day, 8)?;

                production
                    .run_batch(
                        user,
                        BatchRequest {
                            product_id: line.line.product_id,
                            recipe_id: Some(line.line.recipe_id),
                            produced_quantity: line.line.planned_quantity,
                            produced_at,
                            lot_selections,
                            source_template_id: Some(template_id),
                            notes: Some(format!("Generato dal template {}", template.template.name)),
                            require_lot_selection: false,
                        },
                    )
                    .await?;

                created_count += 1;
            }

            day = next_day(day)?;
        }

        AuditService::new(self.db.clone())
            .record(
                user.user_id,
                AuditAction::ApplyTemplate,
                "production_templates",
                &template_id.to_string(),
                Some(serde_json::json!({
                    "start_date": input.start_date,
                    "end_date": input.end_date,
                    "created_count": created_count,
                    "skipped_count": skipped_count,
                })),
            )
            .await;

        Ok(ApplyOutcome {
            created_count,
            skipped_count,
        })
    }

    /// Whether a batch generated from this template already exists within the
    /// given calendar day
    async fn batch_exists_for_day(
        &self,
        user_id: Uuid,
        template_id: Uuid,
        day: NaiveDate,
    ) -> AppResult<bool> {
        let day_start = at_hour(day, 0)?;
        let day_end = at_hour(next_day(day)?, 0)?;

        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM production_batches
                WHERE user_id = $1
                  AND source_template_id = $2
                  AND produced_at >= $3
                  AND produced_at < $4
            )
            "#,
        )
        .bind(user_id)
        .bind(template_id)
        .bind(day_start)
        .bind(day_end)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }
}

fn next_day(day: NaiveDate) -> AppResult<NaiveDate> {
    day.succ_opt()
        .ok_or_else(|| AppError::Internal("Date overflow".to_string()))
}

fn at_hour(day: NaiveDate, hour: u32) -> AppResult<DateTime<Utc>> {
    day.and_hms_opt(hour, 0, 0)
        .map(|t| t.and_utc())
        .ok_or_else(|| AppError::Internal("Invalid time of day".to_string()))
}
