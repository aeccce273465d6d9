//! Recipe service
//!
//! A recipe links a product to its ingredient lines, expressed against a
//! nominal batch yield. Line updates are a diff reconciliation inside one
//! transaction (upsert by ingredient, delete the rest) so concurrent readers
//! never observe a transient empty line set.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::AuditService;
use shared::validation::{validate_batch_yield, validate_positive_quantity};
use shared::AuditAction;

/// Recipe service
#[derive(Clone)]
pub struct RecipeService {
    db: PgPool,
}

/// A recipe header
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub batch_yield: Decimal,
    pub yield_unit: String,
    pub overhead_percent: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One ingredient line of a recipe
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecipeIngredient {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    pub quantity: Decimal,
    pub unit: String,
}

/// A recipe with its ingredient lines
#[derive(Debug, Clone, Serialize)]
pub struct RecipeWithLines {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub ingredients: Vec<RecipeIngredient>,
}

/// Input line when creating or updating a recipe
#[derive(Debug, Deserialize)]
pub struct RecipeLineInput {
    pub ingredient_id: Uuid,
    pub quantity: Decimal,
    pub unit: String,
}

/// Input for creating a recipe
#[derive(Debug, Deserialize)]
pub struct CreateRecipeInput {
    pub product_id: Uuid,
    pub batch_yield: Decimal,
    pub yield_unit: String,
    pub overhead_percent: Option<Decimal>,
    pub notes: Option<String>,
    pub ingredients: Vec<RecipeLineInput>,
}

/// Input for updating a recipe; `ingredients`, when present, replaces the
/// whole line set via reconciliation
#[derive(Debug, Deserialize)]
pub struct UpdateRecipeInput {
    pub batch_yield: Option<Decimal>,
    pub yield_unit: Option<String>,
    pub overhead_percent: Option<Decimal>,
    pub notes: Option<String>,
    pub ingredients: Option<Vec<RecipeLineInput>>,
}

impl RecipeService {
    /// Create a new RecipeService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    fn validate_lines(lines: &[RecipeLineInput]) -> AppResult<()> {
        for line in lines {
            if let Err(msg) = validate_positive_quantity(line.quantity) {
                return Err(AppError::Validation {
                    field: "ingredients.quantity".to_string(),
                    message: msg.to_string(),
                    message_it: "Le quantità degli ingredienti devono essere positive".to_string(),
                });
            }
        }
        Ok(())
    }

    /// List all recipes for the account
    pub async fn list(&self, user_id: Uuid) -> AppResult<Vec<Recipe>> {
        let recipes = sqlx::query_as::<_, Recipe>(
            r#"
            SELECT id, user_id, product_id, batch_yield, yield_unit, overhead_percent,
                   notes, created_at, updated_at
            FROM recipes
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(recipes)
    }

    /// Get a recipe with its ingredient lines
    pub async fn get_with_lines(&self, user_id: Uuid, recipe_id: Uuid) -> AppResult<RecipeWithLines> {
        let recipe = sqlx::query_as::<_, Recipe>(
            r#"
            SELECT id, user_id, product_id, batch_yield, yield_unit, overhead_percent,
                   notes, created_at, updated_at
            FROM recipes
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(recipe_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe".to_string()))?;

        let ingredients = self.lines(recipe_id).await?;

        Ok(RecipeWithLines { recipe, ingredients })
    }

    /// The recipe for a product, if one exists
    pub async fn find_for_product(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<Option<Recipe>> {
        let recipe = sqlx::query_as::<_, Recipe>(
            r#"
            SELECT id, user_id, product_id, batch_yield, yield_unit, overhead_percent,
                   notes, created_at, updated_at
            FROM recipes
            WHERE product_id = $1 AND user_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(product_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(recipe)
    }

    /// Ingredient lines of a recipe
    pub async fn lines(&self, recipe_id: Uuid) -> AppResult<Vec<RecipeIngredient>> {
        let lines = sqlx::query_as::<_, RecipeIngredient>(
            r#"
            SELECT id, recipe_id, ingredient_id, quantity, unit
            FROM recipe_ingredients
            WHERE recipe_id = $1
            ORDER BY id
            "#,
        )
        .bind(recipe_id)
        .fetch_all(&self.db)
        .await?;

        Ok(lines)
    }

    /// Create a recipe with its ingredient lines
    pub async fn create(
        &self,
        user: &AuthUser,
        input: CreateRecipeInput,
    ) -> AppResult<RecipeWithLines> {
        if let Err(msg) = validate_batch_yield(input.batch_yield) {
            return Err(AppError::Validation {
                field: "batch_yield".to_string(),
                message: msg.to_string(),
                message_it: "La resa del batch deve essere positiva".to_string(),
            });
        }
        Self::validate_lines(&input.ingredients)?;

        // Validate product belongs to the account
        let product_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1 AND user_id = $2)",
        )
        .bind(input.product_id)
        .bind(user.user_id)
        .fetch_one(&self.db)
        .await?;

        if !product_exists {
            return Err(AppError::NotFound("Product".to_string()));
        }

        let overhead = input.overhead_percent.unwrap_or(Decimal::ZERO);

        let mut tx = self.db.begin().await?;

        let recipe_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO recipes (user_id, product_id, batch_yield, yield_unit, overhead_percent, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(user.user_id)
        .bind(input.product_id)
        .bind(input.batch_yield)
        .bind(input.yield_unit.trim())
        .bind(overhead)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        for line in &input.ingredients {
            sqlx::query(
                r#"
                INSERT INTO recipe_ingredients (user_id, recipe_id, ingredient_id, quantity, unit)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(user.user_id)
            .bind(recipe_id)
            .bind(line.ingredient_id)
            .bind(line.quantity)
            .bind(line.unit.trim())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        AuditService::new(self.db.clone())
            .record(
                user.user_id,
                AuditAction::Create,
                "recipes",
                &recipe_id.to_string(),
                Some(serde_json::json!({
                    "product_id": input.product_id,
                    "line_count": input.ingredients.len(),
                })),
            )
            .await;

        self.get_with_lines(user.user_id, recipe_id).await
    }

    /// Update a recipe; when lines are given they are reconciled in one
    /// transaction: upsert by ingredient, delete lines no longer present.
    pub async fn update(
        &self,
        user: &AuthUser,
        recipe_id: Uuid,
        input: UpdateRecipeInput,
    ) -> AppResult<RecipeWithLines> {
        let existing = self.get_with_lines(user.user_id, recipe_id).await?;

        let batch_yield = input.batch_yield.unwrap_or(existing.recipe.batch_yield);
        if let Err(msg) = validate_batch_yield(batch_yield) {
            return Err(AppError::Validation {
                field: "batch_yield".to_string(),
                message: msg.to_string(),
                message_it: "La resa del batch deve essere positiva".to_string(),
            });
        }
        if let Some(ref lines) = input.ingredients {
            Self::validate_lines(lines)?;
        }

        let yield_unit = input.yield_unit.unwrap_or(existing.recipe.yield_unit);
        let overhead = input
            .overhead_percent
            .unwrap_or(existing.recipe.overhead_percent);
        let notes = input.notes.or(existing.recipe.notes);

        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            UPDATE recipes
            SET batch_yield = $1, yield_unit = $2, overhead_percent = $3, notes = $4,
                updated_at = NOW()
            WHERE id = $5
            "#,
        )
        .bind(batch_yield)
        .bind(&yield_unit)
        .bind(overhead)
        .bind(&notes)
        .bind(recipe_id)
        .execute(&mut *tx)
        .await?;

        if let Some(lines) = &input.ingredients {
            // Upsert incoming lines by ingredient
            for line in lines {
                sqlx::query(
                    r#"
                    INSERT INTO recipe_ingredients (user_id, recipe_id, ingredient_id, quantity, unit)
                    VALUES ($1, $2, $3, $4, $5)
                    ON CONFLICT (recipe_id, ingredient_id)
                    DO UPDATE SET quantity = EXCLUDED.quantity, unit = EXCLUDED.unit
                    "#,
                )
                .bind(user.user_id)
                .bind(recipe_id)
                .bind(line.ingredient_id)
                .bind(line.quantity)
                .bind(line.unit.trim())
                .execute(&mut *tx)
                .await?;
            }

            // Delete lines whose ingredient is no longer in the set
            let keep: Vec<Uuid> = lines.iter().map(|l| l.ingredient_id).collect();
            sqlx::query(
                "DELETE FROM recipe_ingredients WHERE recipe_id = $1 AND ingredient_id <> ALL($2)",
            )
            .bind(recipe_id)
            .bind(&keep)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        AuditService::new(self.db.clone())
            .record(
                user.user_id,
                AuditAction::Update,
                "recipes",
                &recipe_id.to_string(),
                Some(serde_json::json!({
                    "line_count": input.ingredients.as_ref().map(|l| l.len()),
                })),
            )
            .await;

        self.get_with_lines(user.user_id, recipe_id).await
    }

    /// Delete a recipe with no production history
    pub async fn delete(&self, user: &AuthUser, recipe_id: Uuid) -> AppResult<()> {
        let referenced = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM production_batches WHERE recipe_id = $1)",
        )
        .bind(recipe_id)
        .fetch_one(&self.db)
        .await?;

        if referenced {
            return Err(AppError::Conflict {
                resource: "recipe".to_string(),
                message: "Recipe has production history".to_string(),
                message_it: "La ricetta ha produzioni registrate".to_string(),
            });
        }

        let result = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
            .bind(recipe_id)
            .bind(user.user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Recipe".to_string()));
        }

        AuditService::new(self.db.clone())
            .record(
                user.user_id,
                AuditAction::Delete,
                "recipes",
                &recipe_id.to_string(),
                None,
            )
            .await;

        Ok(())
    }
}
