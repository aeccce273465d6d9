//! Ingredient catalog service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::AuditService;
use shared::{AuditAction, StorageMode};

/// Ingredient catalog service
#[derive(Clone)]
pub struct IngredientService {
    db: PgPool,
}

/// An ingredient in the catalog
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Ingredient {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub default_supplier: Option<String>,
    pub unit: String,
    pub storage_mode: String,
    pub allergens: Vec<String>,
    pub min_stock_threshold: Option<Decimal>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an ingredient
#[derive(Debug, Deserialize)]
pub struct CreateIngredientInput {
    pub name: String,
    pub category: Option<String>,
    pub default_supplier: Option<String>,
    pub unit: String,
    pub storage_mode: Option<StorageMode>,
    pub allergens: Option<Vec<String>>,
    pub min_stock_threshold: Option<Decimal>,
    pub notes: Option<String>,
}

/// Input for updating an ingredient
#[derive(Debug, Deserialize)]
pub struct UpdateIngredientInput {
    pub name: Option<String>,
    pub category: Option<String>,
    pub default_supplier: Option<String>,
    pub unit: Option<String>,
    pub storage_mode: Option<StorageMode>,
    pub allergens: Option<Vec<String>>,
    pub min_stock_threshold: Option<Decimal>,
    pub notes: Option<String>,
}

const INGREDIENT_COLUMNS: &str = "id, user_id, name, category, default_supplier, unit, \
     storage_mode, allergens, min_stock_threshold, notes, created_at, updated_at";

impl IngredientService {
    /// Create a new IngredientService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List all ingredients for the account, alphabetically
    pub async fn list(&self, user_id: Uuid) -> AppResult<Vec<Ingredient>> {
        let ingredients = sqlx::query_as::<_, Ingredient>(&format!(
            "SELECT {} FROM ingredients WHERE user_id = $1 ORDER BY name ASC",
            INGREDIENT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(ingredients)
    }

    /// Get one ingredient
    pub async fn get(&self, user_id: Uuid, ingredient_id: Uuid) -> AppResult<Ingredient> {
        sqlx::query_as::<_, Ingredient>(&format!(
            "SELECT {} FROM ingredients WHERE id = $1 AND user_id = $2",
            INGREDIENT_COLUMNS
        ))
        .bind(ingredient_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))
    }

    /// Create an ingredient
    pub async fn create(
        &self,
        user: &AuthUser,
        input: CreateIngredientInput,
    ) -> AppResult<Ingredient> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Ingredient name cannot be empty".to_string(),
                message_it: "Il nome dell'ingrediente non può essere vuoto".to_string(),
            });
        }
        if input.unit.trim().is_empty() {
            return Err(AppError::Validation {
                field: "unit".to_string(),
                message: "Unit of measure cannot be empty".to_string(),
                message_it: "L'unità di misura non può essere vuota".to_string(),
            });
        }

        let storage_mode = input.storage_mode.unwrap_or_default();
        let allergens = input.allergens.unwrap_or_default();

        let ingredient = sqlx::query_as::<_, Ingredient>(&format!(
            r#"
            INSERT INTO ingredients
                (user_id, name, category, default_supplier, unit, storage_mode,
                 allergens, min_stock_threshold, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            INGREDIENT_COLUMNS
        ))
        .bind(user.user_id)
        .bind(input.name.trim())
        .bind(&input.category)
        .bind(&input.default_supplier)
        .bind(input.unit.trim())
        .bind(storage_mode.as_str())
        .bind(&allergens)
        .bind(input.min_stock_threshold)
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await?;

        AuditService::new(self.db.clone())
            .record(
                user.user_id,
                AuditAction::Create,
                "ingredients",
                &ingredient.id.to_string(),
                Some(serde_json::json!({ "name": ingredient.name })),
            )
            .await;

        Ok(ingredient)
    }

    /// Update an ingredient
    pub async fn update(
        &self,
        user: &AuthUser,
        ingredient_id: Uuid,
        input: UpdateIngredientInput,
    ) -> AppResult<Ingredient> {
        let existing = self.get(user.user_id, ingredient_id).await?;

        let name = input.name.unwrap_or(existing.name);
        if name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Ingredient name cannot be empty".to_string(),
                message_it: "Il nome dell'ingrediente non può essere vuoto".to_string(),
            });
        }
        let category = input.category.or(existing.category);
        let default_supplier = input.default_supplier.or(existing.default_supplier);
        let unit = input.unit.unwrap_or(existing.unit);
        let storage_mode = input
            .storage_mode
            .map(|m| m.as_str().to_string())
            .unwrap_or(existing.storage_mode);
        let allergens = input.allergens.unwrap_or(existing.allergens);
        let min_stock_threshold = input.min_stock_threshold.or(existing.min_stock_threshold);
        let notes = input.notes.or(existing.notes);

        let ingredient = sqlx::query_as::<_, Ingredient>(&format!(
            r#"
            UPDATE ingredients
            SET name = $1, category = $2, default_supplier = $3, unit = $4,
                storage_mode = $5, allergens = $6, min_stock_threshold = $7,
                notes = $8, updated_at = NOW()
            WHERE id = $9
            RETURNING {}
            "#,
            INGREDIENT_COLUMNS
        ))
        .bind(name.trim())
        .bind(&category)
        .bind(&default_supplier)
        .bind(&unit)
        .bind(&storage_mode)
        .bind(&allergens)
        .bind(min_stock_threshold)
        .bind(&notes)
        .bind(ingredient_id)
        .fetch_one(&self.db)
        .await?;

        AuditService::new(self.db.clone())
            .record(
                user.user_id,
                AuditAction::Update,
                "ingredients",
                &ingredient.id.to_string(),
                Some(serde_json::json!({ "name": ingredient.name })),
            )
            .await;

        Ok(ingredient)
    }

    /// Delete an ingredient that is not referenced anywhere
    pub async fn delete(&self, user: &AuthUser, ingredient_id: Uuid) -> AppResult<()> {
        // Refuse deletion once the ingredient appears in recipes, lots or history
        let referenced = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM recipe_ingredients WHERE ingredient_id = $1)
                OR EXISTS(SELECT 1 FROM ingredient_lots WHERE ingredient_id = $1)
                OR EXISTS(SELECT 1 FROM price_records WHERE ingredient_id = $1)
            "#,
        )
        .bind(ingredient_id)
        .fetch_one(&self.db)
        .await?;

        if referenced {
            return Err(AppError::Conflict {
                resource: "ingredient".to_string(),
                message: "Ingredient is referenced by recipes, lots or price history".to_string(),
                message_it: "L'ingrediente è utilizzato da ricette, lotti o storico prezzi"
                    .to_string(),
            });
        }

        let result = sqlx::query("DELETE FROM ingredients WHERE id = $1 AND user_id = $2")
            .bind(ingredient_id)
            .bind(user.user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Ingredient".to_string()));
        }

        AuditService::new(self.db.clone())
            .record(
                user.user_id,
                AuditAction::Delete,
                "ingredients",
                &ingredient_id.to_string(),
                None,
            )
            .await;

        Ok(())
    }
}
