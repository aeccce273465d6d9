//! Finished-product catalog service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::AuditService;
use shared::AuditAction;

/// Product catalog service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// A finished product (a gelato flavour, a sorbet, a semifreddo)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub product_type: Option<String>,
    pub sales_unit: String,
    pub sales_price: Option<Decimal>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub name: String,
    pub product_type: Option<String>,
    pub sales_unit: String,
    pub sales_price: Option<Decimal>,
    pub notes: Option<String>,
}

/// Input for updating a product
#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub product_type: Option<String>,
    pub sales_unit: Option<String>,
    pub sales_price: Option<Decimal>,
    pub notes: Option<String>,
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List all products for the account, alphabetically
    pub async fn list(&self, user_id: Uuid) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, user_id, name, product_type, sales_unit, sales_price, notes,
                   created_at, updated_at
            FROM products
            WHERE user_id = $1
            ORDER BY name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(products)
    }

    /// Get one product
    pub async fn get(&self, user_id: Uuid, product_id: Uuid) -> AppResult<Product> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT id, user_id, name, product_type, sales_unit, sales_price, notes,
                   created_at, updated_at
            FROM products
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(product_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Create a product
    pub async fn create(&self, user: &AuthUser, input: CreateProductInput) -> AppResult<Product> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Product name cannot be empty".to_string(),
                message_it: "Il nome del prodotto non può essere vuoto".to_string(),
            });
        }
        if input.sales_unit.trim().is_empty() {
            return Err(AppError::Validation {
                field: "sales_unit".to_string(),
                message: "Sales unit cannot be empty".to_string(),
                message_it: "L'unità di vendita non può essere vuota".to_string(),
            });
        }

        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (user_id, name, product_type, sales_unit, sales_price, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, name, product_type, sales_unit, sales_price, notes,
                      created_at, updated_at
            "#,
        )
        .bind(user.user_id)
        .bind(input.name.trim())
        .bind(&input.product_type)
        .bind(input.sales_unit.trim())
        .bind(input.sales_price)
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await?;

        AuditService::new(self.db.clone())
            .record(
                user.user_id,
                AuditAction::Create,
                "products",
                &product.id.to_string(),
                Some(serde_json::json!({ "name": product.name })),
            )
            .await;

        Ok(product)
    }

    /// Update a product
    pub async fn update(
        &self,
        user: &AuthUser,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<Product> {
        let existing = self.get(user.user_id, product_id).await?;

        let name = input.name.unwrap_or(existing.name);
        let product_type = input.product_type.or(existing.product_type);
        let sales_unit = input.sales_unit.unwrap_or(existing.sales_unit);
        let sales_price = input.sales_price.or(existing.sales_price);
        let notes = input.notes.or(existing.notes);

        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET name = $1, product_type = $2, sales_unit = $3, sales_price = $4,
                notes = $5, updated_at = NOW()
            WHERE id = $6
            RETURNING id, user_id, name, product_type, sales_unit, sales_price, notes,
                      created_at, updated_at
            "#,
        )
        .bind(name.trim())
        .bind(&product_type)
        .bind(&sales_unit)
        .bind(sales_price)
        .bind(&notes)
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;

        AuditService::new(self.db.clone())
            .record(
                user.user_id,
                AuditAction::Update,
                "products",
                &product.id.to_string(),
                Some(serde_json::json!({ "name": product.name })),
            )
            .await;

        Ok(product)
    }

    /// Delete a product that has no recipes or production history
    pub async fn delete(&self, user: &AuthUser, product_id: Uuid) -> AppResult<()> {
        let referenced = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM recipes WHERE product_id = $1)
                OR EXISTS(SELECT 1 FROM production_batches WHERE product_id = $1)
            "#,
        )
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;

        if referenced {
            return Err(AppError::Conflict {
                resource: "product".to_string(),
                message: "Product has recipes or production history".to_string(),
                message_it: "Il prodotto ha ricette o produzioni registrate".to_string(),
            });
        }

        let result = sqlx::query("DELETE FROM products WHERE id = $1 AND user_id = $2")
            .bind(product_id)
            .bind(user.user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }

        AuditService::new(self.db.clone())
            .record(
                user.user_id,
                AuditAction::Delete,
                "products",
                &product_id.to_string(),
                None,
            )
            .await;

        Ok(())
    }
}
