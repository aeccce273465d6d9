//! Warehouse service: ingredient lots, movement ledger, lot allocation
//!
//! `current_quantity` on a lot is the one piece of mutable shared state with a
//! real invariant (never negative, never above the initial quantity). Every
//! write to it goes through this service and is paired with exactly one
//! inventory movement in the same database transaction.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::AuditService;
use shared::validation::{validate_lot_code, validate_positive_quantity};
use shared::{AuditAction, MovementDirection, StorageMode};

/// Warehouse service for lot tracking and inventory movements
#[derive(Clone)]
pub struct WarehouseService {
    db: PgPool,
}

/// A delivered lot of one ingredient
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct IngredientLot {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ingredient_id: Uuid,
    pub lot_code: String,
    pub supplier: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub initial_quantity: Decimal,
    pub current_quantity: Decimal,
    pub unit: String,
    pub storage_mode: String,
    pub label_photo_url: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IngredientLot {
    /// Whether the lot is past its expiry date
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date.map(|d| d < today).unwrap_or(false)
    }
}

/// One entry in the append-only movement ledger
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InventoryMovement {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ingredient_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub direction: String,
    pub quantity: Decimal,
    pub unit: String,
    pub reason: Option<String>,
    pub moved_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Pre-flight check result for drawing a quantity from a lot.
///
/// Expiry and insufficiency are warnings here; only a committed deduction
/// turns insufficiency into a hard stop.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LotValidation {
    pub sufficient: bool,
    pub expired: bool,
}

/// Input for registering a delivered lot
#[derive(Debug, Deserialize)]
pub struct CreateLotInput {
    pub ingredient_id: Uuid,
    pub lot_code: String,
    pub supplier: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub initial_quantity: Decimal,
    pub unit: String,
    pub storage_mode: Option<StorageMode>,
    pub label_photo_url: Option<String>,
    pub notes: Option<String>,
}

/// Input for updating lot metadata (never the quantity)
#[derive(Debug, Deserialize)]
pub struct UpdateLotInput {
    pub lot_code: Option<String>,
    pub supplier: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub label_photo_url: Option<String>,
    pub notes: Option<String>,
}

/// On-hand stock of one ingredient, from the movement ledger
#[derive(Debug, Clone, Serialize)]
pub struct StockLevel {
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub unit: String,
    pub on_hand: Decimal,
    pub min_stock_threshold: Option<Decimal>,
    pub below_threshold: bool,
}

/// Row for the stock level query
#[derive(Debug, FromRow)]
struct StockRow {
    ingredient_id: Uuid,
    ingredient_name: String,
    unit: String,
    total_in: Decimal,
    total_out: Decimal,
    min_stock_threshold: Option<Decimal>,
}

const LOT_COLUMNS: &str = "id, user_id, ingredient_id, lot_code, supplier, delivery_date, \
     expiry_date, initial_quantity, current_quantity, unit, storage_mode, \
     label_photo_url, notes, created_at, updated_at";

impl WarehouseService {
    /// Create a new WarehouseService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Register a delivered lot and its paired inbound movement
    pub async fn create_lot(
        &self,
        user: &AuthUser,
        input: CreateLotInput,
    ) -> AppResult<IngredientLot> {
        if let Err(msg) = validate_lot_code(&input.lot_code) {
            return Err(AppError::Validation {
                field: "lot_code".to_string(),
                message: msg.to_string(),
                message_it: "Codice lotto non valido".to_string(),
            });
        }
        if let Err(msg) = validate_positive_quantity(input.initial_quantity) {
            return Err(AppError::Validation {
                field: "initial_quantity".to_string(),
                message: msg.to_string(),
                message_it: "La quantità deve essere positiva".to_string(),
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

        let storage_mode = input.storage_mode.unwrap_or_default();

        // Lot row and its inbound movement commit together
        let mut tx = self.db.begin().await?;

        let lot = sqlx::query_as::<_, IngredientLot>(&format!(
            r#"
            INSERT INTO ingredient_lots
                (user_id, ingredient_id, lot_code, supplier, delivery_date, expiry_date,
                 initial_quantity, current_quantity, unit, storage_mode, label_photo_url, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            LOT_COLUMNS
        ))
        .bind(user.user_id)
        .bind(input.ingredient_id)
        .bind(input.lot_code.trim())
        .bind(&input.supplier)
        .bind(input.delivery_date)
        .bind(input.expiry_date)
        .bind(input.initial_quantity)
        .bind(input.unit.trim())
        .bind(storage_mode.as_str())
        .bind(&input.label_photo_url)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO inventory_movements
                (user_id, ingredient_id, lot_id, direction, quantity, unit, reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.user_id)
        .bind(input.ingredient_id)
        .bind(lot.id)
        .bind(MovementDirection::Inbound.as_str())
        .bind(input.initial_quantity)
        .bind(&lot.unit)
        .bind(format!("Carico lotto {}", lot.lot_code))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        AuditService::new(self.db.clone())
            .record(
                user.user_id,
                AuditAction::Create,
                "ingredient_lots",
                &lot.id.to_string(),
                Some(serde_json::json!({
                    "lot_code": lot.lot_code,
                    "ingredient_id": lot.ingredient_id,
                    "initial_quantity": lot.initial_quantity,
                })),
            )
            .await;

        Ok(lot)
    }

    /// List all lots for the account
    pub async fn list_lots(&self, user_id: Uuid) -> AppResult<Vec<IngredientLot>> {
        let lots = sqlx::query_as::<_, IngredientLot>(&format!(
            "SELECT {} FROM ingredient_lots WHERE user_id = $1 ORDER BY created_at DESC",
            LOT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(lots)
    }

    /// Get one lot
    pub async fn get_lot(&self, user_id: Uuid, lot_id: Uuid) -> AppResult<IngredientLot> {
        sqlx::query_as::<_, IngredientLot>(&format!(
            "SELECT {} FROM ingredient_lots WHERE id = $1 AND user_id = $2",
            LOT_COLUMNS
        ))
        .bind(lot_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Lot".to_string()))
    }

    /// Lots of an ingredient with stock remaining, earliest expiry first (FEFO).
    ///
    /// This is surfaced to the operator as a choice; nothing here auto-picks a
    /// lot on behalf of the manual flow.
    pub async fn available_lots(
        &self,
        user_id: Uuid,
        ingredient_id: Uuid,
    ) -> AppResult<Vec<IngredientLot>> {
        let lots = sqlx::query_as::<_, IngredientLot>(&format!(
            r#"
            SELECT {}
            FROM ingredient_lots
            WHERE ingredient_id = $1 AND user_id = $2 AND current_quantity > 0
            ORDER BY expiry_date ASC NULLS LAST, created_at ASC
            "#,
            LOT_COLUMNS
        ))
        .bind(ingredient_id)
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(lots)
    }

    /// Update lot metadata. Quantities are out of bounds here: deliveries
    /// create new lots, consumption goes through `deduct`.
    pub async fn update_lot(
        &self,
        user: &AuthUser,
        lot_id: Uuid,
        input: UpdateLotInput,
    ) -> AppResult<IngredientLot> {
        let existing = self.get_lot(user.user_id, lot_id).await?;

        let lot_code = input.lot_code.unwrap_or(existing.lot_code);
        if let Err(msg) = validate_lot_code(&lot_code) {
            return Err(AppError::Validation {
                field: "lot_code".to_string(),
                message: msg.to_string(),
                message_it: "Codice lotto non valido".to_string(),
            });
        }
        let supplier = input.supplier.or(existing.supplier);
        let delivery_date = input.delivery_date.or(existing.delivery_date);
        let expiry_date = input.expiry_date.or(existing.expiry_date);
        let label_photo_url = input.label_photo_url.or(existing.label_photo_url);
        let notes = input.notes.or(existing.notes);

        let lot = sqlx::query_as::<_, IngredientLot>(&format!(
            r#"
            UPDATE ingredient_lots
            SET lot_code = $1, supplier = $2, delivery_date = $3, expiry_date = $4,
                label_photo_url = $5, notes = $6, updated_at = NOW()
            WHERE id = $7
            RETURNING {}
            "#,
            LOT_COLUMNS
        ))
        .bind(lot_code.trim())
        .bind(&supplier)
        .bind(delivery_date)
        .bind(expiry_date)
        .bind(&label_photo_url)
        .bind(&notes)
        .bind(lot_id)
        .fetch_one(&self.db)
        .await?;

        AuditService::new(self.db.clone())
            .record(
                user.user_id,
                AuditAction::Update,
                "ingredient_lots",
                &lot.id.to_string(),
                Some(serde_json::json!({ "lot_code": lot.lot_code })),
            )
            .await;

        Ok(lot)
    }

    /// Pre-flight validation: can `required_quantity` be drawn from this lot?
    pub async fn validate_lot(
        &self,
        user_id: Uuid,
        lot_id: Uuid,
        required_quantity: Decimal,
    ) -> AppResult<LotValidation> {
        let lot = self.get_lot(user_id, lot_id).await?;
        let today = Utc::now().date_naive();

        Ok(LotValidation {
            sufficient: lot.current_quantity >= required_quantity,
            expired: lot.is_expired(today),
        })
    }

    /// Draw a quantity from a lot, writing the paired outbound movement.
    ///
    /// The decrement is a conditional update: the row is only touched when it
    /// still holds enough stock, so concurrent deductions cannot drive the
    /// quantity negative — the loser sees `InsufficientStock`.
    pub async fn deduct(
        &self,
        user: &AuthUser,
        lot_id: Uuid,
        quantity: Decimal,
        reason: &str,
    ) -> AppResult<IngredientLot> {
        if let Err(msg) = validate_positive_quantity(quantity) {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: msg.to_string(),
                message_it: "La quantità deve essere positiva".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        let updated = sqlx::query_as::<_, IngredientLot>(&format!(
            r#"
            UPDATE ingredient_lots
            SET current_quantity = current_quantity - $1, updated_at = NOW()
            WHERE id = $2 AND user_id = $3 AND current_quantity >= $1
            RETURNING {}
            "#,
            LOT_COLUMNS
        ))
        .bind(quantity)
        .bind(lot_id)
        .bind(user.user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let lot = match updated {
            Some(lot) => lot,
            None => {
                tx.rollback().await?;
                // Distinguish a missing lot from an over-draw
                let existing = self.get_lot(user.user_id, lot_id).await?;
                return Err(AppError::InsufficientStock(format!(
                    "Lot {} holds {} {}, requested {}",
                    existing.lot_code, existing.current_quantity, existing.unit, quantity
                )));
            }
        };

        sqlx::query(
            r#"
            INSERT INTO inventory_movements
                (user_id, ingredient_id, lot_id, direction, quantity, unit, reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.user_id)
        .bind(lot.ingredient_id)
        .bind(lot.id)
        .bind(MovementDirection::Outbound.as_str())
        .bind(quantity)
        .bind(&lot.unit)
        .bind(reason)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(lot)
    }

    /// Movement ledger for the account, newest first
    pub async fn list_movements(&self, user_id: Uuid) -> AppResult<Vec<InventoryMovement>> {
        let movements = sqlx::query_as::<_, InventoryMovement>(
            r#"
            SELECT id, user_id, ingredient_id, lot_id, direction, quantity, unit,
                   reason, moved_at, created_at
            FROM inventory_movements
            WHERE user_id = $1
            ORDER BY moved_at DESC, created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(movements)
    }

    /// Movements touching one lot, newest first
    pub async fn lot_movements(
        &self,
        user_id: Uuid,
        lot_id: Uuid,
    ) -> AppResult<Vec<InventoryMovement>> {
        let movements = sqlx::query_as::<_, InventoryMovement>(
            r#"
            SELECT id, user_id, ingredient_id, lot_id, direction, quantity, unit,
                   reason, moved_at, created_at
            FROM inventory_movements
            WHERE lot_id = $1 AND user_id = $2
            ORDER BY moved_at DESC, created_at DESC
            "#,
        )
        .bind(lot_id)
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(movements)
    }

    /// On-hand stock per ingredient: signed sum of the movement ledger
    pub async fn stock_levels(&self, user_id: Uuid) -> AppResult<Vec<StockLevel>> {
        let rows = sqlx::query_as::<_, StockRow>(
            r#"
            SELECT i.id AS ingredient_id, i.name AS ingredient_name, i.unit,
                   COALESCE(SUM(CASE WHEN m.direction = 'inbound' THEN m.quantity ELSE 0 END), 0) AS total_in,
                   COALESCE(SUM(CASE WHEN m.direction = 'outbound' THEN m.quantity ELSE 0 END), 0) AS total_out,
                   i.min_stock_threshold
            FROM ingredients i
            LEFT JOIN inventory_movements m ON m.ingredient_id = i.id
            WHERE i.user_id = $1
            GROUP BY i.id, i.name, i.unit, i.min_stock_threshold
            ORDER BY i.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let on_hand = r.total_in - r.total_out;
                let below_threshold = r
                    .min_stock_threshold
                    .map(|t| on_hand <= t)
                    .unwrap_or(false);
                StockLevel {
                    ingredient_id: r.ingredient_id,
                    ingredient_name: r.ingredient_name,
                    unit: r.unit,
                    on_hand,
                    min_stock_threshold: r.min_stock_threshold,
                    below_threshold,
                }
            })
            .collect())
    }
}
