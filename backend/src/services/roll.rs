//! Fabric roll stock service

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::ledger::{ensure_status_consistent, normalize_weight, weight_change_movement};
use shared::validation::{validate_barcode, validate_new_roll_weights};
use shared::{DomainError, FabricRoll, MovementKind, RollStatus, StockMovement};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::ledger::{self, MOVEMENT_COLUMNS, ROLL_COLUMNS};
use crate::services::lookup;

/// Roll stock service
#[derive(Clone)]
pub struct RollService {
    db: PgPool,
}

/// Fabric and color of a roll
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FabricSummary {
    pub id: Uuid,
    pub name: String,
    pub reference_code: String,
    pub color_id: Uuid,
    pub color_name: String,
    pub color_hex: Option<String>,
}

/// Roll with its fabric and, on single reads, its movements
#[derive(Debug, Clone, Serialize)]
pub struct RollDetail {
    #[serde(flatten)]
    pub roll: FabricRoll,
    pub consumed_weight_kg: Decimal,
    pub fabric: FabricSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movements: Option<Vec<StockMovement>>,
}

/// Input for stocking a roll
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRollInput {
    pub fabric_id: Uuid,
    #[validate(length(max = 64))]
    pub barcode: Option<String>,
    pub initial_weight_kg: Decimal,
    /// Defaults to the initial weight
    pub current_weight_kg: Option<Decimal>,
    pub status: Option<RollStatus>,
}

/// Input for updating a roll
#[derive(Debug, Deserialize)]
pub struct UpdateRollInput {
    pub current_weight_kg: Option<Decimal>,
    pub status: Option<RollStatus>,
}

/// Filters for listing rolls
#[derive(Debug, Default, Deserialize)]
pub struct RollFilter {
    pub fabric_id: Option<Uuid>,
    pub status: Option<RollStatus>,
}

impl RollService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Stock a new roll. The row starts empty and the opening weight comes
    /// in through the ledger, followed by an adjustment when the roll
    /// arrives already partly used.
    pub async fn create_roll(&self, user_id: Uuid, input: CreateRollInput) -> AppResult<RollDetail> {
        validate_new_roll_weights(input.initial_weight_kg, input.current_weight_kg)
            .map_err(|msg| AppError::validation("initial_weight_kg", msg))?;
        let barcode = match input.barcode.as_deref() {
            Some(code) => {
                validate_barcode(code).map_err(|msg| AppError::validation("barcode", msg))?;
                Some(code.trim().to_string())
            }
            None => None,
        };

        let initial = normalize_weight(input.initial_weight_kg);
        let current = input.current_weight_kg.map(normalize_weight).unwrap_or(initial);
        let status = input.status.unwrap_or(if current > Decimal::ZERO {
            RollStatus::Available
        } else {
            RollStatus::Exhausted
        });

        let mut tx = self.db.begin().await?;

        lookup::ensure_fabric(&mut tx, input.fabric_id).await?;

        if let Some(code) = &barcode {
            let taken = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM fabric_rolls WHERE barcode = $1)",
            )
            .bind(code)
            .fetch_one(&mut *tx)
            .await?;
            if taken {
                return Err(DomainError::DuplicateBarcode(code.clone()).into());
            }
        }

        let roll_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO fabric_rolls (fabric_id, barcode, initial_weight_kg, current_weight_kg, status)
            VALUES ($1, $2, $3, 0, $4)
            RETURNING id
            "#,
        )
        .bind(input.fabric_id)
        .bind(&barcode)
        .bind(initial)
        .bind(RollStatus::Available)
        .fetch_one(&mut *tx)
        .await?;

        if current > initial {
            return Err(DomainError::WeightAboveInitial {
                roll_id,
                initial,
                requested: current,
            }
            .into());
        }
        ensure_status_consistent(roll_id, status, current)?;

        // The requested status lands with the last movement
        let opening_status = if current < initial { None } else { Some(status) };
        ledger::apply_movement(&mut tx, roll_id, user_id, MovementKind::Entry, initial, opening_status)
            .await?;
        if current < initial {
            ledger::apply_movement(
                &mut tx,
                roll_id,
                user_id,
                MovementKind::Adjustment,
                current,
                Some(status),
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(%roll_id, fabric_id = %input.fabric_id, %initial, %current, "Roll stocked");

        self.get_roll(roll_id).await
    }

    /// List rolls, newest first
    pub async fn list_rolls(&self, filter: RollFilter) -> AppResult<Vec<RollDetail>> {
        let rolls = sqlx::query_as::<_, FabricRoll>(&format!(
            r#"
            SELECT {}
            FROM fabric_rolls
            WHERE ($1::uuid IS NULL OR fabric_id = $1)
              AND ($2::roll_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
            ROLL_COLUMNS
        ))
        .bind(filter.fabric_id)
        .bind(filter.status)
        .fetch_all(&self.db)
        .await?;

        let fabric_ids: Vec<Uuid> = rolls.iter().map(|r| r.fabric_id).collect();
        let fabrics = self.fabric_summaries(&fabric_ids).await?;

        rolls
            .into_iter()
            .map(|roll| {
                let fabric = fabrics
                    .iter()
                    .find(|f| f.id == roll.fabric_id)
                    .cloned()
                    .ok_or(DomainError::FabricNotFound(roll.fabric_id))?;
                Ok(RollDetail {
                    consumed_weight_kg: roll.consumed_weight_kg(),
                    roll,
                    fabric,
                    movements: None,
                })
            })
            .collect()
    }

    /// Get a roll with its fabric and movements
    pub async fn get_roll(&self, roll_id: Uuid) -> AppResult<RollDetail> {
        let roll = sqlx::query_as::<_, FabricRoll>(&format!(
            "SELECT {} FROM fabric_rolls WHERE id = $1",
            ROLL_COLUMNS
        ))
        .bind(roll_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(DomainError::RollNotFound(roll_id))?;

        let fabric = self
            .fabric_summaries(&[roll.fabric_id])
            .await?
            .into_iter()
            .next()
            .ok_or(DomainError::FabricNotFound(roll.fabric_id))?;

        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {} FROM stock_movements WHERE roll_id = $1 ORDER BY created_at DESC, sequence DESC",
            MOVEMENT_COLUMNS
        ))
        .bind(roll_id)
        .fetch_all(&self.db)
        .await?;

        Ok(RollDetail {
            consumed_weight_kg: roll.consumed_weight_kg(),
            roll,
            fabric,
            movements: Some(movements),
        })
    }

    /// Update status and/or weight. A weight change becomes an entry or exit
    /// of the difference.
    pub async fn update_roll(
        &self,
        user_id: Uuid,
        roll_id: Uuid,
        input: UpdateRollInput,
    ) -> AppResult<RollDetail> {
        if let Some(weight) = input.current_weight_kg {
            if weight < Decimal::ZERO {
                return Err(AppError::validation(
                    "current_weight_kg",
                    "Current weight cannot be negative",
                ));
            }
        }

        let mut tx = self.db.begin().await?;
        let roll = ledger::lock_roll(&mut tx, roll_id).await?;

        let mut weight = roll.current_weight_kg;
        if let Some(target) = input.current_weight_kg {
            let target = normalize_weight(target);
            if target > roll.initial_weight_kg {
                return Err(DomainError::WeightAboveInitial {
                    roll_id,
                    initial: roll.initial_weight_kg,
                    requested: target,
                }
                .into());
            }
            if let Some((kind, delta)) = weight_change_movement(roll.current_weight_kg, target) {
                let applied =
                    ledger::apply_movement(&mut tx, roll_id, user_id, kind, delta, input.status)
                        .await?;
                weight = applied.weight_after_kg;
            }
        }

        if let Some(status) = input.status {
            ensure_status_consistent(roll_id, status, weight)?;
            sqlx::query("UPDATE fabric_rolls SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(roll_id)
                .bind(status)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.get_roll(roll_id).await
    }

    /// Delete a roll that never had a movement
    pub async fn delete_roll(&self, roll_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        ledger::lock_roll(&mut tx, roll_id).await?;

        let movements = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM stock_movements WHERE roll_id = $1",
        )
        .bind(roll_id)
        .fetch_one(&mut *tx)
        .await?;
        if movements > 0 {
            return Err(DomainError::RollHasMovements(roll_id).into());
        }

        sqlx::query("DELETE FROM fabric_rolls WHERE id = $1")
            .bind(roll_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(%roll_id, "Roll deleted");
        Ok(())
    }

    async fn fabric_summaries(&self, fabric_ids: &[Uuid]) -> AppResult<Vec<FabricSummary>> {
        let summaries = sqlx::query_as::<_, FabricSummary>(
            r#"
            SELECT f.id, f.name, f.reference_code, c.id AS color_id, c.name AS color_name, c.hex_code AS color_hex
            FROM fabrics f
            JOIN colors c ON c.id = f.color_id
            WHERE f.id = ANY($1)
            "#,
        )
        .bind(fabric_ids)
        .fetch_all(&self.db)
        .await?;
        Ok(summaries)
    }
}
