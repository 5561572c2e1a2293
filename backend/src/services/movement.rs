//! Stock movement service: manual movements, listings and roll history

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::history::{reconstruct_history, RollHistory};
use shared::validation::{validate_date_range, validate_movement_weight};
use shared::{DateRange, DomainError, FabricRoll, MovementKind, StockMovement};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::ledger::{self, AppliedMovement, MOVEMENT_COLUMNS, ROLL_COLUMNS};

/// Stock movement service
#[derive(Clone)]
pub struct MovementService {
    db: PgPool,
}

/// Input for a manual movement
#[derive(Debug, Deserialize)]
pub struct CreateMovementInput {
    pub roll_id: Uuid,
    pub kind: MovementKind,
    pub weight_kg: Decimal,
}

/// Filters for listing movements
#[derive(Debug, Default, Deserialize)]
pub struct MovementFilter {
    pub roll_id: Option<Uuid>,
    pub kind: Option<MovementKind>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl MovementService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a manual movement by `user_id`. Not idempotent: sending the
    /// same request twice moves the weight twice.
    pub async fn create_movement(
        &self,
        user_id: Uuid,
        input: CreateMovementInput,
    ) -> AppResult<AppliedMovement> {
        validate_movement_weight(input.weight_kg)
            .map_err(|msg| AppError::validation("weight_kg", msg))?;

        let mut tx = self.db.begin().await?;
        let applied = ledger::apply_movement(
            &mut tx,
            input.roll_id,
            user_id,
            input.kind,
            input.weight_kg,
            None,
        )
        .await?;
        tx.commit().await?;

        Ok(applied)
    }

    /// List movements, newest first
    pub async fn list_movements(&self, filter: MovementFilter) -> AppResult<Vec<StockMovement>> {
        let range = DateRange {
            start: filter.start,
            end: filter.end,
        };
        validate_date_range(&range).map_err(|msg| AppError::validation("start", msg))?;

        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            r#"
            SELECT {}
            FROM stock_movements
            WHERE ($1::uuid IS NULL OR roll_id = $1)
              AND ($2::movement_kind IS NULL OR kind = $2)
              AND ($3::timestamptz IS NULL OR created_at >= $3)
              AND ($4::timestamptz IS NULL OR created_at <= $4)
            ORDER BY created_at DESC, sequence DESC
            "#,
            MOVEMENT_COLUMNS
        ))
        .bind(filter.roll_id)
        .bind(filter.kind)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        Ok(movements)
    }

    pub async fn get_movement(&self, movement_id: Uuid) -> AppResult<StockMovement> {
        let movement = sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {} FROM stock_movements WHERE id = $1",
            MOVEMENT_COLUMNS
        ))
        .bind(movement_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(DomainError::MovementNotFound(movement_id))?;
        Ok(movement)
    }

    /// Replay a roll's movements into a weight trace. Reads one snapshot;
    /// safe to retry.
    pub async fn roll_history(&self, roll_id: Uuid) -> AppResult<RollHistory> {
        let roll = sqlx::query_as::<_, FabricRoll>(&format!(
            "SELECT {} FROM fabric_rolls WHERE id = $1",
            ROLL_COLUMNS
        ))
        .bind(roll_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(DomainError::RollNotFound(roll_id))?;

        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {} FROM stock_movements WHERE roll_id = $1 ORDER BY created_at, sequence",
            MOVEMENT_COLUMNS
        ))
        .bind(roll_id)
        .fetch_all(&self.db)
        .await?;

        let history = reconstruct_history(&roll, &movements);
        if !history.is_ledger_consistent() {
            tracing::warn!(
                %roll_id,
                stored = %history.current_weight_kg,
                replayed = %history.replayed_weight_kg,
                "Roll ledger drift detected"
            );
        }
        Ok(history)
    }
}
