//! Stock ledger persistence
//!
//! The only code that writes `fabric_rolls.current_weight_kg`. Every call
//! runs on the caller's connection, normally inside an open transaction, and
//! never commits on its own.

use rust_decimal::Decimal;
use serde::Serialize;
use shared::ledger::{plan_movement, RollBalance};
use shared::{DomainError, FabricRoll, MovementKind, RollStatus, StockMovement};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::AppResult;

pub(crate) const ROLL_COLUMNS: &str = "id, fabric_id, barcode, initial_weight_kg, current_weight_kg, status, created_at, updated_at";

pub(crate) const MOVEMENT_COLUMNS: &str = "id, roll_id, user_id, kind, weight_kg, sequence, created_at";

/// Roll and ledger row written by one movement
#[derive(Debug, Clone, Serialize)]
pub struct AppliedMovement {
    pub roll: FabricRoll,
    pub movement: StockMovement,
    pub weight_before_kg: Decimal,
    pub weight_after_kg: Decimal,
}

/// Lock a roll row for the rest of the transaction
pub async fn lock_roll(conn: &mut PgConnection, roll_id: Uuid) -> AppResult<FabricRoll> {
    let roll = sqlx::query_as::<_, FabricRoll>(&format!(
        "SELECT {} FROM fabric_rolls WHERE id = $1 FOR UPDATE",
        ROLL_COLUMNS
    ))
    .bind(roll_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(DomainError::RollNotFound(roll_id))?;
    Ok(roll)
}

/// Apply one movement to a roll and append its ledger row.
///
/// `status_when_remaining` is forwarded to the ledger rules: the status the
/// roll takes when weight is left on it.
pub async fn apply_movement(
    conn: &mut PgConnection,
    roll_id: Uuid,
    user_id: Uuid,
    kind: MovementKind,
    weight: Decimal,
    status_when_remaining: Option<RollStatus>,
) -> AppResult<AppliedMovement> {
    let roll = lock_roll(conn, roll_id).await?;
    let effect = match plan_movement(&RollBalance::from(&roll), kind, weight, status_when_remaining) {
        Ok(effect) => effect,
        Err(err) => {
            tracing::warn!(%roll_id, kind = %kind, %weight, "Stock movement rejected: {}", err);
            return Err(err.into());
        }
    };

    let roll = sqlx::query_as::<_, FabricRoll>(&format!(
        r#"
        UPDATE fabric_rolls
        SET current_weight_kg = $2, status = $3, updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        ROLL_COLUMNS
    ))
    .bind(roll_id)
    .bind(effect.weight_after_kg)
    .bind(effect.status_after)
    .fetch_one(&mut *conn)
    .await?;

    let movement = sqlx::query_as::<_, StockMovement>(&format!(
        r#"
        INSERT INTO stock_movements (roll_id, user_id, kind, weight_kg)
        VALUES ($1, $2, $3, $4)
        RETURNING {}
        "#,
        MOVEMENT_COLUMNS
    ))
    .bind(roll_id)
    .bind(user_id)
    .bind(kind)
    .bind(effect.recorded_weight_kg)
    .fetch_one(&mut *conn)
    .await?;

    tracing::info!(
        %roll_id,
        movement_id = %movement.id,
        kind = %kind,
        weight_kg = %effect.recorded_weight_kg,
        before = %effect.weight_before_kg,
        after = %effect.weight_after_kg,
        status = %effect.status_after,
        "Stock movement recorded"
    );

    Ok(AppliedMovement {
        roll,
        movement,
        weight_before_kg: effect.weight_before_kg,
        weight_after_kg: effect.weight_after_kg,
    })
}
