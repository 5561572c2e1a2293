//! Transaction-scoped data access for reservation validation

use shared::reservation::{
    requested_roll_ids, validate_reservations, ReservationRequest, RollSnapshot,
    ValidatedReservations,
};
use shared::{MovementKind, RollStatus};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::ledger::{self, AppliedMovement};

/// Fetch and lock every requested roll with its fabric color in one query,
/// then run the shared validator. Rows are locked in id order.
pub async fn validate(
    conn: &mut PgConnection,
    requests: &[ReservationRequest],
) -> AppResult<ValidatedReservations> {
    let ids = requested_roll_ids(requests);
    let rolls = if ids.is_empty() {
        Vec::new()
    } else {
        sqlx::query_as::<_, RollSnapshot>(
            r#"
            SELECT r.id, r.fabric_id, f.color_id, r.initial_weight_kg, r.current_weight_kg, r.status
            FROM fabric_rolls r
            JOIN fabrics f ON f.id = r.fabric_id
            WHERE r.id = ANY($1)
            ORDER BY r.id
            FOR UPDATE OF r
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?
    };

    validate_reservations(requests, rolls).map_err(|err| {
        tracing::warn!("Reservation rejected: {}", err);
        err.into()
    })
}

/// Take the validated weight out of every roll with an exit movement
pub async fn consume(
    conn: &mut PgConnection,
    validated: &ValidatedReservations,
    user_id: Uuid,
    status_when_remaining: RollStatus,
) -> AppResult<Vec<AppliedMovement>> {
    let mut applied = Vec::with_capacity(validated.grouped.len());
    for reservation in &validated.grouped {
        applied.push(
            ledger::apply_movement(
                conn,
                reservation.roll_id,
                user_id,
                MovementKind::Exit,
                reservation.weight_kg,
                Some(status_when_remaining),
            )
            .await?,
        );
    }
    Ok(applied)
}
