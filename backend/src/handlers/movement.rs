//! Stock movement HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::middleware::CurrentUser;
use crate::services::movement::{CreateMovementInput, MovementFilter, MovementService};
use crate::AppState;

/// Record a manual movement as the token subject
pub async fn create_movement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateMovementInput>,
) -> impl IntoResponse {
    let service = MovementService::new(state.db.clone());

    match service.create_movement(current_user.0.user_id, input).await {
        Ok(applied) => (StatusCode::CREATED, Json(applied)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// List movements
pub async fn list_movements(
    State(state): State<AppState>,
    Query(filter): Query<MovementFilter>,
) -> impl IntoResponse {
    let service = MovementService::new(state.db.clone());

    match service.list_movements(filter).await {
        Ok(movements) => (StatusCode::OK, Json(movements)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_movement(
    State(state): State<AppState>,
    Path(movement_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = MovementService::new(state.db.clone());

    match service.get_movement(movement_id).await {
        Ok(movement) => (StatusCode::OK, Json(movement)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Reconstructed weight history of a roll
pub async fn get_roll_history(
    State(state): State<AppState>,
    Path(roll_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = MovementService::new(state.db.clone());

    match service.roll_history(roll_id).await {
        Ok(history) => (StatusCode::OK, Json(history)).into_response(),
        Err(e) => e.into_response(),
    }
}
