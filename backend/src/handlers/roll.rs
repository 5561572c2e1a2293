//! Roll stock HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::{require_admin, CurrentUser};
use crate::services::roll::{CreateRollInput, RollFilter, RollService, UpdateRollInput};
use crate::AppState;

/// List rolls
pub async fn list_rolls(
    State(state): State<AppState>,
    Query(filter): Query<RollFilter>,
) -> impl IntoResponse {
    let service = RollService::new(state.db.clone());

    match service.list_rolls(filter).await {
        Ok(rolls) => (StatusCode::OK, Json(rolls)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a roll with its movements
pub async fn get_roll(
    State(state): State<AppState>,
    Path(roll_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = RollService::new(state.db.clone());

    match service.get_roll(roll_id).await {
        Ok(roll) => (StatusCode::OK, Json(roll)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Stock a new roll
pub async fn create_roll(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateRollInput>,
) -> impl IntoResponse {
    if let Err(e) = input.validate() {
        return AppError::from(e).into_response();
    }
    let service = RollService::new(state.db.clone());

    match service.create_roll(current_user.0.user_id, input).await {
        Ok(roll) => (StatusCode::CREATED, Json(roll)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Update a roll's status or weight
pub async fn update_roll(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(roll_id): Path<Uuid>,
    Json(input): Json<UpdateRollInput>,
) -> impl IntoResponse {
    let service = RollService::new(state.db.clone());

    match service.update_roll(current_user.0.user_id, roll_id, input).await {
        Ok(roll) => (StatusCode::OK, Json(roll)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Delete a roll (admin only)
pub async fn delete_roll(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(roll_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(e) = require_admin(&current_user.0) {
        return e.into_response();
    }
    let service = RollService::new(state.db.clone());

    match service.delete_roll(roll_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}
