//! Quality inspection HTTP handlers

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
use crate::services::conference::{
    ConferenceFilter, ConferenceService, CreateConferenceInput, UpdateConferenceInput,
};
use crate::AppState;

pub async fn list_conferences(
    State(state): State<AppState>,
    Query(filter): Query<ConferenceFilter>,
) -> impl IntoResponse {
    let service = ConferenceService::new(state.db.clone());

    match service.list(filter).await {
        Ok(conferences) => (StatusCode::OK, Json(conferences)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_conference(
    State(state): State<AppState>,
    Path(conference_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = ConferenceService::new(state.db.clone());

    match service.get(conference_id).await {
        Ok(conference) => (StatusCode::OK, Json(conference)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Record an inspection
pub async fn create_conference(
    State(state): State<AppState>,
    Json(input): Json<CreateConferenceInput>,
) -> impl IntoResponse {
    if let Err(e) = input.validate() {
        return AppError::from(e).into_response();
    }
    let service = ConferenceService::new(state.db.clone());

    match service.create(input).await {
        Ok(conference) => (StatusCode::CREATED, Json(conference)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Patch an inspection; payment release is checked on the merged state
pub async fn update_conference(
    State(state): State<AppState>,
    Path(conference_id): Path<Uuid>,
    Json(input): Json<UpdateConferenceInput>,
) -> impl IntoResponse {
    if let Err(e) = input.validate() {
        return AppError::from(e).into_response();
    }
    let service = ConferenceService::new(state.db.clone());

    match service.update(conference_id, input).await {
        Ok(conference) => (StatusCode::OK, Json(conference)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Delete an inspection (admin only)
pub async fn delete_conference(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(conference_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(e) = require_admin(&current_user.0) {
        return e.into_response();
    }
    let service = ConferenceService::new(state.db.clone());

    match service.delete(conference_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}
