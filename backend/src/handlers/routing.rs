//! Routing HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::middleware::{require_admin, CurrentUser};
use crate::services::routing::{
    CreateRoutingInput, RoutingFilter, RoutingService, UpdateRoutingInput,
};
use crate::AppState;

pub async fn list_routings(
    State(state): State<AppState>,
    Query(filter): Query<RoutingFilter>,
) -> impl IntoResponse {
    let service = RoutingService::new(state.db.clone());

    match service.list(filter).await {
        Ok(routings) => (StatusCode::OK, Json(routings)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_routing(
    State(state): State<AppState>,
    Path(routing_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = RoutingService::new(state.db.clone());

    match service.get(routing_id).await {
        Ok(routing) => (StatusCode::OK, Json(routing)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Send a batch to a faction
pub async fn create_routing(
    State(state): State<AppState>,
    Json(input): Json<CreateRoutingInput>,
) -> impl IntoResponse {
    let service = RoutingService::new(state.db.clone());

    match service.create(input).await {
        Ok(routing) => (StatusCode::CREATED, Json(routing)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update_routing(
    State(state): State<AppState>,
    Path(routing_id): Path<Uuid>,
    Json(input): Json<UpdateRoutingInput>,
) -> impl IntoResponse {
    let service = RoutingService::new(state.db.clone());

    match service.update(routing_id, input).await {
        Ok(routing) => (StatusCode::OK, Json(routing)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Delete a routing (admin only)
pub async fn delete_routing(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(routing_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(e) = require_admin(&current_user.0) {
        return e.into_response();
    }
    let service = RoutingService::new(state.db.clone());

    match service.delete(routing_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}
