//! Route definitions for the production platform

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes. Everything except `/health` requires a bearer token.
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .nest("/estoque-rolos", roll_routes())
        .nest("/movimentacoes-estoque", movement_routes())
        .nest("/lotes-producao", batch_routes())
        .nest("/direcionamentos", routing_routes())
        .nest("/conferencias", conference_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(protected)
}

/// Roll stock routes
fn roll_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_rolls).post(handlers::create_roll))
        .route(
            "/:id",
            get(handlers::get_roll)
                .put(handlers::update_roll)
                .delete(handlers::delete_roll),
        )
}

/// Stock movement routes
fn movement_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_movements).post(handlers::create_movement))
        .route("/:id", get(handlers::get_movement))
        // :id is the roll here
        .route("/:id/historico", get(handlers::get_roll_history))
}

/// Production batch routes
fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_batches).post(handlers::create_batch))
        .route(
            "/:id",
            get(handlers::get_batch)
                .put(handlers::update_batch)
                .delete(handlers::delete_batch),
        )
        .route("/:id/itens", post(handlers::add_batch_items))
}

/// Routing routes
fn routing_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_routings).post(handlers::create_routing))
        .route(
            "/:id",
            get(handlers::get_routing)
                .put(handlers::update_routing)
                .delete(handlers::delete_routing),
        )
}

/// Quality inspection routes
fn conference_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_conferences).post(handlers::create_conference))
        .route(
            "/:id",
            get(handlers::get_conference)
                .put(handlers::update_conference)
                .delete(handlers::delete_conference),
        )
}
