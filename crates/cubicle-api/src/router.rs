//! Axum router construction for the session API.
//!
//! Assembles all routes (REST + SSE) into a single [`Router`] with CORS
//! middleware enabled for the browser client.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use cubicle_core::narrator::Narrator;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::stream;

/// Build the complete Axum router for the session API.
///
/// The router includes:
/// - `GET /health` -- liveness
/// - `GET /api/projects` -- starting projects
/// - `POST /api/sessions` -- create a session
/// - `GET /api/sessions/{id}` -- current state
/// - `DELETE /api/sessions/{id}` -- drop a session
/// - `POST /api/sessions/{id}/restart` -- start over
/// - `POST /api/sessions/{id}/actions` -- submit an action
/// - `POST /api/sessions/{id}/actions/stream` -- submit, answered as SSE
/// - `POST /api/sessions/{id}/event/ack` -- acknowledge a global event
///
/// CORS is configured to allow any origin for development. In
/// production this should be restricted.
pub fn build_router<N: Narrator + 'static>(state: Arc<AppState<N>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health::<N>))
        .route("/api/projects", get(handlers::list_projects::<N>))
        .route("/api/sessions", post(handlers::create_session::<N>))
        .route(
            "/api/sessions/{id}",
            get(handlers::get_session::<N>).delete(handlers::delete_session::<N>),
        )
        .route(
            "/api/sessions/{id}/restart",
            post(handlers::restart_session::<N>),
        )
        .route(
            "/api/sessions/{id}/actions",
            post(handlers::submit_action::<N>),
        )
        .route(
            "/api/sessions/{id}/actions/stream",
            post(stream::submit_action_stream::<N>),
        )
        .route(
            "/api/sessions/{id}/event/ack",
            post(handlers::acknowledge_event::<N>),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
