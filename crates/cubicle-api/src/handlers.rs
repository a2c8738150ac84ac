//! REST endpoint handlers for the session API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness and session count |
//! | `GET` | `/api/projects` | Starting projects |
//! | `POST` | `/api/sessions` | Create a session |
//! | `GET` | `/api/sessions/{id}` | Current state |
//! | `DELETE` | `/api/sessions/{id}` | Drop a session |
//! | `POST` | `/api/sessions/{id}/restart` | Start over in the same session |
//! | `POST` | `/api/sessions/{id}/actions` | Submit an action |
//! | `POST` | `/api/sessions/{id}/event/ack` | Acknowledge a global event |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use cubicle_core::narrator::Narrator;
use cubicle_core::session::Session;
use cubicle_types::{ActionOutcome, ActionRequest, GameState, OnboardRequest, SessionId};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::state::{AppState, SharedSession};

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

/// A session and its state.
#[derive(Debug, Serialize)]
pub struct SessionView {
    /// The session.
    pub session_id: SessionId,
    /// Full state snapshot.
    pub state: GameState,
}

/// Result of a submitted action.
#[derive(Debug, Serialize)]
pub struct ActionView {
    /// What happened.
    pub outcome: ActionOutcome,
    /// State after the action.
    pub state: GameState,
}

/// Result of acknowledging a global event.
#[derive(Debug, Serialize)]
pub struct AckView {
    /// Whether an event was active.
    pub acknowledged: bool,
    /// State after the acknowledgement.
    pub state: GameState,
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Report liveness.
pub async fn health<N: Narrator>(State(state): State<Arc<AppState<N>>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "sessions": state.session_count().await,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/projects
// ---------------------------------------------------------------------------

/// List the projects a new player can join.
pub async fn list_projects<N: Narrator>(
    State(state): State<Arc<AppState<N>>>,
) -> impl IntoResponse {
    let projects: Vec<serde_json::Value> = state
        .catalog
        .projects
        .iter()
        .map(|p| {
            serde_json::json!({
                "id": p.id,
                "name": p.name,
                "type": p.project_type,
                "status": p.status,
                "difficulty": p.difficulty,
            })
        })
        .collect();
    Json(serde_json::json!({
        "count": projects.len(),
        "projects": projects,
    }))
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Create a session and return its ID with the onboarded state.
pub async fn create_session<N: Narrator>(
    State(state): State<Arc<AppState<N>>>,
    Json(body): Json<OnboardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()?;
    let session = Session::new(Arc::clone(&state.catalog), state.config.clone(), &body)?;
    let snapshot = session.state().clone();
    let id = state.insert(session).await;
    info!(session = %id, player = %body.name, role = body.role.as_str(), "session created");

    Ok((
        StatusCode::CREATED,
        Json(SessionView {
            session_id: id,
            state: snapshot,
        }),
    ))
}

/// Return the current state of a session.
pub async fn get_session<N: Narrator>(
    State(state): State<Arc<AppState<N>>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (id, handle) = lookup(&state, &id_str).await?;
    let session = handle.lock().await;
    Ok(Json(SessionView {
        session_id: id,
        state: session.state().clone(),
    }))
}

/// Drop a session.
pub async fn delete_session<N: Narrator>(
    State(state): State<Arc<AppState<N>>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_session_id(&id_str)?;
    if !state.remove(id).await {
        return Err(ApiError::NotFound(format!("session {id}")));
    }
    info!(session = %id, "session deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Replace a session's game with a fresh one.
pub async fn restart_session<N: Narrator>(
    State(state): State<Arc<AppState<N>>>,
    Path(id_str): Path<String>,
    Json(body): Json<OnboardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()?;
    let (id, handle) = lookup(&state, &id_str).await?;
    let mut session = handle.lock().await;
    session.restart(&body)?;
    info!(session = %id, player = %body.name, "session restarted");
    Ok(Json(SessionView {
        session_id: id,
        state: session.state().clone(),
    }))
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Apply one action and return the outcome with the new state.
pub async fn submit_action<N: Narrator>(
    State(state): State<Arc<AppState<N>>>,
    Path(id_str): Path<String>,
    Json(body): Json<ActionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()?;
    let (input, channel) = body.into_input()?;
    let (_, handle) = lookup(&state, &id_str).await?;
    let mut session = handle.lock().await;
    let outcome = session
        .submit(state.narrator.as_ref(), input, channel)
        .await;
    Ok(Json(ActionView {
        outcome,
        state: session.state().clone(),
    }))
}

/// Clear the active global event.
pub async fn acknowledge_event<N: Narrator>(
    State(state): State<Arc<AppState<N>>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, handle) = lookup(&state, &id_str).await?;
    let mut session = handle.lock().await;
    let acknowledged = session.acknowledge();
    Ok(Json(AckView {
        acknowledged,
        state: session.state().clone(),
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a session ID from a path segment.
pub(crate) fn parse_session_id(s: &str) -> Result<SessionId, ApiError> {
    Uuid::parse_str(s)
        .map(SessionId::from)
        .map_err(|e| ApiError::BadRequest(format!("invalid session id '{s}': {e}")))
}

/// Resolve a path segment to a live session.
pub(crate) async fn lookup<N>(
    state: &AppState<N>,
    id_str: &str,
) -> Result<(SessionId, SharedSession), ApiError> {
    let id = parse_session_id(id_str)?;
    let handle = state
        .session(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("session {id}")))?;
    Ok((id, handle))
}
