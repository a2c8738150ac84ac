//! Server-sent event stream for a submitted action.
//!
//! `POST /api/sessions/{id}/actions/stream` applies the action like the
//! plain endpoint, but answers with an SSE stream:
//!
//! - `msg_append` -- one narrator section (analysis, narrative, reply,
//!   effects, error) as soon as it is produced
//! - `state_update` -- the outcome and the full state once the action has
//!   settled
//! - `done` -- end of stream
//!
//! The action runs in its own task so a client that disconnects early
//! never leaves a session half-updated.

use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use cubicle_core::narrator::Narrator;
use cubicle_types::ActionRequest;
use futures::Stream;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use validator::Validate;

use crate::error::ApiError;
use crate::handlers::{ActionView, lookup};
use crate::state::AppState;

/// Apply one action and stream its progress.
pub async fn submit_action_stream<N: Narrator + 'static>(
    State(state): State<Arc<AppState<N>>>,
    Path(id_str): Path<String>,
    Json(body): Json<ActionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()?;
    let (input, channel) = body.into_input()?;
    let (id, handle) = lookup(&state, &id_str).await?;
    let narrator = Arc::clone(&state.narrator);
    let (events, rx) = mpsc::unbounded_channel::<Event>();

    tokio::spawn(async move {
        let (sections_tx, mut sections_rx) = mpsc::unbounded_channel();
        let mut session = handle.lock().await;

        let run = session.submit_streaming(narrator.as_ref(), input, channel, sections_tx);
        let forward = async {
            while let Some(section) = sections_rx.recv().await {
                send(&events, "msg_append", &section);
            }
        };
        let (outcome, ()) = tokio::join!(run, forward);

        let view = ActionView {
            outcome,
            state: session.state().clone(),
        };
        drop(session);
        send(&events, "state_update", &view);
        send(&events, "done", &serde_json::json!({ "session_id": id }));
        debug!(session = %id, "action stream finished");
    });

    Ok(Sse::new(receiver_stream(rx)).keep_alive(KeepAlive::default()))
}

/// Serialize `data` into a named event and queue it.
fn send<T: Serialize>(events: &mpsc::UnboundedSender<Event>, name: &str, data: &T) {
    match Event::default().event(name).json_data(data) {
        Ok(event) => {
            // The client may have gone away; the action still completes.
            let _ = events.send(event);
        }
        Err(error) => warn!(%error, event = name, "failed to encode SSE event"),
    }
}

/// Adapt a receiver into the stream shape [`Sse`] expects.
fn receiver_stream(
    rx: mpsc::UnboundedReceiver<Event>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (Ok(event), rx))
    })
}
