//! Integration tests for the session API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. Sessions are seeded and every random roll is
//! disabled, so outcomes are deterministic.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use cubicle_api::router::build_router;
use cubicle_api::state::AppState;
use cubicle_core::catalog::Catalog;
use cubicle_core::config::EngineConfig;
use cubicle_core::narrator::HeuristicNarrator;
use serde_json::{Value, json};
use tower::ServiceExt;

fn make_test_state() -> Arc<AppState<HeuristicNarrator>> {
    let mut config = EngineConfig::default();
    let sim = &mut config.simulation;
    sim.seed = Some(7);
    sim.init_event_chance = 0.0;
    sim.random_event_chance = 0.0;
    sim.command_reply_chance = 0.0;
    sim.global_events.base_probability = 0.0;
    sim.global_events.command_probability = 0.0;
    sim.global_events.low_mood_bonus = 0.0;
    sim.global_events.low_energy_bonus = 0.0;
    sim.global_events.high_risk_bonus = 0.0;
    Arc::new(AppState::new(
        Arc::new(Catalog::builtin().unwrap()),
        config,
        Arc::new(HeuristicNarrator),
    ))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Create a Dev on Genshin and return the session ID.
async fn create_session(state: &Arc<AppState<HeuristicNarrator>>) -> String {
    let app = build_router(Arc::clone(state));
    let response = app
        .oneshot(post_json(
            "/api/sessions",
            &json!({"name": "Ada", "role": "Dev", "project_id": "Genshin"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_to_json(response.into_body()).await;
    json["session_id"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn health_reports_session_count() {
    let state = make_test_state();
    create_session(&state).await;

    let response = build_router(state).oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["sessions"], 1);
}

#[tokio::test]
async fn projects_are_listed() {
    let response = build_router(make_test_state())
        .oneshot(get("/api/projects"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 6);
    let ids: Vec<&str> = json["projects"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["id"].as_str())
        .collect();
    assert!(ids.contains(&"Genshin"));
}

#[tokio::test]
async fn create_session_onboards_the_player() {
    let state = make_test_state();
    let response = build_router(state)
        .oneshot(post_json(
            "/api/sessions",
            &json!({"name": "Ada", "role": "Dev", "project_id": "Genshin"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_to_json(response.into_body()).await;
    assert!(json["session_id"].is_string());
    assert_eq!(json["state"]["week"], 1);
    assert_eq!(json["state"]["player"]["name"], "Ada");
    assert_eq!(json["state"]["player"]["hard_skill"], 70);
    assert_eq!(json["state"]["game_over"], false);
}

#[tokio::test]
async fn unknown_project_is_rejected() {
    let response = build_router(make_test_state())
        .oneshot(post_json(
            "/api/sessions",
            &json!({"name": "Ada", "role": "Dev", "project_id": "General"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn blank_name_fails_validation() {
    let response = build_router(make_test_state())
        .oneshot(post_json(
            "/api/sessions",
            &json!({"name": "", "role": "Ops", "project_id": "Genshin"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let response = build_router(make_test_state())
        .oneshot(get("/api/sessions/0191e0a0-0000-7000-8000-000000000000"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_session_id_is_bad_request() {
    let response = build_router(make_test_state())
        .oneshot(get("/api/sessions/not-a-uuid"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn free_text_advances_the_week() {
    let state = make_test_state();
    let id = create_session(&state).await;

    let response = build_router(Arc::clone(&state))
        .oneshot(post_json(
            &format!("/api/sessions/{id}/actions"),
            &json!({"text": "I fix the login crash"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["outcome"]["outcome"], "applied");
    assert_eq!(json["outcome"]["weeks_advanced"], 1);
    assert_eq!(json["state"]["week"], 2);

    let response = build_router(state)
        .oneshot(get(&format!("/api/sessions/{id}")))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["state"]["week"], 2);
}

#[tokio::test]
async fn workbench_raw_command_keeps_the_week() {
    let state = make_test_state();
    let id = create_session(&state).await;

    let response = build_router(state)
        .oneshot(post_json(
            &format!("/api/sessions/{id}/actions"),
            &json!({"raw_command": "cmd:rest", "target": "workbench"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["outcome"]["weeks_advanced"], 0);
    assert_eq!(json["state"]["week"], 1);
    assert_eq!(json["state"]["workbench_feedback"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn text_and_command_together_are_ambiguous() {
    let state = make_test_state();
    let id = create_session(&state).await;

    let response = build_router(state)
        .oneshot(post_json(
            &format!("/api/sessions/{id}/actions"),
            &json!({"text": "hello", "command": {"kind": "rest"}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn resigning_blocks_until_restart() {
    let state = make_test_state();
    let id = create_session(&state).await;
    let actions = format!("/api/sessions/{id}/actions");

    let response = build_router(Arc::clone(&state))
        .oneshot(post_json(&actions, &json!({"command": {"kind": "resign"}})))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["state"]["game_over"], true);

    let response = build_router(Arc::clone(&state))
        .oneshot(post_json(&actions, &json!({"text": "one more week"})))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["outcome"]["outcome"], "blocked");
    assert_eq!(json["outcome"]["reason"], "game_over");

    let response = build_router(state)
        .oneshot(post_json(
            &format!("/api/sessions/{id}/restart"),
            &json!({"name": "Ada", "role": "Product", "project_id": "Genshin"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["session_id"], id.as_str());
    assert_eq!(json["state"]["game_over"], false);
    assert_eq!(json["state"]["week"], 1);
    assert_eq!(json["state"]["player"]["role"], "Product");
}

#[tokio::test]
async fn ack_without_event_is_a_no_op() {
    let state = make_test_state();
    let id = create_session(&state).await;

    let response = build_router(state)
        .oneshot(post_json(&format!("/api/sessions/{id}/event/ack"), &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["acknowledged"], false);
    assert!(json["state"]["active_global_event"].is_null());
}

#[tokio::test]
async fn deleted_session_is_gone() {
    let state = make_test_state();
    let id = create_session(&state).await;
    let uri = format!("/api/sessions/{id}");

    let delete = Request::builder()
        .method("DELETE")
        .uri(&uri)
        .body(Body::empty())
        .unwrap();
    let response = build_router(Arc::clone(&state)).oneshot(delete).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = build_router(Arc::clone(&state)).oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(state.session_count().await, 0);
}

#[tokio::test]
async fn streamed_action_emits_sections_then_state() {
    let state = make_test_state();
    let id = create_session(&state).await;

    let response = build_router(Arc::clone(&state))
        .oneshot(post_json(
            &format!("/api/sessions/{id}/actions/stream"),
            &json!({"text": "I fix the login crash"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();
    assert!(content_type.starts_with("text/event-stream"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let append = text.find("event: msg_append").unwrap();
    let update = text.find("event: state_update").unwrap();
    let done = text.find("event: done").unwrap();
    assert!(append < update && update < done);

    let response = build_router(state)
        .oneshot(get(&format!("/api/sessions/{id}")))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["state"]["week"], 2);
}

#[tokio::test]
async fn stream_rejects_unknown_session_before_streaming() {
    let response = build_router(make_test_state())
        .oneshot(post_json(
            "/api/sessions/0191e0a0-0000-7000-8000-000000000000/actions/stream",
            &json!({"text": "hello"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
