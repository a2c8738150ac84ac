//! Session API server for the Cubicle simulation.
//!
//! This crate provides an Axum HTTP server that exposes the session
//! surface to the browser client:
//!
//! - **REST endpoints** to create, read, restart, and delete sessions,
//!   submit actions, and acknowledge global events
//! - **SSE endpoint** (`/api/sessions/{id}/actions/stream`) that streams
//!   narrator sections while an action is processed
//!
//! # Architecture
//!
//! Sessions live in memory inside [`AppState`]. Each one is guarded by
//! its own mutex, so all mutations from one action finish before the
//! next action against the same session starts. The server is generic
//! over the [`Narrator`](cubicle_core::narrator::Narrator) it hands to
//! sessions.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod stream;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
