//! Shared application state for the session API.
//!
//! Each session sits behind its own [`Mutex`], so actions against one
//! session are serialized while different sessions proceed in parallel.
//! The outer [`RwLock`] only guards the session table itself.

use std::collections::HashMap;
use std::sync::Arc;

use cubicle_core::catalog::Catalog;
use cubicle_core::config::EngineConfig;
use cubicle_core::session::Session;
use cubicle_types::SessionId;
use tokio::sync::{Mutex, RwLock};

/// A session shared between concurrent requests.
pub type SharedSession = Arc<Mutex<Session>>;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
pub struct AppState<N> {
    /// Live sessions keyed by ID.
    pub sessions: RwLock<HashMap<SessionId, SharedSession>>,
    /// Content tables shared by every session.
    pub catalog: Arc<Catalog>,
    /// Configuration handed to new sessions.
    pub config: EngineConfig,
    /// Dialogue collaborator.
    pub narrator: Arc<N>,
}

impl<N> AppState<N> {
    /// Create an application state with no sessions.
    pub fn new(catalog: Arc<Catalog>, config: EngineConfig, narrator: Arc<N>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            catalog,
            config,
            narrator,
        }
    }

    /// Look up a session.
    pub async fn session(&self, id: SessionId) -> Option<SharedSession> {
        self.sessions.read().await.get(&id).map(Arc::clone)
    }

    /// Register a session and return its ID.
    pub async fn insert(&self, session: Session) -> SessionId {
        let id = SessionId::new();
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
        id
    }

    /// Drop a session. Returns whether it existed.
    pub async fn remove(&self, id: SessionId) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
