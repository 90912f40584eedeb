//! Shared application state: the session store, per-session fan-out hubs,
//! the transition scheduler, and external collaborators.

pub mod phase;
pub mod session;
mod sse;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    dao::{
        catalog::{InMemoryCatalog, QuizCatalog},
        session_log::{SessionLog, TracingSessionLog},
        session_store::SessionStore,
    },
    services::scheduler::Scheduler,
};

pub use self::sse::{SseHub, SseState};

/// Cheaply clonable handle to the central application state.
pub type SharedState = Arc<AppState>;

/// Central application state composing the store, event fan-out, scheduler,
/// and external collaborators.
pub struct AppState {
    config: AppConfig,
    catalog: Arc<dyn QuizCatalog>,
    sessions: SessionStore,
    sse: SseState,
    scheduler: Scheduler,
    session_log: Arc<dyn SessionLog>,
}

impl AppState {
    /// Construct a new [`AppState`] with default collaborators, wrapped in an
    /// [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig) -> SharedState {
        Self::with_collaborators(config, Arc::new(InMemoryCatalog::new()), Arc::new(TracingSessionLog))
    }

    /// Construct state with explicit external collaborators. Tests use this to
    /// seed the catalog and capture the audit log.
    pub fn with_collaborators(
        config: AppConfig,
        catalog: Arc<dyn QuizCatalog>,
        session_log: Arc<dyn SessionLog>,
    ) -> SharedState {
        Arc::new(Self {
            sessions: SessionStore::new(config.session_ttl()),
            sse: SseState::new(64),
            scheduler: Scheduler::new(),
            config,
            catalog,
            session_log,
        })
    }

    /// Runtime timing and retention configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Read-only quiz catalog collaborator.
    pub fn catalog(&self) -> &dyn QuizCatalog {
        self.catalog.as_ref()
    }

    /// Authoritative store of live sessions.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Per-session event fan-out hubs.
    pub fn sse(&self) -> &SseState {
        &self.sse
    }

    /// Per-session delayed transition scheduler.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Best-effort lifecycle audit sink.
    pub fn session_log(&self) -> &dyn SessionLog {
        self.session_log.as_ref()
    }
}
