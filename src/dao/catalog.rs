use dashmap::DashMap;
use futures::future::BoxFuture;
use thiserror::Error;
use uuid::Uuid;

use crate::state::session::QuizSnapshot;

/// Result alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Error raised by quiz catalog lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// No quiz is registered under the requested identifier.
    #[error("quiz `{0}` not found")]
    NotFound(Uuid),
}

/// Read-only collaborator supplying immutable quiz snapshots.
///
/// Quiz authoring and storage live outside this service; the orchestrator
/// only ever reads a full snapshot once, at session creation time.
pub trait QuizCatalog: Send + Sync {
    /// Fetch the quiz with all of its questions and options.
    fn get_quiz_with_questions(&self, quiz_id: Uuid) -> BoxFuture<'static, CatalogResult<QuizSnapshot>>;
}

/// In-memory catalog implementation backed by a concurrent map.
#[derive(Default)]
pub struct InMemoryCatalog {
    quizzes: DashMap<Uuid, QuizSnapshot>,
}

impl InMemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a quiz snapshot under `quiz_id`, replacing any previous one.
    pub fn insert(&self, quiz_id: Uuid, quiz: QuizSnapshot) {
        self.quizzes.insert(quiz_id, quiz);
    }
}

impl QuizCatalog for InMemoryCatalog {
    fn get_quiz_with_questions(&self, quiz_id: Uuid) -> BoxFuture<'static, CatalogResult<QuizSnapshot>> {
        let result = self
            .quizzes
            .get(&quiz_id)
            .map(|entry| entry.value().clone())
            .ok_or(CatalogError::NotFound(quiz_id));
        Box::pin(futures::future::ready(result))
    }
}
