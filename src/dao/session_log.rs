use std::time::SystemTime;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Lifecycle milestone kinds recorded to the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    /// A session was created.
    GameCreated,
    /// A player joined a lobby.
    PlayerJoined,
    /// The host started the game.
    GameStarted,
    /// A question was broadcast.
    QuestionStarted,
    /// A player submitted an answer.
    AnswerSubmitted,
    /// A question closed.
    QuestionEnded,
    /// Standings were broadcast.
    LeaderboardShown,
    /// The session reached its terminal phase.
    GameEnded,
}

/// One audit record for a lifecycle milestone.
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Milestone kind.
    pub kind: LogKind,
    /// Identifier of the session the milestone belongs to.
    pub session_id: Uuid,
    /// Join code of the session.
    pub pin: String,
    /// Wall-clock time the milestone was recorded.
    pub at: SystemTime,
    /// Milestone-specific detail payload.
    pub detail: Value,
}

impl LogEntry {
    /// Build an entry with an empty detail payload.
    pub fn new(kind: LogKind, session_id: Uuid, pin: &str) -> Self {
        Self {
            kind,
            session_id,
            pin: pin.to_string(),
            at: SystemTime::now(),
            detail: Value::Null,
        }
    }

    /// Attach a detail payload to the entry.
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = detail;
        self
    }
}

/// Best-effort durable record of lifecycle milestones.
///
/// Writes are fire-and-forget: `record` never awaits, never fails, and never
/// blocks the orchestrator's critical path.
pub trait SessionLog: Send + Sync {
    /// Record one milestone.
    fn record(&self, entry: LogEntry);
}

/// Default sink that emits each milestone as a structured tracing record.
pub struct TracingSessionLog;

impl SessionLog for TracingSessionLog {
    fn record(&self, entry: LogEntry) {
        info!(
            target: "session_log",
            kind = ?entry.kind,
            session_id = %entry.session_id,
            pin = %entry.pin,
            detail = %entry.detail,
            "session milestone"
        );
    }
}

/// Sink that forwards entries onto an unbounded channel; used by tests to
/// assert on the milestone sequence.
pub struct ChannelSessionLog {
    tx: mpsc::UnboundedSender<LogEntry>,
}

impl ChannelSessionLog {
    /// Create the sink together with the receiving half.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<LogEntry>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SessionLog for ChannelSessionLog {
    fn record(&self, entry: LogEntry) {
        // A closed receiver just means nobody is auditing; never an error.
        let _ = self.tx.send(entry);
    }
}
