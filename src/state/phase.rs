use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Lifecycle phase of a live session.
///
/// The only edges a session may follow are
/// `Lobby → Countdown → Question → Results → Leaderboard → (Question | Ended)`,
/// plus a jump to `Ended` from any non-terminal phase when the game is cut
/// short. `Lobby` is initial, `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    /// Players can join; the host has not started the game yet.
    Lobby,
    /// Short countdown before the first question is broadcast.
    Countdown,
    /// A question is open for answers until its time limit elapses.
    Question,
    /// The correct answer is being revealed.
    Results,
    /// Standings are displayed between questions.
    Leaderboard,
    /// Terminal phase; the session accepts no further mutation.
    Ended,
}

/// Error returned when a session is asked to move along an edge the lifecycle
/// does not define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: cannot move from {from:?} to {to:?}")]
pub struct InvalidTransition {
    /// Phase the session was in when the transition was requested.
    pub from: SessionPhase,
    /// Phase the transition would have moved the session to.
    pub to: SessionPhase,
}

impl SessionPhase {
    /// Whether the lifecycle defines an edge from `self` to `next`.
    pub fn can_advance(self, next: SessionPhase) -> bool {
        use SessionPhase::*;

        matches!(
            (self, next),
            (Lobby, Countdown)
                | (Countdown, Question)
                | (Question, Results)
                | (Results, Leaderboard)
                | (Leaderboard, Question)
                | (Lobby | Countdown | Question | Results | Leaderboard, Ended)
        )
    }

    /// Validate the edge to `next`, returning the new phase on success.
    pub fn advance(self, next: SessionPhase) -> Result<SessionPhase, InvalidTransition> {
        if self.can_advance(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// True once the session has reached its terminal phase.
    pub fn is_terminal(self) -> bool {
        self == SessionPhase::Ended
    }
}
