use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::game::LeaderboardEntry,
    state::session::{OptionSnapshot, QuestionSnapshot},
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across per-session SSE channels.
pub struct ServerEvent {
    /// SSE event name, if any.
    pub event: Option<String>,
    /// Serialized JSON data field.
    pub data: String,
}

impl ServerEvent {
    /// Build an event from an already serialized data string.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Synthetic handshake sent to an observer right after subscribing.
pub struct ConnectedEvent {
    /// Join code of the observed session.
    pub pin: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Identity of a player as carried in the join broadcast.
pub struct JoinedPlayer {
    /// Identifier of the player.
    pub player_id: Uuid,
    /// Display name of the player.
    pub nickname: String,
    /// RFC 3339 join timestamp.
    pub joined_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast when a player enters the lobby.
pub struct PlayerJoinedEvent {
    /// The player that joined.
    pub player: JoinedPlayer,
    /// Lobby size after the join.
    pub total_players: usize,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast when the host starts the game.
pub struct CountdownStartedEvent {
    /// Seconds until the first question is broadcast.
    pub countdown: u64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Answer option as shown to players while a question is open. Carries no
/// correctness flag.
pub struct PublicOption {
    /// Identifier of the option.
    pub id: Uuid,
    /// Text shown to players.
    pub text: String,
    /// Display position.
    pub order: u32,
}

impl From<&OptionSnapshot> for PublicOption {
    fn from(option: &OptionSnapshot) -> Self {
        Self {
            id: option.id,
            text: option.text.clone(),
            order: option.order,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Question as shown to players while open for answers.
pub struct PublicQuestion {
    /// Identifier of the question.
    pub id: Uuid,
    /// Question text.
    pub question: String,
    /// Seconds players have to answer.
    pub time_limit: u64,
    /// Options in display order, without correctness.
    pub options: Vec<PublicOption>,
}

impl From<&QuestionSnapshot> for PublicQuestion {
    fn from(question: &QuestionSnapshot) -> Self {
        Self {
            id: question.id,
            question: question.text.clone(),
            time_limit: question.time_limit_secs,
            options: question.options.iter().map(PublicOption::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast when a question opens for answers.
pub struct QuestionStartedEvent {
    /// 1-based number of the question.
    pub question_number: usize,
    /// Number of questions in the quiz.
    pub total_questions: usize,
    /// The question content, correctness stripped.
    pub question: PublicQuestion,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast when a player locks in an answer. Identity only; correctness and
/// score stay private to the answering player.
pub struct PlayerAnsweredEvent {
    /// Identifier of the player that answered.
    pub player_id: Uuid,
    /// Display name of the player that answered.
    pub nickname: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// The revealed correct option of a closed question.
pub struct CorrectAnswer {
    /// Identifier of the correct option.
    pub option_id: Uuid,
    /// Text of the correct option.
    pub text: String,
    /// Display position of the correct option.
    pub order: u32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast when a question's time limit elapses.
pub struct QuestionEndedEvent {
    /// 1-based number of the closed question.
    pub question_number: usize,
    /// The correct option, revealed to everyone.
    pub correct_answer: CorrectAnswer,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast between questions with the current standings.
pub struct LeaderboardEvent {
    /// Ranked rows, score descending.
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast once when the session reaches its terminal phase.
pub struct GameEndedEvent {
    /// The top-ranked player, absent only for a session that ends with no
    /// players.
    pub winner: Option<LeaderboardEntry>,
    /// Final standings.
    pub final_leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Best-effort signal that a timer-driven transition failed. Observers should
/// treat the session as stalled.
pub struct GameErrorEvent {
    /// Human-readable description of the failure.
    pub message: String,
}
