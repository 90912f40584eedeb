use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{format_system_time, validation::validate_nickname},
    state::{
        phase::SessionPhase,
        session::{Player, Session},
    },
};

/// Payload used to create a new live session for an existing quiz.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    /// Identifier of the quiz to play.
    pub quiz_id: Uuid,
}

/// Credentials and metadata returned to the host after session creation.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameResponse {
    /// Identifier of the created session.
    pub session_id: Uuid,
    /// Six-digit join code players use to enter the lobby.
    pub pin: String,
    /// Capability token for host-only operations. Shown once; keep it secret.
    pub host_token: String,
    /// Title of the quiz being played.
    pub quiz_title: String,
    /// Number of questions the session will run through.
    pub total_questions: usize,
}

/// Payload sent by a player joining a lobby.
#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinGameRequest {
    /// Display name, unique within the session.
    pub nickname: String,
}

impl Validate for JoinGameRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(err) = validate_nickname(&self.nickname) {
            errors.add("nickname", err);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Credentials returned to a player that joined a lobby.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameResponse {
    /// Identifier assigned to the player.
    pub player_id: Uuid,
    /// Capability token for player-only operations.
    pub player_token: String,
    /// Identifier of the joined session.
    pub session_id: Uuid,
    /// Join code of the session, echoed back for convenience.
    pub pin: String,
}

/// Payload sent by the host to start the game.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartGameRequest {
    /// Host capability token issued at creation time.
    pub host_token: String,
}

/// Acknowledgement returned to the host once the countdown begins.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartGameResponse {
    /// Phase the session moved to.
    pub status: SessionPhase,
    /// Number of players locked in for this run.
    pub total_players: usize,
}

/// Payload sent by a player answering the active question.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    /// Player capability token issued when joining.
    pub player_token: String,
    /// Identifier of the question being answered; must be the active one.
    pub question_id: Uuid,
    /// Identifier of the chosen option.
    pub option_id: Uuid,
}

/// Private scoring result returned only to the answering player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    /// Whether the chosen option was the correct one.
    pub is_correct: bool,
    /// Points awarded for this answer.
    pub points: u32,
    /// Player's total score after this answer.
    pub total_score: u32,
    /// Milliseconds elapsed between question start and this answer, clamped
    /// to the question's time limit.
    pub time_spent: u64,
}

/// One row of a ranked leaderboard.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// 1-based rank; contiguous and unique.
    pub rank: usize,
    /// Identifier of the ranked player.
    pub player_id: Uuid,
    /// Display name of the ranked player.
    pub nickname: String,
    /// Score at ranking time.
    pub score: u32,
}

impl LeaderboardEntry {
    /// Build the ranked rows for a session, ties broken by join order.
    pub fn ranking(session: &Session) -> Vec<Self> {
        session
            .ranked_players()
            .into_iter()
            .enumerate()
            .map(|(index, player)| Self {
                rank: index + 1,
                player_id: player.id,
                nickname: player.nickname.clone(),
                score: player.score,
            })
            .collect()
    }
}

/// Public projection of a player exposed in status snapshots.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    /// Identifier of the player.
    pub player_id: Uuid,
    /// Display name.
    pub nickname: String,
    /// Current score.
    pub score: u32,
    /// RFC 3339 join timestamp.
    pub joined_at: String,
}

impl From<&Player> for PlayerSummary {
    fn from(player: &Player) -> Self {
        Self {
            player_id: player.id,
            nickname: player.nickname.clone(),
            score: player.score,
            joined_at: format_system_time(player.joined_at),
        }
    }
}

/// Read-only snapshot of a session returned by the status endpoint.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// Identifier of the session.
    pub session_id: Uuid,
    /// Join code of the session.
    pub pin: String,
    /// Title of the quiz being played.
    pub quiz_title: String,
    /// Current lifecycle phase.
    pub status: SessionPhase,
    /// 1-based number of the active (or most recent) question.
    pub question_number: usize,
    /// Number of questions in the quiz.
    pub total_questions: usize,
    /// Players in join order.
    pub players: Vec<PlayerSummary>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

impl From<&Session> for SessionStatus {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id,
            pin: session.pin.clone(),
            quiz_title: session.quiz.title.clone(),
            status: session.phase,
            question_number: session.current_question + 1,
            total_questions: session.total_questions(),
            players: session.players.values().map(PlayerSummary::from).collect(),
            created_at: format_system_time(session.created_at),
        }
    }
}
