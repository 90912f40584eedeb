use std::collections::HashSet;
use std::time::SystemTime;

use indexmap::IndexMap;
use tokio::time::Instant;
use uuid::Uuid;

use crate::state::phase::{InvalidTransition, SessionPhase};

/// Read-only quiz content fetched from the catalog and cached on the session.
#[derive(Debug, Clone)]
pub struct QuizSnapshot {
    /// Display title of the quiz.
    pub title: String,
    /// Questions in play order.
    pub questions: Vec<QuestionSnapshot>,
}

/// One question with its answer options.
#[derive(Debug, Clone)]
pub struct QuestionSnapshot {
    /// Stable identifier for the question.
    pub id: Uuid,
    /// The question text shown to players.
    pub text: String,
    /// Seconds players have to answer once the question is broadcast.
    pub time_limit_secs: u64,
    /// Answer options in display order. Exactly one is correct; the authoring
    /// flow upstream guarantees this.
    pub options: Vec<OptionSnapshot>,
}

impl QuestionSnapshot {
    /// Time limit in milliseconds, the unit the scoring formula works in.
    pub fn time_limit_ms(&self) -> u64 {
        self.time_limit_secs * 1000
    }

    /// Look up one of this question's options by id.
    pub fn option(&self, option_id: Uuid) -> Option<&OptionSnapshot> {
        self.options.iter().find(|opt| opt.id == option_id)
    }

    /// The option marked correct.
    pub fn correct_option(&self) -> Option<&OptionSnapshot> {
        self.options.iter().find(|opt| opt.is_correct)
    }
}

/// A single answer option of a question.
#[derive(Debug, Clone)]
pub struct OptionSnapshot {
    /// Stable identifier for the option.
    pub id: Uuid,
    /// Text shown to players.
    pub text: String,
    /// Display position within the question.
    pub order: u32,
    /// Whether picking this option scores. Never serialized to players while
    /// the question is open.
    pub is_correct: bool,
}

/// One participant of a session.
#[derive(Debug, Clone)]
pub struct Player {
    /// Stable identifier for the player.
    pub id: Uuid,
    /// Display name, unique (case-sensitive) within one session.
    pub nickname: String,
    /// Capability credential proving the caller may act as this player.
    pub token: String,
    /// Accumulated score; only ever increases.
    pub score: u32,
    /// Join timestamp, also the leaderboard tie-breaker.
    pub joined_at: SystemTime,
}

impl Player {
    /// Create a fresh player with a zero score and a new capability token.
    pub fn new(nickname: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            nickname,
            token: format!("player_{}", Uuid::new_v4()),
            score: 0,
            joined_at: SystemTime::now(),
        }
    }
}

/// One live run of a quiz, from lobby to end.
#[derive(Debug, Clone)]
pub struct Session {
    /// Stable identifier for the session.
    pub id: Uuid,
    /// Six-digit join code, unique among live sessions.
    pub pin: String,
    /// Identifier of the quiz this session plays.
    pub quiz_id: Uuid,
    /// Capability credential for host-only actions.
    pub host_token: String,
    /// Quiz content cached at creation time.
    pub quiz: QuizSnapshot,
    /// Current lifecycle phase.
    pub phase: SessionPhase,
    /// Index of the active (or most recent) question. Only advances forward.
    pub current_question: usize,
    /// Instant the active question was broadcast; set only while in
    /// [`SessionPhase::Question`].
    pub question_started_at: Option<Instant>,
    /// Players keyed by id; insertion order is join order.
    pub players: IndexMap<Uuid, Player>,
    /// Players that already answered the active question. Cleared whenever a
    /// new question starts.
    pub answered: HashSet<Uuid>,
    /// Creation timestamp for auditing.
    pub created_at: SystemTime,
}

impl Session {
    /// Build a new session in the lobby phase with a fresh host token.
    pub fn new(pin: String, quiz_id: Uuid, quiz: QuizSnapshot) -> Self {
        Self {
            id: Uuid::new_v4(),
            pin,
            quiz_id,
            host_token: format!("host_{}", Uuid::new_v4()),
            quiz,
            phase: SessionPhase::Lobby,
            current_question: 0,
            question_started_at: None,
            players: IndexMap::new(),
            answered: HashSet::new(),
            created_at: SystemTime::now(),
        }
    }

    /// Move the session to `next`, rejecting edges the lifecycle does not define.
    pub fn advance_to(&mut self, next: SessionPhase) -> Result<(), InvalidTransition> {
        self.phase = self.phase.advance(next)?;
        Ok(())
    }

    /// Number of questions in the cached quiz.
    pub fn total_questions(&self) -> usize {
        self.quiz.questions.len()
    }

    /// The question currently open for answers, if any.
    pub fn active_question(&self) -> Option<&QuestionSnapshot> {
        if self.phase == SessionPhase::Question {
            self.quiz.questions.get(self.current_question)
        } else {
            None
        }
    }

    /// Resolve a player token to the player's id.
    pub fn player_id_by_token(&self, token: &str) -> Option<Uuid> {
        self.players
            .values()
            .find(|player| player.token == token)
            .map(|player| player.id)
    }

    /// Whether `nickname` is already taken in this session (case-sensitive).
    pub fn nickname_taken(&self, nickname: &str) -> bool {
        self.players
            .values()
            .any(|player| player.nickname == nickname)
    }

    /// Players ordered by score descending. Equal scores keep join order, so
    /// the earlier joiner ranks higher.
    pub fn ranked_players(&self) -> Vec<&Player> {
        let mut ranked: Vec<&Player> = self.players.values().collect();
        ranked.sort_by_key(|player| std::cmp::Reverse(player.score));
        ranked
    }
}
