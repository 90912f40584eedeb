//! Typed lifecycle events and the helpers that fan them out to a session's
//! observers.

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::{
        format_system_time,
        game::LeaderboardEntry,
        sse::{
            ConnectedEvent, CorrectAnswer, CountdownStartedEvent, GameEndedEvent, GameErrorEvent,
            JoinedPlayer, LeaderboardEvent, PlayerAnsweredEvent, PlayerJoinedEvent, PublicQuestion,
            QuestionEndedEvent, QuestionStartedEvent, ServerEvent,
        },
    },
    state::{
        SharedState,
        session::{OptionSnapshot, Player, QuestionSnapshot},
    },
};

const EVENT_CONNECTED: &str = "connected";
const EVENT_PLAYER_JOINED: &str = "player_joined";
const EVENT_COUNTDOWN_STARTED: &str = "countdown_started";
const EVENT_QUESTION_STARTED: &str = "question_started";
const EVENT_PLAYER_ANSWERED: &str = "player_answered";
const EVENT_QUESTION_ENDED: &str = "question_ended";
const EVENT_LEADERBOARD: &str = "leaderboard";
const EVENT_GAME_ENDED: &str = "game_ended";
const EVENT_GAME_ERROR: &str = "game_error";

/// Synthetic handshake handed to a freshly subscribed observer. Built directly
/// instead of broadcast so it reaches only the new subscriber.
pub fn connected_event(pin: &str) -> Option<ServerEvent> {
    ServerEvent::json(
        Some(EVENT_CONNECTED.to_string()),
        &ConnectedEvent {
            pin: pin.to_string(),
        },
    )
    .ok()
}

/// Broadcast that a player entered the lobby.
pub fn broadcast_player_joined(state: &SharedState, pin: &str, player: &Player, total_players: usize) {
    let payload = PlayerJoinedEvent {
        player: JoinedPlayer {
            player_id: player.id,
            nickname: player.nickname.clone(),
            joined_at: format_system_time(player.joined_at),
        },
        total_players,
    };
    send_event(state, pin, EVENT_PLAYER_JOINED, &payload);
}

/// Broadcast that the pre-question countdown began.
pub fn broadcast_countdown_started(state: &SharedState, pin: &str, countdown_secs: u64) {
    let payload = CountdownStartedEvent {
        countdown: countdown_secs,
    };
    send_event(state, pin, EVENT_COUNTDOWN_STARTED, &payload);
}

/// Broadcast a question opening for answers, with correctness stripped.
pub fn broadcast_question_started(
    state: &SharedState,
    pin: &str,
    question_number: usize,
    total_questions: usize,
    question: &QuestionSnapshot,
) {
    let payload = QuestionStartedEvent {
        question_number,
        total_questions,
        question: PublicQuestion::from(question),
    };
    send_event(state, pin, EVENT_QUESTION_STARTED, &payload);
}

/// Broadcast that a player locked in an answer. Identity only.
pub fn broadcast_player_answered(state: &SharedState, pin: &str, player_id: Uuid, nickname: &str) {
    let payload = PlayerAnsweredEvent {
        player_id,
        nickname: nickname.to_string(),
    };
    send_event(state, pin, EVENT_PLAYER_ANSWERED, &payload);
}

/// Broadcast a question closing, revealing the correct option.
pub fn broadcast_question_ended(
    state: &SharedState,
    pin: &str,
    question_number: usize,
    correct: &OptionSnapshot,
) {
    let payload = QuestionEndedEvent {
        question_number,
        correct_answer: CorrectAnswer {
            option_id: correct.id,
            text: correct.text.clone(),
            order: correct.order,
        },
    };
    send_event(state, pin, EVENT_QUESTION_ENDED, &payload);
}

/// Broadcast the standings between questions.
pub fn broadcast_leaderboard(state: &SharedState, pin: &str, entries: &[LeaderboardEntry]) {
    let payload = LeaderboardEvent {
        leaderboard: entries.to_vec(),
    };
    send_event(state, pin, EVENT_LEADERBOARD, &payload);
}

/// Broadcast the final standings and the winner once the session ends.
pub fn broadcast_game_ended(state: &SharedState, pin: &str, entries: &[LeaderboardEntry]) {
    let payload = GameEndedEvent {
        winner: entries.first().cloned(),
        final_leaderboard: entries.to_vec(),
    };
    send_event(state, pin, EVENT_GAME_ENDED, &payload);
}

/// Broadcast a best-effort failure signal for a timer-driven transition.
pub fn broadcast_game_error(state: &SharedState, pin: &str, message: &str) {
    let payload = GameErrorEvent {
        message: message.to_string(),
    };
    send_event(state, pin, EVENT_GAME_ERROR, &payload);
}

fn send_event(state: &SharedState, pin: &str, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.sse().broadcast(pin, event),
        Err(err) => warn!(%pin, event, error = %err, "failed to serialize SSE payload"),
    }
}
