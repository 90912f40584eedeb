//! Session orchestration: every HTTP-triggered operation and every
//! timer-driven transition of a live trivia session.
//!
//! All mutations go through the session store's per-pin atomic update, and
//! events are broadcast while the pin's update lock is still held, so the
//! order observers see always matches the order mutations were committed.
//! Timer callbacks re-validate the phase (and question index) they expect and
//! degrade to a no-op when a stale timer slips through.

use std::time::Duration;

use rand::Rng;
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    dao::session_log::{LogEntry, LogKind},
    dto::game::{
        AnswerResult, CreateGameRequest, CreateGameResponse, JoinGameRequest, JoinGameResponse,
        LeaderboardEntry, SessionStatus, StartGameRequest, StartGameResponse, SubmitAnswerRequest,
    },
    error::ServiceError,
    services::{scoring, sse_events},
    state::{SharedState, phase::SessionPhase, session::{Player, Session}},
};

/// Create a new live session for a quiz and return the host credentials.
pub async fn create_game(
    state: &SharedState,
    request: CreateGameRequest,
) -> Result<CreateGameResponse, ServiceError> {
    let quiz = state
        .catalog()
        .get_quiz_with_questions(request.quiz_id)
        .await?;

    // The store rejects an occupied pin, so two creations racing to the same
    // candidate cannot clobber each other; the loser redraws.
    let mut session = Session::new(generate_pin(), request.quiz_id, quiz);
    while !state.sessions().insert(&session) {
        session.pin = generate_pin();
    }

    state.session_log().record(
        LogEntry::new(LogKind::GameCreated, session.id, &session.pin)
            .with_detail(json!({ "quizId": request.quiz_id })),
    );

    Ok(CreateGameResponse {
        session_id: session.id,
        pin: session.pin.clone(),
        host_token: session.host_token,
        quiz_title: session.quiz.title,
        total_questions: session.quiz.questions.len(),
    })
}

/// Join a lobby under a nickname, returning the player credentials.
pub async fn join_game(
    state: &SharedState,
    pin: &str,
    request: JoinGameRequest,
) -> Result<JoinGameResponse, ServiceError> {
    let nickname = request.nickname;
    let (player_id, player_token, session_id) = state
        .sessions()
        .atomic_update(pin, |session| {
            if session.phase != SessionPhase::Lobby {
                return Err(ServiceError::InvalidState("game already started".into()));
            }
            if session.nickname_taken(&nickname) {
                return Err(ServiceError::InvalidState("nickname already taken".into()));
            }

            let player = Player::new(nickname.clone());
            session.players.insert(player.id, player.clone());
            sse_events::broadcast_player_joined(state, pin, &player, session.players.len());
            Ok((player.id, player.token, session.id))
        })
        .await?;

    state.session_log().record(
        LogEntry::new(LogKind::PlayerJoined, session_id, pin)
            .with_detail(json!({ "playerId": player_id, "nickname": nickname })),
    );

    Ok(JoinGameResponse {
        player_id,
        player_token,
        session_id,
        pin: pin.to_string(),
    })
}

/// Start the game: move the lobby into the countdown and arm the timer that
/// will broadcast the first question.
pub async fn start_game(
    state: &SharedState,
    pin: &str,
    request: StartGameRequest,
) -> Result<StartGameResponse, ServiceError> {
    let countdown = state.config().countdown();
    let (session_id, total_players) = state
        .sessions()
        .atomic_update(pin, |session| {
            if session.host_token != request.host_token {
                return Err(ServiceError::Unauthorized("invalid host token".into()));
            }
            if session.phase != SessionPhase::Lobby {
                return Err(ServiceError::InvalidState("game already started".into()));
            }
            if session.players.is_empty() {
                return Err(ServiceError::InvalidState("no players in game".into()));
            }

            session.advance_to(SessionPhase::Countdown)?;
            sse_events::broadcast_countdown_started(state, pin, countdown.as_secs());
            Ok((session.id, session.players.len()))
        })
        .await?;

    state.session_log().record(
        LogEntry::new(LogKind::GameStarted, session_id, pin)
            .with_detail(json!({ "totalPlayers": total_players })),
    );
    schedule_question_start(state, pin, 0, countdown);

    Ok(StartGameResponse {
        status: SessionPhase::Countdown,
        total_players,
    })
}

/// Read-only snapshot of a session.
pub async fn get_status(state: &SharedState, pin: &str) -> Result<SessionStatus, ServiceError> {
    let session = state.sessions().get(pin).await.map_err(ServiceError::from)?;
    Ok(SessionStatus::from(&session))
}

/// Current ranking of a session, ties broken by join order.
pub async fn get_leaderboard(
    state: &SharedState,
    pin: &str,
) -> Result<Vec<LeaderboardEntry>, ServiceError> {
    let session = state.sessions().get(pin).await.map_err(ServiceError::from)?;
    Ok(LeaderboardEntry::ranking(&session))
}

/// Score one player's answer to the active question, exactly once per player
/// per question.
pub async fn submit_answer(
    state: &SharedState,
    pin: &str,
    request: SubmitAnswerRequest,
) -> Result<AnswerResult, ServiceError> {
    let now = Instant::now();
    let (session_id, player_id, result) = state
        .sessions()
        .atomic_update(pin, |session| {
            if session.phase != SessionPhase::Question {
                return Err(ServiceError::InvalidState("no active question".into()));
            }
            let player_id = session
                .player_id_by_token(&request.player_token)
                .ok_or_else(|| ServiceError::NotFound("player not found".into()))?;

            let question = session
                .active_question()
                .ok_or_else(|| ServiceError::Internal("question phase without a question".into()))?;
            if question.id != request.question_id {
                return Err(ServiceError::InvalidState(
                    "question is not the active one".into(),
                ));
            }
            if session.answered.contains(&player_id) {
                return Err(ServiceError::InvalidState(
                    "already answered this question".into(),
                ));
            }

            let started_at = session.question_started_at.ok_or_else(|| {
                ServiceError::Internal("question phase without a start instant".into())
            })?;
            let elapsed_ms = now.saturating_duration_since(started_at).as_millis() as u64;
            let elapsed_ms = elapsed_ms.min(question.time_limit_ms());
            let scored = scoring::score(question, request.option_id, elapsed_ms)?;

            session.answered.insert(player_id);
            let player = session.players.get_mut(&player_id).ok_or_else(|| {
                ServiceError::Internal("answer ledger references unknown player".into())
            })?;
            player.score += scored.points;

            let result = AnswerResult {
                is_correct: scored.is_correct,
                points: scored.points,
                total_score: player.score,
                time_spent: elapsed_ms,
            };
            let nickname = player.nickname.clone();
            sse_events::broadcast_player_answered(state, pin, player_id, &nickname);
            Ok((session.id, player_id, result))
        })
        .await?;

    state.session_log().record(
        LogEntry::new(LogKind::AnswerSubmitted, session_id, pin).with_detail(json!({
            "playerId": player_id,
            "questionId": request.question_id,
            "optionId": request.option_id,
            "isCorrect": result.is_correct,
            "points": result.points,
            "timeSpent": result.time_spent,
        })),
    );

    Ok(result)
}

enum QuestionStart {
    Started { session_id: Uuid, question_id: Uuid, time_limit: Duration },
    Exhausted,
    Stale(SessionPhase),
}

/// Timer-invoked: broadcast question `index` and arm the end-of-question
/// timer, or end the game when the quiz is exhausted.
pub async fn start_question(
    state: &SharedState,
    pin: &str,
    index: usize,
) -> Result<(), ServiceError> {
    let outcome = state
        .sessions()
        .atomic_update::<_, ServiceError, _>(pin, |session| {
            if index >= session.total_questions() {
                return Ok(QuestionStart::Exhausted);
            }

            let expected = (session.phase == SessionPhase::Countdown && index == 0)
                || (session.phase == SessionPhase::Leaderboard
                    && index == session.current_question + 1);
            if !expected {
                return Ok(QuestionStart::Stale(session.phase));
            }

            session.advance_to(SessionPhase::Question)?;
            session.current_question = index;
            session.question_started_at = Some(Instant::now());
            session.answered.clear();

            let question = session.quiz.questions[index].clone();
            sse_events::broadcast_question_started(
                state,
                pin,
                index + 1,
                session.total_questions(),
                &question,
            );
            Ok(QuestionStart::Started {
                session_id: session.id,
                question_id: question.id,
                time_limit: Duration::from_secs(question.time_limit_secs),
            })
        })
        .await?;

    match outcome {
        QuestionStart::Started {
            session_id,
            question_id,
            time_limit,
        } => {
            state.session_log().record(
                LogEntry::new(LogKind::QuestionStarted, session_id, pin)
                    .with_detail(json!({ "questionNumber": index + 1, "questionId": question_id })),
            );
            schedule_question_end(state, pin, index, time_limit);
            Ok(())
        }
        QuestionStart::Exhausted => end_game(state, pin).await,
        QuestionStart::Stale(phase) => {
            debug!(%pin, ?phase, index, "stale question-start timer ignored");
            Ok(())
        }
    }
}

enum QuestionEnd {
    Ended { session_id: Uuid, question_id: Uuid },
    Stale(SessionPhase),
}

/// Timer-invoked: close question `index`, reveal the correct option, and arm
/// the leaderboard timer.
pub async fn end_question(state: &SharedState, pin: &str, index: usize) -> Result<(), ServiceError> {
    let results_delay = state.config().results_delay();
    let outcome = state
        .sessions()
        .atomic_update::<_, ServiceError, _>(pin, |session| {
            if session.phase != SessionPhase::Question || session.current_question != index {
                return Ok(QuestionEnd::Stale(session.phase));
            }

            session.advance_to(SessionPhase::Results)?;
            session.question_started_at = None;

            let question = session
                .quiz
                .questions
                .get(index)
                .ok_or_else(|| ServiceError::Internal("active question out of range".into()))?;
            let correct = question
                .correct_option()
                .ok_or_else(|| ServiceError::Internal("question has no correct option".into()))?;
            sse_events::broadcast_question_ended(state, pin, index + 1, correct);
            Ok(QuestionEnd::Ended {
                session_id: session.id,
                question_id: question.id,
            })
        })
        .await?;

    match outcome {
        QuestionEnd::Ended {
            session_id,
            question_id,
        } => {
            state.session_log().record(
                LogEntry::new(LogKind::QuestionEnded, session_id, pin)
                    .with_detail(json!({ "questionNumber": index + 1, "questionId": question_id })),
            );
            schedule_leaderboard(state, pin, index, results_delay);
            Ok(())
        }
        QuestionEnd::Stale(phase) => {
            debug!(%pin, ?phase, index, "stale question-end timer ignored");
            Ok(())
        }
    }
}

enum LeaderboardShow {
    Shown { session_id: Uuid, has_more: bool },
    Stale(SessionPhase),
}

/// Timer-invoked: broadcast the standings after question `index` and arm the
/// timer for the next question or the end of the game.
pub async fn show_leaderboard(
    state: &SharedState,
    pin: &str,
    index: usize,
) -> Result<(), ServiceError> {
    let hold = state.config().leaderboard_delay();
    let outcome = state
        .sessions()
        .atomic_update::<_, ServiceError, _>(pin, |session| {
            if session.phase != SessionPhase::Results || session.current_question != index {
                return Ok(LeaderboardShow::Stale(session.phase));
            }

            session.advance_to(SessionPhase::Leaderboard)?;
            let entries = LeaderboardEntry::ranking(session);
            sse_events::broadcast_leaderboard(state, pin, &entries);
            Ok(LeaderboardShow::Shown {
                session_id: session.id,
                has_more: index + 1 < session.total_questions(),
            })
        })
        .await?;

    match outcome {
        LeaderboardShow::Shown {
            session_id,
            has_more,
        } => {
            state.session_log().record(
                LogEntry::new(LogKind::LeaderboardShown, session_id, pin)
                    .with_detail(json!({ "questionNumber": index + 1 })),
            );
            if has_more {
                schedule_question_start(state, pin, index + 1, hold);
            } else {
                schedule_game_end(state, pin, hold);
            }
            Ok(())
        }
        LeaderboardShow::Stale(phase) => {
            debug!(%pin, ?phase, index, "stale leaderboard timer ignored");
            Ok(())
        }
    }
}

/// Move the session to its terminal phase, broadcast the final standings, and
/// drop any pending timer. Safe to invoke against an already ended session.
pub async fn end_game(state: &SharedState, pin: &str) -> Result<(), ServiceError> {
    let outcome = state
        .sessions()
        .atomic_update::<_, ServiceError, _>(pin, |session| {
            if session.phase.is_terminal() {
                return Ok(None);
            }

            session.advance_to(SessionPhase::Ended)?;
            session.question_started_at = None;
            let entries = LeaderboardEntry::ranking(session);
            sse_events::broadcast_game_ended(state, pin, &entries);
            Ok(Some((session.id, entries.into_iter().next())))
        })
        .await?;

    let Some((session_id, winner)) = outcome else {
        debug!(%pin, "end-game invoked against an already ended session");
        return Ok(());
    };

    state.scheduler().cancel(pin);
    state.session_log().record(
        LogEntry::new(LogKind::GameEnded, session_id, pin)
            .with_detail(json!({ "winner": winner.map(|entry| entry.nickname) })),
    );
    Ok(())
}

fn schedule_question_start(state: &SharedState, pin: &str, index: usize, delay: Duration) {
    let task_state = state.clone();
    let task_pin = pin.to_string();
    state.scheduler().schedule(pin, delay, async move {
        if let Err(err) = start_question(&task_state, &task_pin, index).await {
            report_timer_failure(&task_state, &task_pin, "start the next question", &err);
        }
    });
}

fn schedule_question_end(state: &SharedState, pin: &str, index: usize, delay: Duration) {
    let task_state = state.clone();
    let task_pin = pin.to_string();
    state.scheduler().schedule(pin, delay, async move {
        if let Err(err) = end_question(&task_state, &task_pin, index).await {
            report_timer_failure(&task_state, &task_pin, "close the question", &err);
        }
    });
}

fn schedule_leaderboard(state: &SharedState, pin: &str, index: usize, delay: Duration) {
    let task_state = state.clone();
    let task_pin = pin.to_string();
    state.scheduler().schedule(pin, delay, async move {
        if let Err(err) = show_leaderboard(&task_state, &task_pin, index).await {
            report_timer_failure(&task_state, &task_pin, "show the leaderboard", &err);
        }
    });
}

fn schedule_game_end(state: &SharedState, pin: &str, delay: Duration) {
    let task_state = state.clone();
    let task_pin = pin.to_string();
    state.scheduler().schedule(pin, delay, async move {
        if let Err(err) = end_game(&task_state, &task_pin).await {
            report_timer_failure(&task_state, &task_pin, "end the game", &err);
        }
    });
}

/// A timer has no caller to report to: log the failure and push a best-effort
/// error event to observers so the session does not stall silently.
fn report_timer_failure(state: &SharedState, pin: &str, what: &str, err: &ServiceError) {
    match err {
        ServiceError::NotFound(_) => {
            debug!(%pin, error = %err, "timer fired for a session that no longer exists");
        }
        _ => {
            warn!(%pin, error = %err, "timer-driven transition failed");
            sse_events::broadcast_game_error(state, pin, &format!("failed to {what}"));
        }
    }
}

/// Generate a candidate six-digit join code.
fn generate_pin() -> String {
    rand::rng().random_range(100_000..=999_999).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pins_are_six_digits() {
        for _ in 0..1000 {
            let pin = generate_pin();
            assert_eq!(pin.len(), 6);
            assert!(pin.chars().all(|c| c.is_ascii_digit()));
            assert_ne!(pin.chars().next(), Some('0'));
        }
    }
}
