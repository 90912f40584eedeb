//! End-to-end session lifecycle tests driven through the service layer with a
//! paused clock, so every timer fires deterministically.

use std::{sync::Arc, time::Duration};

use tokio::sync::{broadcast::error::TryRecvError, mpsc};
use uuid::Uuid;

use quiz_blitz_back::{
    config::AppConfig,
    dao::{
        catalog::InMemoryCatalog,
        session_log::{ChannelSessionLog, LogEntry, LogKind},
    },
    dto::{
        game::{CreateGameRequest, JoinGameRequest, StartGameRequest, SubmitAnswerRequest},
        sse::ServerEvent,
    },
    error::ServiceError,
    services::game_service,
    state::{
        AppState, SharedState,
        phase::SessionPhase,
        session::{OptionSnapshot, QuestionSnapshot, QuizSnapshot},
    },
};

/// Quiz with `count` questions, each with one correct and one wrong option and
/// a 20 second limit.
fn quiz(count: usize) -> QuizSnapshot {
    QuizSnapshot {
        title: "Flags of the World".into(),
        questions: (0..count)
            .map(|number| QuestionSnapshot {
                id: Uuid::new_v4(),
                text: format!("Question {}", number + 1),
                time_limit_secs: 20,
                options: vec![
                    OptionSnapshot {
                        id: Uuid::new_v4(),
                        text: "Right".into(),
                        order: 0,
                        is_correct: true,
                    },
                    OptionSnapshot {
                        id: Uuid::new_v4(),
                        text: "Wrong".into(),
                        order: 1,
                        is_correct: false,
                    },
                ],
            })
            .collect(),
    }
}

fn test_state(quiz: QuizSnapshot) -> (SharedState, Uuid, mpsc::UnboundedReceiver<LogEntry>) {
    let catalog = InMemoryCatalog::new();
    let quiz_id = Uuid::new_v4();
    catalog.insert(quiz_id, quiz);

    let (log, log_rx) = ChannelSessionLog::channel();
    let state = AppState::with_collaborators(AppConfig::default(), Arc::new(catalog), Arc::new(log));
    (state, quiz_id, log_rx)
}

async fn created_game(
    state: &SharedState,
    quiz_id: Uuid,
) -> quiz_blitz_back::dto::game::CreateGameResponse {
    game_service::create_game(state, CreateGameRequest { quiz_id })
        .await
        .expect("create game")
}

async fn joined(
    state: &SharedState,
    pin: &str,
    nickname: &str,
) -> quiz_blitz_back::dto::game::JoinGameResponse {
    game_service::join_game(
        state,
        pin,
        JoinGameRequest {
            nickname: nickname.into(),
        },
    )
    .await
    .expect("join game")
}

async fn started(state: &SharedState, pin: &str, host_token: &str) {
    game_service::start_game(
        state,
        pin,
        StartGameRequest {
            host_token: host_token.into(),
        },
    )
    .await
    .expect("start game");
}

/// Identifier of the correct (or wrong) option of question `index`.
fn option_of(quiz: &QuizSnapshot, index: usize, correct: bool) -> Uuid {
    quiz.questions[index]
        .options
        .iter()
        .find(|option| option.is_correct == correct)
        .map(|option| option.id)
        .expect("option")
}

/// Drain every event already broadcast for the subscribed pin.
fn drain_events(receiver: &mut tokio::sync::broadcast::Receiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut drained = Vec::new();
    loop {
        match receiver.try_recv() {
            Ok(event) => drained.push(event),
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            Err(TryRecvError::Lagged(_)) => continue,
        }
    }
    drained
}

fn event_names(events: &[ServerEvent]) -> Vec<&str> {
    events
        .iter()
        .map(|event| event.event.as_deref().unwrap_or_default())
        .collect()
}

fn drain_log_kinds(rx: &mut mpsc::UnboundedReceiver<LogEntry>) -> Vec<LogKind> {
    let mut kinds = Vec::new();
    while let Ok(entry) = rx.try_recv() {
        kinds.push(entry.kind);
    }
    kinds
}

#[tokio::test(start_paused = true)]
async fn single_question_session_runs_to_completion() {
    let quiz = quiz(1);
    let correct = option_of(&quiz, 0, true);
    let wrong = option_of(&quiz, 0, false);
    let question_id = quiz.questions[0].id;
    let (state, quiz_id, mut log_rx) = test_state(quiz);

    let created = created_game(&state, quiz_id).await;
    assert_eq!(created.pin.len(), 6);
    assert_eq!(created.total_questions, 1);
    assert!(created.host_token.starts_with("host_"));

    let mut events = state.sse().subscribe(&created.pin);

    let alice = joined(&state, &created.pin, "alice").await;
    let bob = joined(&state, &created.pin, "bob").await;
    assert!(alice.player_token.starts_with("player_"));

    started(&state, &created.pin, &created.host_token).await;
    let status = game_service::get_status(&state, &created.pin).await.unwrap();
    assert_eq!(status.status, SessionPhase::Countdown);

    // Countdown is 3s; land 2s into the 20s question window.
    tokio::time::sleep(Duration::from_secs(5)).await;
    let status = game_service::get_status(&state, &created.pin).await.unwrap();
    assert_eq!(status.status, SessionPhase::Question);

    let scored = game_service::submit_answer(
        &state,
        &created.pin,
        SubmitAnswerRequest {
            player_token: alice.player_token.clone(),
            question_id,
            option_id: correct,
        },
    )
    .await
    .unwrap();
    assert!(scored.is_correct);
    // 2s of 20s elapsed: 1000 base + 900 bonus.
    assert_eq!(scored.points, 1900);
    assert_eq!(scored.total_score, 1900);
    assert_eq!(scored.time_spent, 2000);

    let missed = game_service::submit_answer(
        &state,
        &created.pin,
        SubmitAnswerRequest {
            player_token: bob.player_token.clone(),
            question_id,
            option_id: wrong,
        },
    )
    .await
    .unwrap();
    assert!(!missed.is_correct);
    assert_eq!(missed.points, 0);

    // Question closes at t=23, leaderboard at t=26, game end at t=31.
    tokio::time::sleep(Duration::from_secs(30)).await;
    let status = game_service::get_status(&state, &created.pin).await.unwrap();
    assert_eq!(status.status, SessionPhase::Ended);

    let leaderboard = game_service::get_leaderboard(&state, &created.pin).await.unwrap();
    assert_eq!(leaderboard.len(), 2);
    assert_eq!(leaderboard[0].nickname, "alice");
    assert_eq!(leaderboard[0].rank, 1);
    assert_eq!(leaderboard[0].score, 1900);
    assert_eq!(leaderboard[1].nickname, "bob");
    assert_eq!(leaderboard[1].rank, 2);
    assert_eq!(leaderboard[1].score, 0);

    let broadcasts = drain_events(&mut events);
    assert_eq!(
        event_names(&broadcasts),
        [
            "player_joined",
            "player_joined",
            "countdown_started",
            "question_started",
            "player_answered",
            "player_answered",
            "question_ended",
            "leaderboard",
            "game_ended",
        ]
    );

    // The terminal broadcast names the winner outright.
    let ended: serde_json::Value =
        serde_json::from_str(&broadcasts.last().unwrap().data).unwrap();
    assert_eq!(ended["winner"]["nickname"], "alice");
    assert_eq!(ended["winner"]["score"], 1900);
    assert_eq!(ended["winner"]["rank"], 1);
    assert_eq!(ended["finalLeaderboard"][1]["nickname"], "bob");

    assert_eq!(
        drain_log_kinds(&mut log_rx),
        [
            LogKind::GameCreated,
            LogKind::PlayerJoined,
            LogKind::PlayerJoined,
            LogKind::GameStarted,
            LogKind::QuestionStarted,
            LogKind::AnswerSubmitted,
            LogKind::AnswerSubmitted,
            LogKind::QuestionEnded,
            LogKind::LeaderboardShown,
            LogKind::GameEnded,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn questions_cycle_until_the_quiz_is_exhausted() {
    let quiz = quiz(2);
    let first_correct = option_of(&quiz, 0, true);
    let second_correct = option_of(&quiz, 1, true);
    let first_id = quiz.questions[0].id;
    let second_id = quiz.questions[1].id;
    let (state, quiz_id, _log_rx) = test_state(quiz);

    let created = created_game(&state, quiz_id).await;
    let alice = joined(&state, &created.pin, "alice").await;
    started(&state, &created.pin, &created.host_token).await;

    // Question 1 opens at t=3.
    tokio::time::sleep(Duration::from_secs(4)).await;
    let status = game_service::get_status(&state, &created.pin).await.unwrap();
    assert_eq!(status.status, SessionPhase::Question);
    assert_eq!(status.question_number, 1);

    game_service::submit_answer(
        &state,
        &created.pin,
        SubmitAnswerRequest {
            player_token: alice.player_token.clone(),
            question_id: first_id,
            option_id: first_correct,
        },
    )
    .await
    .unwrap();

    // Question 1 closes at t=23, leaderboard at t=26, question 2 opens at t=31.
    tokio::time::sleep(Duration::from_secs(28)).await;
    let status = game_service::get_status(&state, &created.pin).await.unwrap();
    assert_eq!(status.status, SessionPhase::Question);
    assert_eq!(status.question_number, 2);

    let scored = game_service::submit_answer(
        &state,
        &created.pin,
        SubmitAnswerRequest {
            player_token: alice.player_token.clone(),
            question_id: second_id,
            option_id: second_correct,
        },
    )
    .await
    .unwrap();
    // Scores accumulate across questions.
    assert!(scored.total_score > scored.points);

    // Question 2 closes at t=51, leaderboard at t=54, game ends at t=59.
    tokio::time::sleep(Duration::from_secs(28)).await;
    let status = game_service::get_status(&state, &created.pin).await.unwrap();
    assert_eq!(status.status, SessionPhase::Ended);
}

#[tokio::test]
async fn lobby_rules_reject_bad_joins() {
    let (state, quiz_id, _log_rx) = test_state(quiz(1));
    let created = created_game(&state, quiz_id).await;
    joined(&state, &created.pin, "alice").await;

    let duplicate = game_service::join_game(
        &state,
        &created.pin,
        JoinGameRequest {
            nickname: "alice".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(duplicate, ServiceError::InvalidState(_)));

    let unknown_pin = game_service::join_game(
        &state,
        "000000",
        JoinGameRequest {
            nickname: "bob".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(unknown_pin, ServiceError::NotFound(_)));

    started(&state, &created.pin, &created.host_token).await;
    let late = game_service::join_game(
        &state,
        &created.pin,
        JoinGameRequest {
            nickname: "carol".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(late, ServiceError::InvalidState(_)));
}

#[tokio::test]
async fn starting_requires_the_host_token_and_a_lobby() {
    let (state, quiz_id, _log_rx) = test_state(quiz(1));
    let created = created_game(&state, quiz_id).await;

    let empty = game_service::start_game(
        &state,
        &created.pin,
        StartGameRequest {
            host_token: created.host_token.clone(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(empty, ServiceError::InvalidState(_)));

    joined(&state, &created.pin, "alice").await;

    let forged = game_service::start_game(
        &state,
        &created.pin,
        StartGameRequest {
            host_token: "host_forged".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(forged, ServiceError::Unauthorized(_)));

    started(&state, &created.pin, &created.host_token).await;
    let twice = game_service::start_game(
        &state,
        &created.pin,
        StartGameRequest {
            host_token: created.host_token.clone(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(twice, ServiceError::InvalidState(_)));
}

#[tokio::test(start_paused = true)]
async fn answers_are_scored_once_and_only_while_the_question_is_open() {
    let quiz = quiz(1);
    let correct = option_of(&quiz, 0, true);
    let question_id = quiz.questions[0].id;
    let (state, quiz_id, _log_rx) = test_state(quiz);

    let created = created_game(&state, quiz_id).await;
    let alice = joined(&state, &created.pin, "alice").await;

    // Nothing is open in the lobby.
    let early = game_service::submit_answer(
        &state,
        &created.pin,
        SubmitAnswerRequest {
            player_token: alice.player_token.clone(),
            question_id,
            option_id: correct,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(early, ServiceError::InvalidState(_)));

    started(&state, &created.pin, &created.host_token).await;
    tokio::time::sleep(Duration::from_secs(4)).await;

    let forged_token = game_service::submit_answer(
        &state,
        &created.pin,
        SubmitAnswerRequest {
            player_token: "player_forged".into(),
            question_id,
            option_id: correct,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(forged_token, ServiceError::NotFound(_)));

    let wrong_question = game_service::submit_answer(
        &state,
        &created.pin,
        SubmitAnswerRequest {
            player_token: alice.player_token.clone(),
            question_id: Uuid::new_v4(),
            option_id: correct,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(wrong_question, ServiceError::InvalidState(_)));

    let foreign_option = game_service::submit_answer(
        &state,
        &created.pin,
        SubmitAnswerRequest {
            player_token: alice.player_token.clone(),
            question_id,
            option_id: Uuid::new_v4(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(foreign_option, ServiceError::InvalidInput(_)));

    game_service::submit_answer(
        &state,
        &created.pin,
        SubmitAnswerRequest {
            player_token: alice.player_token.clone(),
            question_id,
            option_id: correct,
        },
    )
    .await
    .unwrap();

    let again = game_service::submit_answer(
        &state,
        &created.pin,
        SubmitAnswerRequest {
            player_token: alice.player_token.clone(),
            question_id,
            option_id: correct,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(again, ServiceError::InvalidState(_)));

    // Only the first submission scored: 1s of 20s elapsed, 1000 base + 950.
    let leaderboard = game_service::get_leaderboard(&state, &created.pin).await.unwrap();
    assert_eq!(leaderboard.len(), 1);
    assert_eq!(leaderboard[0].score, 1950);

    // The window closes with the question.
    tokio::time::sleep(Duration::from_secs(20)).await;
    let closed = game_service::submit_answer(
        &state,
        &created.pin,
        SubmitAnswerRequest {
            player_token: alice.player_token.clone(),
            question_id,
            option_id: correct,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(closed, ServiceError::InvalidState(_)));
}

#[tokio::test(start_paused = true)]
async fn slower_correct_answers_score_less() {
    let quiz = quiz(1);
    let correct = option_of(&quiz, 0, true);
    let question_id = quiz.questions[0].id;
    let (state, quiz_id, _log_rx) = test_state(quiz);

    let created = created_game(&state, quiz_id).await;
    let fast = joined(&state, &created.pin, "fast").await;
    let slow = joined(&state, &created.pin, "slow").await;
    started(&state, &created.pin, &created.host_token).await;

    tokio::time::sleep(Duration::from_secs(4)).await;
    let fast_result = game_service::submit_answer(
        &state,
        &created.pin,
        SubmitAnswerRequest {
            player_token: fast.player_token.clone(),
            question_id,
            option_id: correct,
        },
    )
    .await
    .unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;
    let slow_result = game_service::submit_answer(
        &state,
        &created.pin,
        SubmitAnswerRequest {
            player_token: slow.player_token.clone(),
            question_id,
            option_id: correct,
        },
    )
    .await
    .unwrap();

    assert!(fast_result.points > slow_result.points);
    assert!(slow_result.points >= 1000);

    let leaderboard = game_service::get_leaderboard(&state, &created.pin).await.unwrap();
    assert_eq!(leaderboard[0].nickname, "fast");
    assert_eq!(leaderboard[1].nickname, "slow");
}

#[tokio::test(start_paused = true)]
async fn ending_the_game_silences_pending_timers() {
    let (state, quiz_id, _log_rx) = test_state(quiz(1));
    let created = created_game(&state, quiz_id).await;
    joined(&state, &created.pin, "alice").await;

    let mut events = state.sse().subscribe(&created.pin);
    started(&state, &created.pin, &created.host_token).await;

    // Cut the game short during the countdown; the armed question timer must
    // not resurrect it.
    game_service::end_game(&state, &created.pin).await.unwrap();
    let status = game_service::get_status(&state, &created.pin).await.unwrap();
    assert_eq!(status.status, SessionPhase::Ended);

    tokio::time::sleep(Duration::from_secs(60)).await;
    let status = game_service::get_status(&state, &created.pin).await.unwrap();
    assert_eq!(status.status, SessionPhase::Ended);

    let broadcasts = drain_events(&mut events);
    let names = event_names(&broadcasts);
    assert_eq!(names.last().copied(), Some("game_ended"));
    assert!(!names.contains(&"question_started"));

    // Ending twice is a no-op.
    game_service::end_game(&state, &created.pin).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn sessions_expire_and_are_swept() {
    let (state, quiz_id, _log_rx) = test_state(quiz(1));
    let created = created_game(&state, quiz_id).await;

    tokio::time::advance(Duration::from_secs(7201)).await;

    let gone = game_service::get_status(&state, &created.pin).await.unwrap_err();
    assert!(matches!(gone, ServiceError::NotFound(_)));

    let removed = state.sessions().remove_expired().await;
    assert!(removed.is_empty() || removed == vec![created.pin.clone()]);
    assert!(state.sessions().is_empty());
}
