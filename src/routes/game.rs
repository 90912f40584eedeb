use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::game::{
        AnswerResult, CreateGameRequest, CreateGameResponse, JoinGameRequest, JoinGameResponse,
        LeaderboardEntry, SessionStatus, StartGameRequest, StartGameResponse, SubmitAnswerRequest,
    },
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Routes covering the whole session lifecycle, from creation to gameplay.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", post(create_game))
        .route("/games/{pin}/join", post(join_game))
        .route("/games/{pin}/start", post(start_game))
        .route("/games/{pin}/answer", post(submit_answer))
        .route("/games/{pin}", get(get_game))
        .route("/games/{pin}/leaderboard", get(get_leaderboard))
}

/// Create a live session for a quiz and hand the host its credentials.
#[utoipa::path(
    post,
    path = "/games",
    tag = "game",
    request_body = CreateGameRequest,
    responses(
        (status = 200, description = "Session created", body = CreateGameResponse),
        (status = 404, description = "Quiz not found")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Json(payload): Json<CreateGameRequest>,
) -> Result<Json<CreateGameResponse>, AppError> {
    let created = game_service::create_game(&state, payload).await?;
    Ok(Json(created))
}

/// Join the lobby of a session under a unique nickname.
#[utoipa::path(
    post,
    path = "/games/{pin}/join",
    tag = "game",
    params(("pin" = String, Path, description = "Six digit session pin")),
    request_body = JoinGameRequest,
    responses(
        (status = 200, description = "Joined the lobby", body = JoinGameResponse),
        (status = 404, description = "Session not found or expired"),
        (status = 409, description = "Session no longer accepts players or nickname taken")
    )
)]
pub async fn join_game(
    State(state): State<SharedState>,
    Path(pin): Path<String>,
    Valid(Json(payload)): Valid<Json<JoinGameRequest>>,
) -> Result<Json<JoinGameResponse>, AppError> {
    let joined = game_service::join_game(&state, &pin, payload).await?;
    Ok(Json(joined))
}

/// Start the session, kicking off the autonomous question cycle.
#[utoipa::path(
    post,
    path = "/games/{pin}/start",
    tag = "game",
    params(("pin" = String, Path, description = "Six digit session pin")),
    request_body = StartGameRequest,
    responses(
        (status = 200, description = "Countdown started", body = StartGameResponse),
        (status = 401, description = "Host token rejected"),
        (status = 409, description = "Session already started or lobby empty")
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Path(pin): Path<String>,
    Json(payload): Json<StartGameRequest>,
) -> Result<Json<StartGameResponse>, AppError> {
    let started = game_service::start_game(&state, &pin, payload).await?;
    Ok(Json(started))
}

/// Submit an answer for the open question.
#[utoipa::path(
    post,
    path = "/games/{pin}/answer",
    tag = "game",
    params(("pin" = String, Path, description = "Six digit session pin")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer scored", body = AnswerResult),
        (status = 404, description = "Session or player not found"),
        (status = 409, description = "No question open or already answered")
    )
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    Path(pin): Path<String>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<Json<AnswerResult>, AppError> {
    let result = game_service::submit_answer(&state, &pin, payload).await?;
    Ok(Json(result))
}

/// Read the current phase and roster of a session.
#[utoipa::path(
    get,
    path = "/games/{pin}",
    tag = "game",
    params(("pin" = String, Path, description = "Six digit session pin")),
    responses(
        (status = 200, description = "Session status", body = SessionStatus),
        (status = 404, description = "Session not found or expired")
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(pin): Path<String>,
) -> Result<Json<SessionStatus>, AppError> {
    let status = game_service::get_status(&state, &pin).await?;
    Ok(Json(status))
}

/// Read the current standings, ranked by score.
#[utoipa::path(
    get,
    path = "/games/{pin}/leaderboard",
    tag = "game",
    params(("pin" = String, Path, description = "Six digit session pin")),
    responses(
        (status = 200, description = "Ranked standings", body = [LeaderboardEntry]),
        (status = 404, description = "Session not found or expired")
    )
)]
pub async fn get_leaderboard(
    State(state): State<SharedState>,
    Path(pin): Path<String>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let entries = game_service::get_leaderboard(&state, &pin).await?;
    Ok(Json(entries))
}
