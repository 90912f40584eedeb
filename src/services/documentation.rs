use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Quiz Blitz Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::game::create_game,
        crate::routes::game::join_game,
        crate::routes::game::start_game,
        crate::routes::game::submit_answer,
        crate::routes::game::get_game,
        crate::routes::game::get_leaderboard,
        crate::routes::sse::host_stream,
        crate::routes::sse::player_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::CreateGameResponse,
            crate::dto::game::JoinGameRequest,
            crate::dto::game::JoinGameResponse,
            crate::dto::game::StartGameRequest,
            crate::dto::game::StartGameResponse,
            crate::dto::game::SubmitAnswerRequest,
            crate::dto::game::AnswerResult,
            crate::dto::game::LeaderboardEntry,
            crate::dto::game::PlayerSummary,
            crate::dto::game::SessionStatus,
            crate::state::phase::SessionPhase,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "game", description = "Session lifecycle and gameplay operations"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
