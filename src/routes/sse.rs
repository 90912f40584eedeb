use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    error::AppError,
    services::sse_service::{self, StreamRole},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/games/{pin}/events/host",
    tag = "sse",
    params(("pin" = String, Path, description = "Six digit session pin")),
    responses(
        (status = 200, description = "Host event stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "Session not found or expired")
    )
)]
/// Stream session lifecycle events to the host.
pub async fn host_stream(
    State(state): State<SharedState>,
    Path(pin): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let receiver = sse_service::subscribe(&state, &pin).await?;
    info!(%pin, "new host SSE connection");
    Ok(sse_service::to_sse_stream(receiver, &pin, StreamRole::Host))
}

#[utoipa::path(
    get,
    path = "/games/{pin}/events/player",
    tag = "sse",
    params(("pin" = String, Path, description = "Six digit session pin")),
    responses(
        (status = 200, description = "Player event stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "Session not found or expired")
    )
)]
/// Stream session lifecycle events to a player.
pub async fn player_stream(
    State(state): State<SharedState>,
    Path(pin): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let receiver = sse_service::subscribe(&state, &pin).await?;
    info!(%pin, "new player SSE connection");
    Ok(sse_service::to_sse_stream(receiver, &pin, StreamRole::Player))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/games/{pin}/events/host", get(host_stream))
        .route("/games/{pin}/events/player", get(player_stream))
}
