/// OpenAPI documentation generation.
pub mod documentation;
/// Session lifecycle orchestration and gameplay operations.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Per-session delayed transition scheduler.
pub mod scheduler;
/// Pure answer scoring.
pub mod scoring;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
