//! Quiz Blitz Back binary entrypoint wiring the REST and SSE layers.

use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio::time::sleep;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use quiz_blitz_back::{
    config::AppConfig,
    dao::{catalog::InMemoryCatalog, session_log::TracingSessionLog},
    routes,
    state::{
        AppState, SharedState,
        session::{OptionSnapshot, QuestionSnapshot, QuizSnapshot},
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();

    let catalog = InMemoryCatalog::new();
    seed_demo_quiz(&catalog);

    let app_state = AppState::with_collaborators(config, Arc::new(catalog), Arc::new(TracingSessionLog));

    tokio::spawn(run_session_sweeper(app_state.clone()));
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Periodically evict expired sessions and drop their fan-out hubs and
/// pending timers.
async fn run_session_sweeper(state: SharedState) {
    loop {
        sleep(Duration::from_secs(60)).await;

        for pin in state.sessions().remove_expired().await {
            state.scheduler().cancel(&pin);
            state.sse().remove(&pin);
            info!(%pin, "evicted expired session");
        }
    }
}

/// Register a ready-to-play quiz so a fresh deployment can host a session
/// without an external catalog.
fn seed_demo_quiz(catalog: &InMemoryCatalog) {
    let quiz_id = Uuid::new_v4();
    catalog.insert(
        quiz_id,
        QuizSnapshot {
            title: "General Knowledge Warm-up".into(),
            questions: vec![
                demo_question("What is the capital of Australia?", 20, &[
                    ("Sydney", false),
                    ("Canberra", true),
                    ("Melbourne", false),
                    ("Perth", false),
                ]),
                demo_question("Which planet is closest to the sun?", 15, &[
                    ("Venus", false),
                    ("Earth", false),
                    ("Mercury", true),
                    ("Mars", false),
                ]),
                demo_question("How many minutes are in a day?", 30, &[
                    ("1440", true),
                    ("3600", false),
                    ("720", false),
                    ("2880", false),
                ]),
            ],
        },
    );
    info!(%quiz_id, "seeded demo quiz");
}

fn demo_question(text: &str, time_limit_secs: u64, options: &[(&str, bool)]) -> QuestionSnapshot {
    QuestionSnapshot {
        id: Uuid::new_v4(),
        text: text.into(),
        time_limit_secs,
        options: options
            .iter()
            .enumerate()
            .map(|(order, (text, is_correct))| OptionSnapshot {
                id: Uuid::new_v4(),
                text: (*text).into(),
                order: order as u32,
                is_correct: *is_correct,
            })
            .collect(),
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
