mod candidates_client;
mod config;
mod errors;
mod routes;
mod search;
mod state;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::candidates_client::CandidateClient;
use crate::config::Config;
use crate::routes::build_router;
use crate::search::session::SessionStore;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Talent Search API v{}", env!("CARGO_PKG_VERSION"));

    let candidates = CandidateClient::new(
        &config.candidate_api_url,
        config.candidate_api_token.clone(),
        Duration::from_secs(config.candidate_api_timeout_secs),
    )?;
    info!("Candidate API client initialized ({})", config.candidate_api_url);

    let idle_ttl = Duration::from_secs(config.session_idle_ttl_secs);
    let sessions = SessionStore::new(idle_ttl);
    // Sweep at a quarter of the TTL, but at least once a second.
    sessions.spawn_idle_sweeper((idle_ttl / 4).max(Duration::from_secs(1)));
    info!("Idle search sessions expire after {}s", config.session_idle_ttl_secs);

    let state = AppState {
        sessions,
        candidates,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client's host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
