mod analysis;
mod config;
mod errors;
mod llm_client;
mod models;
mod notify;
mod routes;
mod session;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::notify::Notifier;
use crate::routes::build_router;
use crate::session::{spawn_idle_sweeper, SessionStore};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first; a missing GOOGLE_API_KEY stops startup here
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume-match v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(
        config.google_api_key.clone(),
        config.llm_base_url.clone(),
        Duration::from_secs(config.llm_timeout_secs),
    )
    .context("Failed to build LLM HTTP client")?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Initialize notification sink
    let notifier = Notifier::new(
        config.discord_webhook_url.clone(),
        Duration::from_secs(config.notify_timeout_secs),
    )
    .context("Failed to build webhook HTTP client")?;
    if notifier.is_enabled() {
        info!("Webhook notifications enabled");
    } else {
        warn!("DISCORD_WEBHOOK_URL not set; usage and feedback notifications are disabled");
    }

    // Sessions live in memory and end after sitting idle
    let sessions = SessionStore::new();
    spawn_idle_sweeper(
        sessions.clone(),
        Duration::from_secs(config.session_idle_timeout_secs),
    );

    let state = AppState {
        model: Arc::new(llm),
        notifier,
        sessions,
    };

    let app = build_router(state)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
