use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use nudge::api::{AppState, router};
use nudge::auth::StaticTokenVerifier;
use nudge::config::Config;
use nudge::llm::create_provider;
use nudge::reminders::dedup::matcher_for;
use nudge::reminders::{GeneratorConfig, LlmReminderGenerator};
use nudge::store::LibSqlBackend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let config = Config::from_env().context("Failed to load configuration")?;

    // Stderr always, plus a daily-rolling file when a log dir is configured.
    // The guard must live until shutdown so buffered lines get flushed.
    let (file_layer, _log_guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "nudge.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    tracing::info!("Starting Nudge");

    // ── Database ─────────────────────────────────────────────────────────
    let db = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .context("Failed to open database")?,
    );

    // ── LLM ──────────────────────────────────────────────────────────────
    let llm = create_provider(&config.llm).context("Failed to create LLM provider")?;
    let generator = Arc::new(LlmReminderGenerator::new(llm, GeneratorConfig::default()));

    let matcher = matcher_for(config.dedup);
    tracing::info!(strategy = matcher.name(), "Duplicate matcher selected");

    // ── HTTP ─────────────────────────────────────────────────────────────
    let auth = Arc::new(StaticTokenVerifier::new(config.api_tokens.clone()));
    let state = AppState::new(db, generator, matcher, auth);
    let app = router(state).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "API server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}
