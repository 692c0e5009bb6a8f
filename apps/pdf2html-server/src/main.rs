//! PDF to HTML Server
//!
//! Converts PDFs fetched by URL, uploaded, or stored in the record store
//! into HTML using an external converter.

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdf2html_server::config::Config;
use pdf2html_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before anything reads the environment
    dotenvy::dotenv().ok();

    // Tracing first; configuration parsing logs warnings
    let default_filter = if Config::debug_from_env() {
        "pdf2html_server=debug,tower_http=debug"
    } else {
        "pdf2html_server=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Invalid configuration")?;

    tracing::info!("Starting PDF to HTML Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Converter: {} ({}), timeout {}s",
        config.converter.backend.name(),
        config.converter.program(),
        config.converter.timeout_secs
    );
    tracing::info!("Upload folder: {}", config.upload.dir.display());

    let host = config.server.host.clone();
    let port = config.server.port;

    // Create application state (record store may come back unavailable)
    let app_state = AppState::from_config(config).context("Failed to initialize application state")?;
    if !app_state.has_record_store() {
        tracing::warn!("Record store not available - /resume and /test-db will return 503");
    }

    let app = pdf2html_server::app(app_state);

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;
    tracing::info!("PDF to HTML Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("PDF to HTML Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM; in-flight conversions finish first
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, draining requests");
        },
        _ = terminate => {
            tracing::info!("SIGTERM received, draining requests");
        },
    }
}
