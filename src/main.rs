//! AI Flow Relay Server
//!
//! HTTP service that streams AI completions to clients with sequential model
//! fallback

use anyhow::{Context, Result};
use flowrelay::{config::LoggingConfig, create_router, Settings};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load settings from environment (.env is read first)
    let settings = Settings::new().context("Failed to load server settings")?;

    // Initialize logging
    init_logging(&settings.logging)?;
    info!("{}", flowrelay::version_info());
    info!(
        "Models: default={}, fallback={:?}",
        settings.models.default_model, settings.models.fallback
    );

    // Cancelled on shutdown so in-flight relays close their upstream streams
    let shutdown = CancellationToken::new();

    // Create router
    let app = create_router(settings.clone(), shutdown.clone()).await?;

    let addr = format!("{}:{}", settings.server.host, settings.server.port);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("🚀 AI Flow relay started!");
    info!("📝 Health check: http://{}/health", addr);
    info!("🔄 Relay endpoint: http://{}/api/ask-ai", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start server: {}", e))?;

    info!("Server stopped");
    Ok(())
}

/// Wait for Ctrl-C, then cancel every active relay
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received, closing active streams");
    shutdown.cancel();
}

/// Initialize logging system
fn init_logging(config: &LoggingConfig) -> Result<()> {
    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if config.format == "json" {
        // JSON format logs (production environment)
        Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(config.level.as_str())
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .finish(),
        )
    } else {
        // Human readable format (development environment)
        Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(config.level.as_str())
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .finish(),
        )
    };

    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    info!("Logging system initialized");
    Ok(())
}
