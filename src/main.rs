//! Ovasense: PCOS risk prediction service
//!
//! Main entry point for the HTTP server.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ovasense::adapters::artifacts::DirectoryArtifactSource;
use ovasense::adapters::http::{build_router, AppState};
use ovasense::adapters::sanitize::SanitizingMakeWriter;
use ovasense::adapters::waterfall::SvgWaterfallRenderer;
use ovasense::application::attribution::attributor_for;
use ovasense::config::ServiceConfig;
use ovasense::{ArtifactBundle, PredictionService};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging.
    //
    // Default: stdout (so `docker logs` works). OVASENSE_LOG_MODE=file writes
    // to OVASENSE_LOG_FILE instead.
    let use_file = std::env::var("OVASENSE_LOG_MODE").is_ok_and(|mode| mode == "file");

    let (writer, _guard) = if use_file {
        let log_file = std::env::var("OVASENSE_LOG_FILE")
            .unwrap_or_else(|_| "/app/data/ovasense.log".to_string());

        if let Some(parent) = std::path::Path::new(&log_file).parent() {
            // Best-effort: don't fail startup just because the directory is missing.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("failed to open log file {log_file}"))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    let config = ServiceConfig::parse();
    config.validate()?;

    tracing::info!("Starting Ovasense...");

    // A bundle that fails to load or verify stops the process here.
    let policy = config.signature_policy()?;
    let source = DirectoryArtifactSource::open(&config.artifact_dir, &policy)?;
    let bundle = ArtifactBundle::load(&source).context("artifact bundle failed to load")?;

    let service = PredictionService::new(
        Arc::new(bundle),
        attributor_for(config.attribution),
        config.effective_top_n(),
    )
    .with_renderer(Arc::new(SvgWaterfallRenderer::default()));
    tracing::info!(
        "Serving with strategy={} top_n={}",
        service.strategy(),
        service.top_n()
    );

    let router = build_router(
        AppState::new(service),
        &config.cors_origins,
        config.request_timeout(),
    );
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!("Listening on {}", config.bind);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Ovasense shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
