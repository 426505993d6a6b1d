//! tilawa-ra - Recitation Analysis service
//!
//! Receives a recorded recitation, identifies the verse being recited and
//! returns structured feedback plus a phrased report.
//!
//! Startup order: tracing, configuration, corpus (fatal on failure),
//! collaborators, HTTP server.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tilawa_common::{Corpus, Matcher};
use tilawa_ra::api::health::BuildInfo;
use tilawa_ra::collaborators::{HfReportWriter, HfTranscriber};
use tilawa_ra::config::{Args, ServiceConfig};
use tilawa_ra::{build_router, AppState};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Filter starts at info and is narrowed/widened once the config is read,
    // unless RUST_LOG is set
    let env_filter = EnvFilter::try_from_default_env().ok();
    let has_env_filter = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| default_filter("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let build = BuildInfo::CURRENT;
    info!(
        "Starting Tilawa Recitation Analysis (tilawa-ra) v{} [{}] built {} ({})",
        build.version, build.commit, build.built_at, build.profile
    );

    let args = Args::parse();
    let config = ServiceConfig::load(&args).context("Failed to load configuration")?;

    if !has_env_filter {
        filter_handle
            .modify(|f| *f = default_filter(&config.log_level))
            .context("Failed to apply log level")?;
    }

    // No corpus, no service
    let corpus = Corpus::load(&config.corpus_path)
        .with_context(|| format!("Failed to load corpus from {}", config.corpus_path.display()))?;
    let corpus = Arc::new(corpus);

    info!(
        min_score = config.matcher.min_score,
        metric = ?config.matcher.metric,
        "Matcher configured"
    );
    let matcher = Matcher::new(config.matcher.clone());

    let transcriber = HfTranscriber::new(config.transcription.clone(), config.hf_token.clone())
        .context("Failed to create transcription client")?;
    let report_writer =
        HfReportWriter::new(config.report.clone(), config.hf_token.clone()).context("Failed to create report client")?;

    let state = AppState::new(corpus, matcher, Arc::new(transcriber), Arc::new(report_writer));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen_addr))?;
    info!("Listening on http://{}", config.listen_addr);
    info!("Health check: http://{}/health", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("tilawa_ra={0},tilawa_common={0},tower_http=info", level))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
