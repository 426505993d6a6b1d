//! tilawa-ra library interface
//!
//! Exposes the router and application state for the binary and for
//! integration testing.

pub mod api;
pub mod collaborators;
pub mod config;
pub mod error;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use collaborators::{ReportWriter, Transcriber};
use std::sync::Arc;
use tilawa_common::{Corpus, Matcher};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Upload size limit for recitation audio
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Application state shared across handlers
///
/// The corpus is loaded before the state exists and is only read afterwards.
#[derive(Clone)]
pub struct AppState {
    pub corpus: Arc<Corpus>,
    pub matcher: Arc<Matcher>,
    pub transcriber: Arc<dyn Transcriber>,
    pub report_writer: Arc<dyn ReportWriter>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last collaborator error for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        corpus: Arc<Corpus>,
        matcher: Matcher,
        transcriber: Arc<dyn Transcriber>,
        report_writer: Arc<dyn ReportWriter>,
    ) -> Self {
        Self {
            corpus,
            matcher: Arc::new(matcher),
            transcriber,
            report_writer,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Remember an error for `/health`
    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::analyze_routes())
        .merge(api::match_routes())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
