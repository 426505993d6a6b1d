//! Service health and diagnostics
//!
//! A running service always has its corpus, so `/health` never reports the
//! corpus as missing. It degrades once a collaborator call has failed and
//! stays degraded until restart, so the last failure remains visible.

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeSet;
use tilawa_common::SimilarityMetric;

use crate::config::MODULE_NAME;
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    /// A transcription or report call has failed since startup
    Degraded,
}

#[derive(Debug, Serialize)]
pub struct CorpusInfo {
    pub verses: usize,
    pub chapters: usize,
}

#[derive(Debug, Serialize)]
pub struct MatcherInfo {
    pub metric: SimilarityMetric,
    pub min_score: f64,
}

#[derive(Debug, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub commit: &'static str,
    pub built_at: &'static str,
    pub profile: &'static str,
}

impl BuildInfo {
    pub const CURRENT: BuildInfo = BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        commit: env!("TILAWA_BUILD_COMMIT"),
        built_at: env!("TILAWA_BUILD_TIME"),
        profile: env!("TILAWA_BUILD_PROFILE"),
    };
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub module: &'static str,
    pub uptime_seconds: u64,
    pub corpus: CorpusInfo,
    pub matcher: MatcherInfo,
    pub build: BuildInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = u64::try_from(Utc::now().signed_duration_since(state.startup_time).num_seconds()).unwrap_or(0);
    let last_error = state.last_error.read().await.clone();

    let chapters = state
        .corpus
        .entries()
        .iter()
        .map(|e| e.reference().chapter)
        .collect::<BTreeSet<_>>()
        .len();
    let config = state.matcher.config();

    Json(HealthResponse {
        status: if last_error.is_some() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Ok
        },
        module: MODULE_NAME,
        uptime_seconds,
        corpus: CorpusInfo {
            verses: state.corpus.len(),
            chapters,
        },
        matcher: MatcherInfo {
            metric: config.metric,
            min_score: config.min_score,
        },
        build: BuildInfo::CURRENT,
        last_error,
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
