//! Text matching endpoint
//!
//! `POST /match` runs the matching engine on already-transcribed text, with
//! no remote collaborators involved.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tilawa_common::{compose, Candidate, MatchResult, Summary};

use crate::{ApiError, ApiResult, AppState};

/// Default number of ranked candidates returned
const DEFAULT_CANDIDATES: usize = 3;
const MAX_CANDIDATES: usize = 20;

/// Match request body
#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub text: String,
    #[serde(default)]
    pub candidates: Option<usize>,
}

/// Match response body
#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub summary: Summary,
    pub candidates: Vec<Candidate>,
}

/// Match `text` and compose its summary off the async runtime
///
/// Scoring is CPU-bound over the whole corpus.
pub async fn match_and_compose(state: &AppState, text: String, candidates: usize) -> ApiResult<(Summary, Vec<Candidate>)> {
    let corpus = state.corpus.clone();
    let matcher = state.matcher.clone();

    tokio::task::spawn_blocking(move || {
        let result: MatchResult = matcher.best_match(&text, &corpus);
        let summary = compose(&text, &result, &corpus)?;
        let ranked = if candidates > 0 {
            matcher.top_candidates(&text, &corpus, candidates)
        } else {
            Vec::new()
        };
        Ok::<_, tilawa_common::Error>((summary, ranked))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Matching task failed: {}", e)))?
    .map_err(ApiError::from)
}

/// POST /match
pub async fn match_text(State(state): State<AppState>, Json(request): Json<MatchRequest>) -> ApiResult<Json<MatchResponse>> {
    let n = request.candidates.unwrap_or(DEFAULT_CANDIDATES).min(MAX_CANDIDATES);
    let (summary, candidates) = match_and_compose(&state, request.text, n).await?;

    tracing::info!(
        reference = ?summary.matched_reference.map(|r| r.to_string()),
        score = summary.score,
        weak_points = summary.weak_points.len(),
        "Text matched"
    );

    Ok(Json(MatchResponse { summary, candidates }))
}

/// Build matching routes
pub fn match_routes() -> Router<AppState> {
    Router::new().route("/match", post(match_text))
}
