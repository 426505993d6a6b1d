//! Hosted text-generation client for recitation reports
//!
//! Renders a [`Summary`] into an instruction prompt and asks a hosted
//! language model to phrase the feedback for the reciter.

use super::{CollaboratorError, ReportWriter};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write as _;
use std::time::Duration;
use tilawa_common::config::ReportConfig;
use tilawa_common::{Corpus, Summary, SummaryStatus, WeakPointKind};

const USER_AGENT: &str = concat!("tilawa-ra/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    return_full_text: bool,
}

/// Hosted inference report writer
pub struct HfReportWriter {
    http_client: reqwest::Client,
    config: ReportConfig,
    token: Option<String>,
}

impl HfReportWriter {
    pub fn new(config: ReportConfig, token: Option<String>) -> Result<Self, CollaboratorError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CollaboratorError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
            token,
        })
    }
}

#[async_trait]
impl ReportWriter for HfReportWriter {
    async fn write_report(&self, summary: &Summary, corpus: &Corpus) -> Result<String, CollaboratorError> {
        let token = self.token.as_deref().ok_or(CollaboratorError::MissingToken)?;
        let prompt = build_prompt(summary, corpus);
        let url = format!("{}/models/{}", self.config.base_url.trim_end_matches('/'), self.config.model);

        let request = GenerationRequest {
            inputs: &prompt,
            parameters: GenerationParameters {
                max_new_tokens: self.config.max_new_tokens,
                return_full_text: false,
            },
        };

        tracing::debug!(model = %self.config.model, prompt_chars = prompt.len(), "Requesting report");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| CollaboratorError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Report request failed");
            return Err(CollaboratorError::ApiError(status.as_u16(), error_text));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| CollaboratorError::ParseError(e.to_string()))?;

        parse_generated_text(&value)
    }
}

/// Extract generated text from `[{"generated_text"}]` or `{"generated_text"}`
pub fn parse_generated_text(value: &Value) -> Result<String, CollaboratorError> {
    let object = match value {
        Value::Array(items) => items.first(),
        other => Some(other),
    };

    object
        .and_then(|o| o.get("generated_text"))
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CollaboratorError::ParseError(format!("Unexpected generation response: {}", value)))
}

/// Render the instruction prompt for `summary`
pub fn build_prompt(summary: &Summary, corpus: &Corpus) -> String {
    let mut facts = String::new();

    match (summary.status, summary.matched_reference) {
        (SummaryStatus::Matched, Some(reference)) => {
            let _ = writeln!(facts, "Matched verse: {} (chapter:verse)", reference);
            if let Ok(entry) = corpus.lookup(reference) {
                let _ = writeln!(facts, "Canonical text: {}", entry.canonical_text());
            }
            let _ = writeln!(facts, "Similarity score: {:.0}%", summary.score * 100.0);

            if summary.is_perfect() {
                let _ = writeln!(facts, "No mistakes were detected.");
            } else {
                let _ = writeln!(facts, "Detected mistakes (word position counted from 1):");
                for wp in &summary.weak_points {
                    let line = match wp.kind {
                        WeakPointKind::Substitution => format!(
                            "- word {}: said \"{}\" instead of \"{}\"",
                            wp.position + 1,
                            wp.recognized_word.as_deref().unwrap_or_default(),
                            wp.canonical_word.as_deref().unwrap_or_default()
                        ),
                        WeakPointKind::Deletion => format!(
                            "- word {}: \"{}\" was omitted",
                            wp.position + 1,
                            wp.canonical_word.as_deref().unwrap_or_default()
                        ),
                        WeakPointKind::Insertion => format!(
                            "- before word {}: added \"{}\" which is not in the verse",
                            wp.position + 1,
                            wp.recognized_word.as_deref().unwrap_or_default()
                        ),
                    };
                    let _ = writeln!(facts, "{}", line);
                }
            }
        }
        _ => {
            let _ = writeln!(facts, "No verse could be recognized in the recitation.");
            let _ = writeln!(facts, "Best similarity score: {:.0}%", summary.score * 100.0);
        }
    }

    format!(
        "[INST] You are a kind Quran recitation teacher. Using only the facts below, \
         write a short report in Arabic for the student: name the verse if one was \
         recognized, mention each mistake, and end with one piece of encouragement.\n\n\
         {}[/INST]",
        facts
    )
}
