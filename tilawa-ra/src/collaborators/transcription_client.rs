//! Hosted speech-to-text client
//!
//! Posts raw audio bytes to a hosted inference endpoint
//! (`<base_url>/models/<model>`) and converts the response to a
//! [`Transcription`].
//!
//! A cold model answers `503` with `{"error": "... is currently loading",
//! "estimated_time": <secs>}`; the client waits and retries up to
//! `max_attempts` times.

use super::{CollaboratorError, Transcriber, Transcription};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tilawa_common::config::TranscriptionConfig;

const USER_AGENT: &str = concat!("tilawa-ra/", env!("CARGO_PKG_VERSION"));
const MAX_LOADING_WAIT_SECS: f64 = 60.0;

/// Hosted inference transcriber
pub struct HfTranscriber {
    http_client: reqwest::Client,
    config: TranscriptionConfig,
    token: Option<String>,
}

impl HfTranscriber {
    pub fn new(config: TranscriptionConfig, token: Option<String>) -> Result<Self, CollaboratorError> {
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

    fn endpoint(&self) -> String {
        format!("{}/models/{}", self.config.base_url.trim_end_matches('/'), self.config.model)
    }
}

#[async_trait]
impl Transcriber for HfTranscriber {
    async fn transcribe(&self, audio: Vec<u8>, content_type: &str) -> Result<Transcription, CollaboratorError> {
        let token = self.token.as_deref().ok_or(CollaboratorError::MissingToken)?;
        let url = self.endpoint();

        for attempt in 1..=self.config.max_attempts {
            tracing::debug!(
                model = %self.config.model,
                attempt,
                bytes = audio.len(),
                "Requesting transcription"
            );

            let response = self
                .http_client
                .post(&url)
                .bearer_auth(token)
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(audio.clone())
                .send()
                .await
                .map_err(|e| CollaboratorError::NetworkError(e.to_string()))?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| CollaboratorError::NetworkError(e.to_string()))?;

            if status == StatusCode::SERVICE_UNAVAILABLE {
                if let Some(wait) = loading_wait(&body, self.config.loading_retry_secs) {
                    if attempt < self.config.max_attempts {
                        tracing::warn!(
                            model = %self.config.model,
                            attempt,
                            wait_ms = wait.as_millis() as u64,
                            "Transcription model loading, retrying"
                        );
                        tokio::time::sleep(wait).await;
                        continue;
                    }
                    return Err(CollaboratorError::ModelLoading(
                        self.config.model.clone(),
                        self.config.max_attempts,
                    ));
                }
            }

            if !status.is_success() {
                tracing::warn!(status = status.as_u16(), "Transcription request failed");
                return Err(CollaboratorError::ApiError(status.as_u16(), body));
            }

            let value: Value =
                serde_json::from_str(&body).map_err(|e| CollaboratorError::ParseError(e.to_string()))?;
            let transcription = parse_transcription(&value)?;

            tracing::info!(
                model = %self.config.model,
                chars = transcription.text.chars().count(),
                "Transcription received"
            );
            return Ok(transcription);
        }

        Err(CollaboratorError::ModelLoading(
            self.config.model.clone(),
            self.config.max_attempts,
        ))
    }
}

/// Extract recognized text from the known response shapes
///
/// Accepts `{"text": ...}`, `{"generated_text": ...}` and single-element
/// arrays of either.
pub fn parse_transcription(value: &Value) -> Result<Transcription, CollaboratorError> {
    let object = match value {
        Value::Array(items) => items.first(),
        other => Some(other),
    };

    object
        .and_then(|o| o.get("text").or_else(|| o.get("generated_text")))
        .and_then(Value::as_str)
        .map(|text| Transcription {
            text: text.trim().to_string(),
        })
        .ok_or_else(|| CollaboratorError::ParseError(format!("Unexpected transcription response: {}", value)))
}

/// Wait before retrying if `body` says the model is loading
fn loading_wait(body: &str, default_secs: u64) -> Option<Duration> {
    let value: Value = serde_json::from_str(body).ok()?;
    let estimated = value.get("estimated_time").and_then(Value::as_f64);
    let loading = value
        .get("error")
        .and_then(Value::as_str)
        .map(|e| e.to_lowercase().contains("loading"))
        .unwrap_or(false);

    if !loading && estimated.is_none() {
        return None;
    }

    let secs = estimated.unwrap_or(default_secs as f64).clamp(0.0, MAX_LOADING_WAIT_SECS);
    Some(Duration::from_secs_f64(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode as AxumStatus, routing::post, Router};
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_parse_object_shape() {
        let t = parse_transcription(&json!({"text": " بسم الله "})).unwrap();
        assert_eq!(t.text, "بسم الله");
    }

    #[test]
    fn test_parse_array_shape() {
        let t = parse_transcription(&json!([{"generated_text": "الحمد لله"}])).unwrap();
        assert_eq!(t.text, "الحمد لله");
    }

    #[test]
    fn test_parse_rejects_unknown_shape() {
        assert!(parse_transcription(&json!({"chunks": []})).is_err());
        assert!(parse_transcription(&json!([])).is_err());
    }

    #[test]
    fn test_loading_wait() {
        let wait = loading_wait(r#"{"error": "Model x is currently loading", "estimated_time": 2.5}"#, 10);
        assert_eq!(wait, Some(Duration::from_millis(2500)));

        let wait = loading_wait(r#"{"error": "Model x is currently loading"}"#, 7);
        assert_eq!(wait, Some(Duration::from_secs(7)));

        let wait = loading_wait(r#"{"estimated_time": 500}"#, 7);
        assert_eq!(wait, Some(Duration::from_secs(60)));

        assert_eq!(loading_wait(r#"{"error": "Rate limit"}"#, 7), None);
        assert_eq!(loading_wait("Service Unavailable", 7), None);
    }

    #[tokio::test]
    async fn test_missing_token() {
        let client = HfTranscriber::new(TranscriptionConfig::default(), None).unwrap();
        let result = client.transcribe(vec![1, 2, 3], "audio/wav").await;
        assert!(matches!(result, Err(CollaboratorError::MissingToken)));
    }

    /// Local stand-in for the inference API: answers "loading" `loading_replies` times
    async fn spawn_fake_api(loading_replies: u32) -> (String, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let app = Router::new().route(
            "/models/test/model",
            post(move |headers: axum::http::HeaderMap| {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(headers.get("authorization").unwrap(), "Bearer hf_test");
                    if n < loading_replies {
                        (
                            AxumStatus::SERVICE_UNAVAILABLE,
                            json!({"error": "Model test/model is currently loading", "estimated_time": 0.01})
                                .to_string(),
                        )
                    } else {
                        (AxumStatus::OK, json!({"text": "بسم الله الرحمن الرحيم"}).to_string())
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), calls)
    }

    fn config(base_url: String, max_attempts: u32) -> TranscriptionConfig {
        TranscriptionConfig {
            model: "test/model".to_string(),
            base_url,
            timeout_secs: 5,
            max_attempts,
            loading_retry_secs: 0,
        }
    }

    #[tokio::test]
    async fn test_retries_while_model_loading() {
        let (base_url, calls) = spawn_fake_api(2).await;
        let client = HfTranscriber::new(config(base_url, 3), Some("hf_test".to_string())).unwrap();

        let t = client.transcribe(vec![0; 16], "audio/wav").await.unwrap();

        assert_eq!(t.text, "بسم الله الرحمن الرحيم");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let (base_url, calls) = spawn_fake_api(10).await;
        let client = HfTranscriber::new(config(base_url, 2), Some("hf_test".to_string())).unwrap();

        let result = client.transcribe(vec![0; 16], "audio/wav").await;

        assert!(matches!(result, Err(CollaboratorError::ModelLoading(_, 2))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
